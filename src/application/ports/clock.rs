use chrono::{DateTime, Utc};

/// Port for time operations.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}
