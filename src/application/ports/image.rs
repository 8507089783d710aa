use async_trait::async_trait;

use crate::application::error::Result;

/// Image received from a caller.
#[derive(Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("size", &self.bytes.len())
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Remote image hosting.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores `bytes` under `folder` and returns the public URL.
    async fn upload(&self, bytes: Vec<u8>, filename: &str, folder: &str) -> Result<String>;
}
