//! Secure random generation using OS RNG.

use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use crate::application::ports::CodeGenerator;
use crate::domain::otp::OTP_LENGTH;

const ID_BYTES: usize = 12;

/// OS-based passcode generator.
#[derive(Default)]
pub struct OsRngCodes;

impl CodeGenerator for OsRngCodes {
    fn generate(&self) -> String {
        let code: u32 = OsRng.gen_range(0..10u32.pow(OTP_LENGTH as u32));
        format!("{code:0width$}", width = OTP_LENGTH)
    }
}

/// Opaque record id: 12 random bytes, hex encoded.
pub fn record_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generator returning a settable code.
#[cfg(test)]
pub struct FixedCodes {
    code: std::sync::Mutex<String>,
}

#[cfg(test)]
impl FixedCodes {
    pub fn new(code: &str) -> Self {
        Self {
            code: std::sync::Mutex::new(code.to_owned()),
        }
    }

    pub fn set(&self, code: &str) {
        *self.code.lock().unwrap() = code.to_owned();
    }
}

#[cfg(test)]
impl CodeGenerator for FixedCodes {
    fn generate(&self) -> String {
        self.code.lock().unwrap().clone()
    }
}
