//! Concrete implementations of the application ports.

pub mod argon2;
pub mod clock;
pub mod image;
pub mod jwt;
pub mod mail;
pub mod memory;
pub mod postgres;
pub mod random;
