//! Account model shared by every role.
//!
//! Nothing here performs I/O: value objects validate themselves on
//! construction and entities only move between lifecycle states.

pub mod attributes;
pub mod email;
pub mod error;
pub mod identity;
pub mod otp;
pub mod password;
pub mod profile;
pub mod role;
