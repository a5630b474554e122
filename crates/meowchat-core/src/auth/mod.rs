//! Request integrity and access checks
//!
//! - [`Signer`]: per-request signature over timestamp and last message
//! - [`PasswordList`]: optional shared-secret gate

pub mod password;
pub mod signature;

pub use password::PasswordList;
pub use signature::{sign, Signer};
