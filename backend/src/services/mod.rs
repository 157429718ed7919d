//! Business logic services
//!
//! Services encapsulate business logic and coordinate between
//! the user directory, the token codec and the revocation ledger.

pub mod auth;
pub mod profile;

pub use auth::{AuthService, Authorized};
pub use profile::ProfileService;
