//! Innotaxi Shared Library
//!
//! This crate contains the shared types, models, and validation used by the
//! users backend and by services that talk to it.

pub mod models;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use models::*;
pub use types::*;
