//! # TuneStats Domain
//!
//! Domain types and models shared by every TuneStats crate.
//!
//! This crate contains:
//! - Resource API models (`UserProfile`, `TopItem`, `Page`)
//! - Query vocabulary (`ItemKind`, `TimeRange`)
//! - Application error type and `Result` alias
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other TuneStats crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
