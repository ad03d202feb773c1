//! Subcommand handlers

pub mod auth;
pub mod stats;
