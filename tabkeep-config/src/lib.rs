//! Configuration system for tabkeep.
//!
//! This crate provides configuration loading, saving, and default values
//! for the tab lifecycle and session persistence core. It includes:
//!
//! - The [`Config`] struct with serde defaults for every field
//! - The [`ArchivalRetention`] setting read by the archival policy
//! - Typed [`ConfigError`] values for I/O, parse, and validation failures
//! - XDG-style path helpers for the config and session files

pub mod config;
pub mod defaults;
pub mod error;
pub mod persistence;
mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::ArchivalRetention;
