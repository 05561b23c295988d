//! # LCM Common Library
//!
//! Shared code for the LCM (component lifecycle management) services:
//! - Error type shared by all crates
//! - Bootstrap configuration (TOML) and root folder resolution
//! - Enrichment event types and the in-process event bus
//! - SQLite schema initialization

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod status;

pub use error::{Error, Result};
pub use status::EnrichmentStatus;
