//! # Namebase Common Library
//!
//! Shared code for the namebase tools:
//! - Error types
//! - Configuration loading and data directory resolution
//! - Human-readable duration formatting for progress reports

pub mod config;
pub mod error;
pub mod human_time;

pub use error::{Error, Result};
