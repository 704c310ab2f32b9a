//! Formcheck Common Utilities
//!
//! Shared infrastructure for all Formcheck crates:
//! - Error types and result aliases
//! - Frame timing and ordering utilities for pose streams
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
