//! Core harness types: configuration and errors

pub mod config;
pub mod error;

pub use config::{HarnessConfig, OutputFormat};
pub use error::{HarnessError, HarnessResult};
