//! # BreedScan Common Library
//!
//! Shared code for the BreedScan workspace:
//! - Common error type
//! - Bootstrap configuration loading (TOML + environment)
//! - Logging initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
