//! adrank core - foundation crate for ad position tracking.
//!
//! This crate provides the shared types, error handling and configuration
//! management that the browser, scanner and CLI crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - JSON/TOML configuration with environment overrides
//! - [`types`] - Request and result records (`City`, `AdId`, `Rank`, `PositionResult`)
//!
//! # Example
//!
//! ```rust
//! use adrank_core::{RankConfig, RankRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RankConfig::default();
//! config.validate()?;
//!
//! let request = RankRequest::from_json(r#"{"cities": ["moskva"], "ad_ids": [1], "query": "q"}"#)?;
//! assert_eq!(request.city_list().len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{BlockDetection, RankConfig};
pub use error::{AdrankError, ConfigError, ConfigResult, Result};
pub use types::{
    AdId, City, PositionResult, Positions, Rank, RankRequest, BEYOND_CAP_LABEL, SCAN_CAP,
};
