//! adrank scanner - ad position tracking across cities.
//!
//! This crate drives the search-and-rank pipeline: cities are distributed
//! round-robin over proxy lanes, each lane walks its cities sequentially in
//! its own browsing context, and every city yields exactly one
//! [`PositionResult`](adrank_core::PositionResult).
//!
//! # Features
//!
//! - Concurrent proxy lanes bounded by `max_workers`
//! - Retry with linear backoff for blocked or timed-out fetches
//! - Pluggable post-navigation block detection
//! - Cancellation with synthetic results for unprocessed cities
//!
//! # Example
//!
//! ```rust,ignore
//! use adrank_scanner::RankOrchestrator;
//! use std::sync::Arc;
//!
//! let orchestrator = RankOrchestrator::new(Arc::new(browser_engine), config);
//! let report = orchestrator.run(&request).await?;
//! println!("{}", serde_json::to_string_pretty(&report.results)?);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod classifier;
pub mod distributor;
#[allow(missing_docs)]
pub mod error;
pub mod extractor;
#[allow(missing_docs)]
pub mod lane;
pub mod orchestrator;
#[allow(missing_docs)]
pub mod outcome;
pub mod retry;
#[allow(missing_docs)]
pub mod scrape;
#[allow(missing_docs)]
pub mod url_builder;

// Re-export commonly used types
pub use classifier::{detector_for, BlockDetector, HeuristicDetector, TimeoutOnlyDetector};
pub use distributor::{distribute, ProxyLane};
pub use error::{AttemptError, Result, ScanError};
pub use extractor::{rank_items, ITEM_ID_ATTRIBUTE, ITEM_SELECTOR};
pub use lane::{LaneReport, LaneWarning};
pub use orchestrator::{RankOrchestrator, RunReport};
pub use outcome::AttemptOutcome;
pub use retry::{Attempt, RetryPolicy, RETRY_BACKOFF_STEP};
pub use scrape::{DelayRange, ScrapeSettings};
pub use url_builder::build_search_url;
