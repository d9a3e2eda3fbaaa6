use adrank_browser::BrowserError;
use adrank_core::{AdrankError, ConfigError};
use thiserror::Error;

/// Errors that stop a run or a whole lane.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid request: {0}")]
    Request(#[from] AdrankError),

    #[error("failed to create browser context: {0}")]
    ContextCreation(#[source] BrowserError),

    #[error("run cancelled before city was processed")]
    Cancelled,

    #[error("lane aborted: {0}")]
    LaneAborted(String),

    #[error("invalid search URL: {0}")]
    InvalidUrl(String),
}

/// Why a single fetch-and-extract attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("failed to create page: {0}")]
    PageCreation(String),

    #[error("invalid search URL: {0}")]
    InvalidUrl(String),

    #[error("page loaded partially, but navigation timed out")]
    PartialLoadTimeout,

    #[error("failed to navigate to page: {0}")]
    Navigation(String),

    #[error("block detected: {0}")]
    Blocked(String),

    #[error("listings did not appear on the page")]
    ListingsNotReady,

    #[error("failed to query listings: {0}")]
    ListingQuery(String),

    #[error("no listings found on the page")]
    NoListings,

    #[error("run cancelled before city was processed")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ScanError>;
