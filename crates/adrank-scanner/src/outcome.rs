//! Per-attempt outcome and its conversion into the durable city result.

use crate::classifier::has_timeout_indicator;
use crate::error::AttemptError;
use adrank_core::{PositionResult, Positions};

/// Result of one fetch-and-extract attempt for a city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub positions: Positions,
    pub error: Option<AttemptError>,
    pub blocked: bool,
}

impl AttemptOutcome {
    #[must_use]
    pub fn success(positions: Positions) -> Self {
        Self {
            positions,
            error: None,
            blocked: false,
        }
    }

    #[must_use]
    pub fn failure(error: AttemptError, blocked: bool) -> Self {
        Self {
            positions: Positions::new(),
            error: Some(error),
            blocked,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the failure was caused by an elapsed wait bound.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match &self.error {
            Some(AttemptError::PartialLoadTimeout) => true,
            Some(AttemptError::Navigation(cause)) => has_timeout_indicator(cause),
            _ => false,
        }
    }

    /// Only blocked or timed-out attempts are worth another try.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.error.is_some() && (self.blocked || self.is_timeout())
    }

    /// Turn the outcome into the result record for `city`.
    #[must_use]
    pub fn into_result(self, city: &str) -> PositionResult {
        PositionResult {
            city: city.to_string(),
            positions: self.positions,
            error: self.error.map(|e| e.to_string()),
            proxy_used: String::new(),
            blocked: self.blocked,
        }
    }
}
