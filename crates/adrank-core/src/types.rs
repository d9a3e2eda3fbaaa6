//! Shared types used across adrank.
//!
//! This module defines the request and result records exchanged with the
//! outside world, plus the small newtypes that keep them honest.

use crate::error::AdrankError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Maximum number of listing items inspected per city.
pub const SCAN_CAP: usize = 50;

/// Output label for a target that was not found within [`SCAN_CAP`] items.
pub const BEYOND_CAP_LABEL: &str = "50+";

/// A search-target locale.
///
/// The slug is the URL path segment used by the search site; the name is what
/// gets reported back in results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct City {
    /// Name reported in results
    pub name: String,
    /// URL path segment
    pub slug: String,
}

impl City {
    /// Build a city whose display name equals its slug.
    pub fn from_slug(slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            name: slug.clone(),
            slug,
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Identifier of a classified ad, as found in the `data-item-id` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdId(pub i64);

impl fmt::Display for AdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AdId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Ranked position of an ad in the scanned listing window.
///
/// Serialized as a string: `"7"` for a ranked ad, `"50+"` when the ad was
/// not seen within the scan cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    /// 1-based position within the scan window
    Position(u32),
    /// Not found within the scan window
    BeyondCap,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(p) => write!(f, "{p}"),
            Self::BeyondCap => f.write_str(BEYOND_CAP_LABEL),
        }
    }
}

impl FromStr for Rank {
    type Err = AdrankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == BEYOND_CAP_LABEL {
            return Ok(Self::BeyondCap);
        }
        match s.parse::<u32>() {
            Ok(p) if p >= 1 => Ok(Self::Position(p)),
            _ => Err(AdrankError::Validation(format!(
                "invalid rank '{s}': expected a positive number or '{BEYOND_CAP_LABEL}'"
            ))),
        }
    }
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Rank of every requested ad, keyed by ad ID.
pub type Positions = BTreeMap<AdId, Rank>;

/// The output record for one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionResult {
    /// City name
    pub city: String,
    /// Ranks found for the requested ads
    #[serde(default)]
    pub positions: Positions,
    /// Human-readable failure, if the city could not be ranked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Proxy the result was fetched through (empty for direct)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proxy_used: String,
    /// Whether an anti-scraping defense likely caused the failure
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub blocked: bool,
}

impl PositionResult {
    /// A successful result with the given positions.
    pub fn ranked(city: impl Into<String>, positions: Positions) -> Self {
        Self {
            city: city.into(),
            positions,
            error: None,
            proxy_used: String::new(),
            blocked: false,
        }
    }

    /// A failed result carrying `error`.
    pub fn failed(city: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            positions: Positions::new(),
            error: Some(error.into()),
            proxy_used: String::new(),
            blocked: false,
        }
    }

    /// Tag the result with the proxy it went through.
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy_used = proxy.into();
        self
    }

    /// Whether this result carries an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The request document read from standard input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankRequest {
    /// City slugs to search
    #[serde(default)]
    pub cities: Vec<String>,
    /// Ads to locate
    #[serde(default)]
    pub ad_ids: Vec<AdId>,
    /// Search query shared by every city
    #[serde(default)]
    pub query: String,
}

impl RankRequest {
    /// Decode a request from JSON.
    pub fn from_json(raw: &str) -> Result<Self, AdrankError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Decode a request from a reader.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, AdrankError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// The requested cities, in input order.
    #[must_use]
    pub fn city_list(&self) -> Vec<City> {
        self.cities.iter().map(City::from_slug).collect()
    }
}
