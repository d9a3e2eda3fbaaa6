//! One fetch-and-extract attempt for a city.

use crate::classifier::{classify_navigation_failure, BlockDetector};
use crate::error::{AttemptError, ScanError};
use crate::extractor::{self, ITEM_SELECTOR};
use crate::lane::LaneWarning;
use crate::outcome::AttemptOutcome;
use crate::retry::{Attempt, RetryPolicy};
use crate::url_builder::build_search_url;
use adrank_browser::{BrowsingContext, FingerprintConfig, NavigationOptions, RenderPage};
use adrank_core::{AdId, City, RankConfig, RankRequest, SCAN_CAP};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Scrolls a third of the page to trigger lazy-loaded listings.
const SCROLL_SCRIPT: &str = r"(() => {
    if (document.body && document.body.scrollHeight) {
        window.scrollBy(0, document.body.scrollHeight / 3);
        return { success: true, height: document.body.scrollHeight };
    }
    return { success: false, height: 0 };
})()";

/// Page-level timing and limits.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub search_base_url: String,
    pub navigation_timeout: Duration,
    /// Pause after navigation before inspecting the page
    pub settle_delay: Duration,
    /// How long to wait for the first listing to render
    pub listing_wait: Duration,
    pub scroll_steps: u32,
    pub scroll_pause: Duration,
    pub scan_cap: usize,
}

impl ScrapeSettings {
    #[must_use]
    pub fn from_config(config: &RankConfig) -> Self {
        Self {
            search_base_url: config.search_base_url.clone(),
            navigation_timeout: config.navigation_timeout(),
            ..Self::default()
        }
    }
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            search_base_url: RankConfig::default().search_base_url,
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
            listing_wait: Duration::from_secs(10),
            scroll_steps: 3,
            scroll_pause: Duration::from_secs(1),
            scan_cap: SCAN_CAP,
        }
    }
}

/// Inclusive range of whole seconds slept before each city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DelayRange {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs: min_secs.min(max_secs),
            max_secs: min_secs.max(max_secs),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.min_secs..=self.max_secs))
    }
}

/// Everything a lane needs to process its cities, shared read-only by all lanes.
pub struct ScrapeJob {
    pub query: String,
    pub targets: Arc<[AdId]>,
    pub settings: ScrapeSettings,
    pub retry: RetryPolicy,
    pub delay: DelayRange,
    pub detector: Arc<dyn BlockDetector>,
}

impl ScrapeJob {
    #[must_use]
    pub fn new(config: &RankConfig, request: &RankRequest, detector: Arc<dyn BlockDetector>) -> Self {
        Self {
            query: request.query.clone(),
            targets: request.ad_ids.clone().into(),
            settings: ScrapeSettings::from_config(config),
            retry: RetryPolicy::new(config.max_retries),
            delay: DelayRange::new(config.min_delay, config.max_delay),
            detector,
        }
    }

    /// Search page URL for `city`.
    pub fn search_url(&self, city: &City) -> Result<String, AttemptError> {
        build_search_url(&self.settings.search_base_url, city, &self.query).map_err(|e| match e {
            ScanError::InvalidUrl(reason) => AttemptError::InvalidUrl(reason),
            other => AttemptError::InvalidUrl(other.to_string()),
        })
    }
}

/// Fetch the search page for one city in a lane's context and rank the targets.
pub struct CityAttempt<'a> {
    pub job: &'a ScrapeJob,
    pub context: &'a dyn BrowsingContext,
    pub city: &'a City,
    pub rng: &'a mut StdRng,
    pub warnings: &'a mut Vec<LaneWarning>,
}

impl CityAttempt<'_> {
    async fn on_page(&mut self, page: &dyn RenderPage) -> AttemptOutcome {
        let job = self.job;
        let settings = &job.settings;

        let fingerprint = FingerprintConfig::randomized(&mut *self.rng);
        if let Err(e) = page
            .set_identity(&fingerprint.user_agent, &fingerprint.accept_language)
            .await
        {
            tracing::warn!(city = %self.city, "Failed to set request identity: {}", e);
            self.warnings.push(LaneWarning::Identity {
                city: self.city.name.clone(),
                reason: e.to_string(),
            });
        }

        let url = match job.search_url(self.city) {
            Ok(url) => url,
            Err(e) => return AttemptOutcome::failure(e, false),
        };

        tracing::debug!(city = %self.city, %url, "Navigating");
        if let Err(e) = page
            .goto(&url, NavigationOptions::new(settings.navigation_timeout))
            .await
        {
            let current = page.current_url().await;
            return classify_navigation_failure(current.as_deref(), &e);
        }

        tokio::time::sleep(settings.settle_delay).await;

        if let Some(reason) = job.detector.detect(page).await {
            tracing::warn!(city = %self.city, %reason, "Block detected");
            return AttemptOutcome::failure(AttemptError::Blocked(reason), true);
        }

        if let Err(e) = page.wait_for_selector(ITEM_SELECTOR, settings.listing_wait).await {
            tracing::debug!(city = %self.city, "Listings never rendered: {}", e);
            return AttemptOutcome::failure(AttemptError::ListingsNotReady, false);
        }

        self.scroll(page).await;

        match extractor::extract(page, &job.targets, settings.scan_cap).await {
            Ok(positions) => AttemptOutcome::success(positions),
            Err(e) => AttemptOutcome::failure(e, false),
        }
    }

    async fn scroll(&mut self, page: &dyn RenderPage) {
        let settings = &self.job.settings;
        for step in 0..settings.scroll_steps {
            match page.evaluate(SCROLL_SCRIPT).await {
                Ok(value) => {
                    if value.get("success").and_then(serde_json::Value::as_bool) == Some(true) {
                        tracing::debug!(city = %self.city, height = %value["height"], "Scrolled");
                    }
                }
                Err(e) => {
                    tracing::warn!(city = %self.city, "Scroll failed: {}", e);
                    self.warnings.push(LaneWarning::Scroll {
                        city: self.city.name.clone(),
                        step,
                        reason: e.to_string(),
                    });
                }
            }
            tokio::time::sleep(settings.scroll_pause).await;
        }
    }
}

#[async_trait]
impl Attempt for CityAttempt<'_> {
    async fn attempt(&mut self, index: u32) -> AttemptOutcome {
        tracing::debug!(city = %self.city, attempt = index, "Starting attempt");

        let page = match self.context.new_page().await {
            Ok(page) => page,
            Err(e) => {
                return AttemptOutcome::failure(AttemptError::PageCreation(e.to_string()), false)
            }
        };

        let outcome = self.on_page(page.as_ref()).await;

        if let Err(e) = page.close().await {
            tracing::debug!(city = %self.city, "Failed to close page: {}", e);
        }

        outcome
    }
}
