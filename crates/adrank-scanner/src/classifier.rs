//! Block and timeout classification.
//!
//! Navigation failures are classified from the error and the URL the page
//! reached. After a successful navigation a [`BlockDetector`] decides whether
//! the page is an anti-bot wall; which detector runs is a configuration choice.

use crate::error::AttemptError;
use crate::outcome::AttemptOutcome;
use adrank_browser::{BrowserError, RenderPage};
use adrank_core::BlockDetection;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Whether `text` mentions an elapsed timeout.
pub fn has_timeout_indicator(text: &str) -> bool {
    static TIMEOUT_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = TIMEOUT_REGEX
        .get_or_init(|| Regex::new(r"(?i)\btime(d)?[\s_-]?out").expect("valid regex"));
    regex.is_match(text)
}

/// Classify a failed navigation.
///
/// A page that already committed a real URL loaded partially before the wait
/// bound elapsed. Timeouts are read as a sign of anti-scraping throttling, so
/// they also mark the attempt blocked.
pub fn classify_navigation_failure(
    current_url: Option<&str>,
    error: &BrowserError,
) -> AttemptOutcome {
    let cause = error.to_string();
    let blocked = error.is_timeout() || has_timeout_indicator(&cause);

    let partially_loaded = current_url
        .map(str::trim)
        .is_some_and(|url| !url.is_empty() && url != "about:blank");

    let kind = if partially_loaded {
        AttemptError::PartialLoadTimeout
    } else {
        AttemptError::Navigation(cause)
    };

    AttemptOutcome::failure(kind, blocked)
}

/// Post-navigation check for anti-bot pages.
#[async_trait]
pub trait BlockDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the block reason, or `None` when the page looks normal.
    async fn detect(&self, page: &dyn RenderPage) -> Option<String>;
}

/// Relies on navigation timeouts alone.
pub struct TimeoutOnlyDetector;

#[async_trait]
impl BlockDetector for TimeoutOnlyDetector {
    fn name(&self) -> &'static str {
        "timeout_only"
    }

    async fn detect(&self, _page: &dyn RenderPage) -> Option<String> {
        None
    }
}

/// Title words that identify a challenge page. Matched case-insensitively.
const TITLE_MARKERS: [&str; 2] = ["captcha", "recaptcha"];

/// Matched case-sensitively, as the site renders it.
const TITLE_ACCESS_RESTRICTED: &str = "Доступ ограничен";

/// Known blocking elements, checked in order.
const BLOCK_SELECTORS: [(&str, &str); 5] = [
    ("captcha", ".captcha, [data-captcha]"),
    ("recaptcha", ".g-recaptcha, iframe[src*='recaptcha']"),
    ("cloudflare", "#challenge-error-title, .cf-error-title"),
    ("avito_block", "[data-marker*='captcha'], [data-marker*='block']"),
    (
        "ip_block",
        "//*[contains(text(), 'Проблема с IP') or contains(text(), 'IP address')]",
    ),
];

/// Body phrases, lowercase.
const TEXT_INDICATORS: [&str; 7] = [
    "recaptcha",
    "captcha",
    "cloudflare",
    "подтвердите что вы не робот",
    "проблема с ip",
    "доступ ограничен",
    "ваш ip адрес",
];

const IFRAME_MARKERS: [&str; 2] = ["recaptcha", "captcha"];

/// Inspects the page title, known blocking selectors, body text and iframe
/// sources. The first hit wins.
pub struct HeuristicDetector;

impl HeuristicDetector {
    async fn check_title(page: &dyn RenderPage) -> Option<String> {
        let title = page.title().await.ok().flatten()?;
        let lower = title.to_lowercase();
        let hit = TITLE_MARKERS.iter().any(|m| lower.contains(m))
            || title.contains(TITLE_ACCESS_RESTRICTED);
        hit.then(|| format!("page_title: {title}"))
    }

    async fn check_selectors(page: &dyn RenderPage) -> Option<String> {
        for (reason, selector) in BLOCK_SELECTORS {
            if matches!(page.is_visible(selector).await, Ok(true)) {
                return Some(format!("selector: {reason}"));
            }
        }
        None
    }

    async fn check_text(page: &dyn RenderPage) -> Option<String> {
        let body = page.text_content("body").await.ok().flatten()?;
        let lower = body.to_lowercase();
        TEXT_INDICATORS
            .iter()
            .find(|indicator| lower.contains(*indicator))
            .map(|indicator| format!("text_content: {indicator}"))
    }

    async fn check_iframes(page: &dyn RenderPage) -> Option<String> {
        let frames = page.query_all("iframe").await.ok()?;
        for frame in frames {
            if let Ok(Some(src)) = frame.attribute("src").await {
                if IFRAME_MARKERS.iter().any(|m| src.contains(m)) {
                    return Some(format!("iframe_src: {src}"));
                }
            }
        }
        None
    }
}

#[async_trait]
impl BlockDetector for HeuristicDetector {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn detect(&self, page: &dyn RenderPage) -> Option<String> {
        if let Some(reason) = Self::check_title(page).await {
            return Some(reason);
        }
        if let Some(reason) = Self::check_selectors(page).await {
            return Some(reason);
        }
        if let Some(reason) = Self::check_text(page).await {
            return Some(reason);
        }
        Self::check_iframes(page).await
    }
}

/// Build the detector selected by configuration.
#[must_use]
pub fn detector_for(strategy: BlockDetection) -> Arc<dyn BlockDetector> {
    match strategy {
        BlockDetection::TimeoutOnly => Arc::new(TimeoutOnlyDetector),
        BlockDetection::Heuristic => Arc::new(HeuristicDetector),
    }
}
