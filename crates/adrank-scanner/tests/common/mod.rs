//! Scripted in-memory renderer for driving the scanner without a browser.

#![allow(dead_code)]

use adrank_browser::{
    BrowserError, BrowsingContext, NavigationOptions, PageElement, ProxyConfig, RenderPage,
    Renderer, Result,
};
use adrank_core::RankConfig;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a scripted navigation fails.
#[derive(Debug, Clone)]
pub enum NavigationFailure {
    TimedOut,
    Refused,
}

/// What one page load of a city looks like.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    pub navigation_failure: Option<NavigationFailure>,
    /// URL the page reports after a failed navigation
    pub landed_url: Option<String>,
    pub title: Option<String>,
    pub visible: Vec<String>,
    pub body_text: Option<String>,
    pub iframe_srcs: Vec<String>,
    pub listings_ready: bool,
    pub items: Vec<Option<String>>,
}

impl PageScript {
    pub fn listing(ids: &[i64]) -> Self {
        Self {
            listings_ready: true,
            items: ids.iter().map(|id| Some(id.to_string())).collect(),
            ..Self::default()
        }
    }

    pub fn empty_listing() -> Self {
        Self {
            listings_ready: true,
            ..Self::default()
        }
    }

    pub fn timed_out() -> Self {
        Self {
            navigation_failure: Some(NavigationFailure::TimedOut),
            ..Self::default()
        }
    }

    pub fn partially_loaded() -> Self {
        Self {
            navigation_failure: Some(NavigationFailure::TimedOut),
            landed_url: Some("https://www.avito.ru/moskva?q=partial".into()),
            ..Self::default()
        }
    }

    pub fn refused() -> Self {
        Self {
            navigation_failure: Some(NavigationFailure::Refused),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_visible(mut self, selector: &str) -> Self {
        self.visible.push(selector.into());
        self
    }

    pub fn with_body_text(mut self, text: &str) -> Self {
        self.body_text = Some(text.into());
        self
    }

    pub fn with_iframe(mut self, src: &str) -> Self {
        self.iframe_srcs.push(src.into());
        self
    }
}

/// Shared scripts and counters, inspected by the tests.
#[derive(Default)]
pub struct FakeState {
    scripts: Mutex<HashMap<String, VecDeque<PageScript>>>,
    pub fail_contexts: AtomicBool,
    pub fail_init_script: AtomicBool,
    pub fail_scroll: AtomicBool,
    /// Slugs whose page creation panics
    pub panic_on: Mutex<Vec<String>>,
    pub proxies_seen: Mutex<Vec<Option<ProxyConfig>>>,
    pub navigations: Mutex<Vec<String>>,
    pub user_agents: Mutex<Vec<String>>,
    pub contexts_created: AtomicUsize,
    pub contexts_closed: AtomicUsize,
    pub active_contexts: AtomicUsize,
    pub max_active_contexts: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
}

impl FakeState {
    /// Pages served for `slug`, one per attempt; the last one repeats.
    pub fn script(&self, slug: &str, pages: Vec<PageScript>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(slug.to_string(), pages.into());
    }

    fn next_page(&self, slug: &str) -> PageScript {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(slug) {
            Some(pages) if pages.len() > 1 => pages.pop_front().unwrap_or_default(),
            Some(pages) => pages.front().cloned().unwrap_or_default(),
            None => PageScript::default(),
        }
    }

    /// Navigations that hit `slug`.
    pub fn navigations_to(&self, slug: &str) -> usize {
        self.navigations
            .lock()
            .unwrap()
            .iter()
            .filter(|url| slug_of(url) == slug)
            .count()
    }

    pub fn total_navigations(&self) -> usize {
        self.navigations.lock().unwrap().len()
    }
}

fn slug_of(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

pub struct FakeRenderer {
    pub state: Arc<FakeState>,
}

impl FakeRenderer {
    pub fn new() -> (Arc<Self>, Arc<FakeState>) {
        let state = Arc::new(FakeState::default());
        (
            Arc::new(Self {
                state: state.clone(),
            }),
            state,
        )
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn create_context(&self, proxy: Option<&ProxyConfig>) -> Result<Box<dyn BrowsingContext>> {
        self.state.proxies_seen.lock().unwrap().push(proxy.cloned());

        if self.state.fail_contexts.load(Ordering::SeqCst) {
            return Err(BrowserError::ContextError("proxy tunnel refused".into()));
        }

        self.state.contexts_created.fetch_add(1, Ordering::SeqCst);
        let active = self.state.active_contexts.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .max_active_contexts
            .fetch_max(active, Ordering::SeqCst);

        // Give other lanes a chance to run while this context is open.
        tokio::task::yield_now().await;

        Ok(Box::new(FakeContext {
            state: self.state.clone(),
        }))
    }
}

struct FakeContext {
    state: Arc<FakeState>,
}

#[async_trait]
impl BrowsingContext for FakeContext {
    async fn add_init_script(&mut self, _script: &str) -> Result<()> {
        if self.state.fail_init_script.load(Ordering::SeqCst) {
            return Err(BrowserError::ScriptError("context detached".into()));
        }
        Ok(())
    }

    async fn new_page(&self) -> Result<Box<dyn RenderPage>> {
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            state: self.state.clone(),
            page: Mutex::new(None),
            url: Mutex::new(None),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        self.state.contexts_closed.fetch_add(1, Ordering::SeqCst);
        self.state.active_contexts.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    state: Arc<FakeState>,
    page: Mutex<Option<PageScript>>,
    url: Mutex<Option<String>>,
}

impl FakePage {
    fn current(&self) -> PageScript {
        self.page.lock().unwrap().clone().unwrap_or_default()
    }
}

#[async_trait]
impl RenderPage for FakePage {
    async fn set_identity(&self, user_agent: &str, _accept_language: &str) -> Result<()> {
        self.state
            .user_agents
            .lock()
            .unwrap()
            .push(user_agent.to_string());
        Ok(())
    }

    async fn goto(&self, url: &str, _options: NavigationOptions) -> Result<()> {
        self.state.navigations.lock().unwrap().push(url.to_string());
        let slug = slug_of(url).to_string();

        let crash = self.state.panic_on.lock().unwrap().contains(&slug);
        if crash {
            panic!("renderer crashed on {slug}");
        }

        let page = self.state.next_page(&slug);
        let failure = page.navigation_failure.clone();
        *self.url.lock().unwrap() = if failure.is_some() {
            page.landed_url.clone()
        } else {
            Some(url.to_string())
        };
        *self.page.lock().unwrap() = Some(page);

        match failure {
            None => Ok(()),
            Some(NavigationFailure::TimedOut) => {
                Err(BrowserError::Timeout("navigation exceeded 30s".into()))
            }
            Some(NavigationFailure::Refused) => Err(BrowserError::NavigationError(
                "net::ERR_CONNECTION_REFUSED".into(),
            )),
        }
    }

    async fn current_url(&self) -> Option<String> {
        self.url.lock().unwrap().clone()
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<()> {
        if self.current().listings_ready {
            Ok(())
        } else {
            Err(BrowserError::SelectorNotFound(selector.to_string()))
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>> {
        let page = self.current();
        let elements: Vec<Box<dyn PageElement>> = if selector == "iframe" {
            page.iframe_srcs
                .into_iter()
                .map(|src| FakeElement::boxed("src", Some(src)))
                .collect()
        } else {
            page.items
                .into_iter()
                .map(|id| FakeElement::boxed("data-item-id", id))
                .collect()
        };
        Ok(elements)
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        if self.state.fail_scroll.load(Ordering::SeqCst) {
            return Err(BrowserError::ScriptError("execution context destroyed".into()));
        }
        Ok(serde_json::json!({ "success": true, "height": 4200 }))
    }

    async fn title(&self) -> Result<Option<String>> {
        Ok(self.current().title)
    }

    async fn text_content(&self, _selector: &str) -> Result<Option<String>> {
        Ok(self.current().body_text)
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        Ok(self.current().visible.iter().any(|s| s == selector))
    }

    async fn close(&self) -> Result<()> {
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeElement {
    attributes: HashMap<String, String>,
}

impl FakeElement {
    fn boxed(name: &str, value: Option<String>) -> Box<dyn PageElement> {
        let mut attributes = HashMap::new();
        if let Some(value) = value {
            attributes.insert(name.to_string(), value);
        }
        Box::new(Self { attributes })
    }
}

#[async_trait]
impl PageElement for FakeElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attributes.get(name).cloned())
    }
}

/// Fast, reproducible configuration for scripted runs.
pub fn test_config() -> RankConfig {
    RankConfig {
        min_delay: 0,
        max_delay: 0,
        seed: Some(7),
        ..RankConfig::default()
    }
}
