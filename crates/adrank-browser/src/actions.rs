use crate::error::Result;
use crate::proxy::ProxyConfig;
use async_trait::async_trait;
use std::time::Duration;

/// Lifecycle point at which navigation is considered complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitUntil {
    /// The DOM has been parsed
    #[default]
    DomContentLoaded,
    /// The `load` event fired
    Load,
}

/// Options for [`RenderPage::goto`].
#[derive(Debug, Clone, Copy)]
pub struct NavigationOptions {
    pub timeout: Duration,
    pub wait_until: WaitUntil,
}

impl NavigationOptions {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            wait_until: WaitUntil::DomContentLoaded,
        }
    }
}

/// Top-level browser handle, shared by every lane to open contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open an isolated browsing context, optionally routed through `proxy`.
    async fn create_context(&self, proxy: Option<&ProxyConfig>) -> Result<Box<dyn BrowsingContext>>;
}

/// An isolated set of pages sharing cookies, cache and proxy.
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    /// Register a script that runs before any page script on every new document.
    async fn add_init_script(&mut self, script: &str) -> Result<()>;

    /// Open a blank page in this context.
    async fn new_page(&self) -> Result<Box<dyn RenderPage>>;

    /// Release the context and every page still open in it.
    async fn close(&mut self) -> Result<()>;
}

/// One tab.
#[async_trait]
pub trait RenderPage: Send + Sync {
    /// Override the user agent and `Accept-Language` header.
    async fn set_identity(&self, user_agent: &str, accept_language: &str) -> Result<()>;

    /// Navigate to a URL
    async fn goto(&self, url: &str, options: NavigationOptions) -> Result<()>;

    /// URL currently committed in the page, if any.
    async fn current_url(&self) -> Option<String>;

    /// Wait for a selector to appear
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// All elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    async fn title(&self) -> Result<Option<String>>;

    /// Text content of the first element matching `selector`.
    async fn text_content(&self, selector: &str) -> Result<Option<String>>;

    /// Whether an element matching `selector` is rendered visibly.
    ///
    /// Selectors starting with `//` are treated as XPath.
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    async fn close(&self) -> Result<()>;
}

/// A DOM element handle.
#[async_trait]
pub trait PageElement: Send + Sync {
    async fn attribute(&self, name: &str) -> Result<Option<String>>;
}
