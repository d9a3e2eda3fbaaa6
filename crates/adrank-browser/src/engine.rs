use crate::actions::{
    BrowsingContext, NavigationOptions, PageElement, RenderPage, Renderer, WaitUntil,
};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use crate::proxy::ProxyConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    AuthChallengeResponse, AuthChallengeResponseResponse, ContinueRequestParams,
    ContinueWithAuthParams, EnableParams as FetchEnableParams, EventAuthRequired,
    EventRequestPaused,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures_util::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);
const READY_STATE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launch options for the Chromium process.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub fingerprint: FingerprintConfig,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            fingerprint: FingerprintConfig::default(),
        }
    }
}

/// Chromium-backed [`Renderer`].
///
/// One process is shared by every lane; lanes only use it to open their own
/// browser contexts.
pub struct BrowserEngine {
    browser: Arc<Browser>,
    handler_task: JoinHandle<()>,
}

impl BrowserEngine {
    /// Launch a headless browser with default configuration
    pub async fn new() -> Result<Self> {
        Self::launch(LaunchOptions::default()).await
    }

    /// Launch a browser with the given options
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(
                options.fingerprint.viewport_width,
                options.fingerprint.viewport_height,
            )
            .arg("--disable-blink-features=AutomationControlled");

        if !options.headless {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
        });

        tracing::info!(headless = options.headless, "Browser launched");

        Ok(Self {
            browser: Arc::new(browser),
            handler_task,
        })
    }

    /// Close the browser process once no context holds it anymore.
    pub async fn shutdown(self) {
        match Arc::try_unwrap(self.browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    tracing::warn!("Failed to close browser: {}", e);
                }
            }
            Err(_) => tracing::warn!("Browser still referenced at shutdown, leaving it to drop"),
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl Renderer for BrowserEngine {
    async fn create_context(
        &self,
        proxy: Option<&ProxyConfig>,
    ) -> Result<Box<dyn BrowsingContext>> {
        let mut builder = CreateBrowserContextParams::builder().dispose_on_detach(true);
        if let Some(proxy) = proxy {
            builder = builder.proxy_server(proxy.server.clone());
        }

        let response = self
            .browser
            .execute(builder.build())
            .await
            .map_err(|e| BrowserError::ContextError(e.to_string()))?;

        let context_id = response.result.browser_context_id.clone();
        tracing::debug!(
            proxy = proxy.map_or("", |p| p.server.as_str()),
            "Created browser context {:?}",
            context_id
        );

        Ok(Box::new(ChromiumContext {
            browser: Arc::clone(&self.browser),
            context_id: Some(context_id),
            proxy: proxy.cloned(),
            init_scripts: Vec::new(),
        }))
    }
}

struct ChromiumContext {
    browser: Arc<Browser>,
    context_id: Option<BrowserContextId>,
    proxy: Option<ProxyConfig>,
    init_scripts: Vec<String>,
}

#[async_trait]
impl BrowsingContext for ChromiumContext {
    async fn add_init_script(&mut self, script: &str) -> Result<()> {
        if self.context_id.is_none() {
            return Err(BrowserError::ContextError("context already closed".to_string()));
        }
        // CDP registers scripts per target, so they are replayed on every new page.
        self.init_scripts.push(script.to_string());
        Ok(())
    }

    async fn new_page(&self) -> Result<Box<dyn RenderPage>> {
        let context_id = self
            .context_id
            .clone()
            .ok_or_else(|| BrowserError::ContextError("context already closed".to_string()))?;

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(BrowserError::PageError)?;

        let page = self
            .browser
            .new_page(params)
            .await
            .map_err(|e| BrowserError::PageError(e.to_string()))?;

        if let Some(proxy) = self.proxy.as_ref().filter(|p| p.has_credentials()) {
            answer_proxy_auth(&page, proxy).await?;
        }

        for script in &self.init_scripts {
            if let Err(e) = page
                .execute(AddScriptToEvaluateOnNewDocumentParams::new(script.clone()))
                .await
            {
                tracing::warn!("Failed to register init script on page: {}", e);
            }
        }

        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(id) = self.context_id.take() {
            self.browser
                .execute(DisposeBrowserContextParams::new(id))
                .await
                .map_err(|e| BrowserError::ContextError(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        let Some(id) = self.context_id.take() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let browser = Arc::clone(&self.browser);
        handle.spawn(async move {
            if let Err(e) = browser.execute(DisposeBrowserContextParams::new(id)).await {
                tracing::warn!("Context drop cleanup failed: {}", e);
            }
        });
    }
}

/// Intercept requests on `page` so proxy credential challenges get answered.
async fn answer_proxy_auth(page: &Page, proxy: &ProxyConfig) -> Result<()> {
    let map_err = |e: chromiumoxide::error::CdpError| BrowserError::PageError(e.to_string());

    let mut auth_events = page
        .event_listener::<EventAuthRequired>()
        .await
        .map_err(map_err)?;
    let mut paused_events = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(map_err)?;

    page.execute(FetchEnableParams::builder().handle_auth_requests(true).build())
        .await
        .map_err(map_err)?;

    let credentials = AuthChallengeResponse::builder()
        .response(AuthChallengeResponseResponse::ProvideCredentials)
        .username(proxy.username.clone().unwrap_or_default())
        .password(proxy.password.clone().unwrap_or_default())
        .build()
        .map_err(BrowserError::PageError)?;

    let auth_page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = auth_events.next().await {
            let answer = ContinueWithAuthParams::new(event.request_id.clone(), credentials.clone());
            if let Err(e) = auth_page.execute(answer).await {
                tracing::debug!("Proxy auth answer failed: {}", e);
            }
        }
    });

    let paused_page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = paused_events.next().await {
            let resume = ContinueRequestParams::new(event.request_id.clone());
            if let Err(e) = paused_page.execute(resume).await {
                tracing::debug!("Resuming intercepted request failed: {}", e);
            }
        }
    });

    Ok(())
}

struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn wait_for_dom(&self) -> Result<()> {
        loop {
            if let Ok(state) = self.evaluate("document.readyState").await {
                if state.as_str().is_some_and(|s| s != "loading") {
                    return Ok(());
                }
            }
            tokio::time::sleep(READY_STATE_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl RenderPage for ChromiumPage {
    async fn set_identity(&self, user_agent: &str, accept_language: &str) -> Result<()> {
        let params = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent)
            .accept_language(accept_language)
            .build()
            .map_err(BrowserError::PageError)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| BrowserError::PageError(e.to_string()))?;
        Ok(())
    }

    async fn goto(&self, url: &str, options: NavigationOptions) -> Result<()> {
        let navigation = async {
            match options.wait_until {
                WaitUntil::Load => self
                    .page
                    .goto(url)
                    .await
                    .map(|_| ())
                    .map_err(|e| BrowserError::NavigationError(e.to_string())),
                WaitUntil::DomContentLoaded => {
                    let response = self
                        .page
                        .execute(NavigateParams::new(url))
                        .await
                        .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
                    if let Some(error_text) = response.result.error_text.clone() {
                        return Err(BrowserError::NavigationError(error_text));
                    }
                    self.wait_for_dom().await
                }
            }
        };

        match tokio::time::timeout(options.timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout(format!(
                "navigation to {url} exceeded {:?}",
                options.timeout
            ))),
        }
    }

    async fn current_url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::SelectorNotFound(format!(
                    "{selector} (waited {timeout:?})"
                )));
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| BrowserError::SelectorNotFound(format!("{selector}: {e}")))?;

        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn PageElement>)
            .collect())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::ScriptError(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn title(&self) -> Result<Option<String>> {
        self.page
            .get_title()
            .await
            .map_err(|e| BrowserError::PageError(e.to_string()))
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.textContent : null; }})()",
            js_string(selector)
        );
        Ok(self
            .evaluate(&script)
            .await?
            .as_str()
            .map(str::to_string))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let script = format!(
            r"(() => {{
                const sel = {};
                let el = null;
                if (sel.startsWith('//')) {{
                    el = document.evaluate(sel, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
                }} else {{
                    el = document.querySelector(sel);
                }}
                if (!el || !(el instanceof Element)) return false;
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                return style.visibility !== 'hidden' && style.display !== 'none' && rect.width > 0 && rect.height > 0;
            }})()",
            js_string(selector)
        );
        Ok(self.evaluate(&script).await?.as_bool().unwrap_or(false))
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| BrowserError::PageError(e.to_string()))
    }
}

struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl PageElement for ChromiumElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.element
            .attribute(name)
            .await
            .map_err(|e| BrowserError::PageError(e.to_string()))
    }
}

/// Quote `raw` as a JavaScript string literal.
fn js_string(raw: &str) -> String {
    serde_json::Value::String(raw.to_string()).to_string()
}
