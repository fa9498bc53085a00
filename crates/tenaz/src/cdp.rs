//! Chromium driver over the DevTools protocol.
//!
//! Element work is done with small scripts built from [`Locator::to_query`],
//! so every selector kind resolves the same way. Normal clicks are real
//! mouse events at the element centre; [`PageDriver::dispatch_click`] calls
//! `element.click()` instead.

use crate::driver::{resolve_url, ActionOptions, PageDriver};
use crate::locator::Locator;
use crate::pattern::UrlPattern;
use crate::result::{TenazError, TenazResult};
use crate::wait::{
    poll_until, ElementState, LoadState, WaitOptions, DEFAULT_WAIT_TIMEOUT_MS,
};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::layout::Point;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Browser launch options
#[derive(Debug, Clone)]
pub struct CdpDriverConfig {
    /// Run without a window
    pub headless: bool,
    /// Keep the Chromium sandbox
    pub sandbox: bool,
    /// Chromium binary, auto-detected when `None`
    pub chromium_path: Option<PathBuf>,
    /// Base URL for relative navigation
    pub base_url: String,
}

impl Default for CdpDriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            chromium_path: None,
            base_url: String::new(),
        }
    }
}

impl CdpDriverConfig {
    /// Create default launch options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the browser window
    #[must_use]
    pub const fn headed(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Disable the sandbox (containers, CI)
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Use a specific Chromium binary
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct Probe {
    found: bool,
    #[serde(default)]
    visible: bool,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

/// [`PageDriver`] for one Chromium page
#[derive(Debug)]
pub struct CdpDriver {
    browser: Arc<Mutex<CdpBrowser>>,
    page: CdpPage,
    base_url: String,
    closed: AtomicBool,
    handler: tokio::task::JoinHandle<()>,
}

impl CdpDriver {
    /// Launch Chromium and open a blank page
    pub async fn launch(config: CdpDriverConfig) -> TenazResult<Self> {
        let mut builder = CdpConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|e| TenazError::BrowserLaunchError {
                message: e.to_string(),
            })?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
            TenazError::BrowserLaunchError {
                message: e.to_string(),
            }
        })?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| TenazError::BrowserLaunchError {
                message: e.to_string(),
            })?;
        tracing::debug!(base_url = %config.base_url, "chromium page opened");

        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            page,
            base_url: config.base_url,
            closed: AtomicBool::new(false),
            handler,
        })
    }

    /// Close the browser; later calls fail with [`TenazError::ContextClosed`]
    pub async fn close(&self) -> TenazResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(|e| TenazError::PageError {
            message: e.to_string(),
        })?;
        self.handler.abort();
        Ok(())
    }

    fn ensure_open(&self) -> TenazResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TenazError::closed("page has been closed"));
        }
        Ok(())
    }

    /// Classify a protocol failure; a dropped connection closes the page
    fn fail(&self, message: String) -> TenazError {
        let lower = message.to_ascii_lowercase();
        if ["closed", "channel", "websocket", "no response", "target crashed"]
            .iter()
            .any(|needle| lower.contains(needle))
        {
            self.closed.store(true, Ordering::SeqCst);
            return TenazError::ContextClosed { message };
        }
        if lower.contains("timeout") {
            return TenazError::PageError { message };
        }
        TenazError::EvaluationError { message }
    }

    async fn eval(&self, script: &str) -> TenazResult<Value> {
        self.ensure_open()?;
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| self.fail(e.to_string()))?;
        Ok(result.into_value::<Value>().unwrap_or(Value::Null))
    }

    async fn probe(&self, locator: &Locator) -> TenazResult<Probe> {
        let script = format!(
            "(() => {{ const el = {query}; if (!el) return {{ found: false }}; \
             el.scrollIntoView({{ block: 'center', inline: 'center' }}); \
             const r = el.getBoundingClientRect(); const s = getComputedStyle(el); \
             return {{ found: true, \
               visible: r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none', \
               enabled: !el.disabled, x: r.x + r.width / 2, y: r.y + r.height / 2 }}; }})()",
            query = locator.to_query()
        );
        let value = self.eval(&script).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// Wait until the element can take input, or just exists when forced
    async fn actionable(&self, locator: &Locator, options: ActionOptions) -> TenazResult<Probe> {
        let last = std::sync::Mutex::new(Probe::default());
        let last_probe = &last;
        let wait = WaitOptions::within(options.timeout);
        let result = poll_until(wait, move || async move {
            let probe = self.probe(locator).await?;
            let ready = probe.found && (options.force || (probe.visible && probe.enabled));
            *last_probe
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = probe;
            Ok(ready)
        })
        .await;
        let probe = last
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match result {
            Ok(()) => Ok(probe),
            Err(TenazError::Timeout { .. }) if !probe.found => Err(TenazError::ElementNotFound {
                selector: locator.to_string(),
            }),
            Err(TenazError::Timeout { .. }) => Err(TenazError::NotInteractable {
                selector: locator.to_string(),
                message: if probe.visible {
                    "element is disabled".to_string()
                } else {
                    "element is not visible".to_string()
                },
            }),
            Err(e) => Err(e),
        }
    }

    /// Run `function` on the resolved element, `ElementNotFound` when absent
    async fn on_element(&self, locator: &Locator, function: &str) -> TenazResult<Value> {
        let script = format!(
            "(() => {{ const el = {query}; if (!el) return {{ found: false }}; \
             return {{ found: true, value: ({function})(el) }}; }})()",
            query = locator.to_query()
        );
        let mut result = self.eval(&script).await?;
        if result.get("found").and_then(Value::as_bool) != Some(true) {
            return Err(TenazError::ElementNotFound {
                selector: locator.to_string(),
            });
        }
        Ok(result
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    async fn set_value(&self, locator: &Locator, value: &str, options: ActionOptions) -> TenazResult<()> {
        let _ = self.actionable(locator, options).await?;
        let literal = serde_json::to_string(value)?;
        let _ = self
            .on_element(
                locator,
                &format!(
                    "el => {{ el.focus(); el.value = {literal}; \
                     el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                     el.dispatchEvent(new Event('change', {{ bubbles: true }})); }}"
                ),
            )
            .await?;
        Ok(())
    }

    async fn ready_state_reached(&self, state: LoadState) -> TenazResult<bool> {
        let ready = self.eval("document.readyState").await?;
        let ready = ready.as_str().unwrap_or_default();
        Ok(match state {
            LoadState::DomContentLoaded => ready == "interactive" || ready == "complete",
            LoadState::Load | LoadState::NetworkIdle => ready == "complete",
        })
    }

    async fn resource_count(&self) -> TenazResult<u64> {
        let count = self
            .eval("performance.getEntriesByType('resource').length")
            .await?;
        Ok(count.as_u64().unwrap_or_default())
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn goto(&self, url: &str, wait_until: LoadState) -> TenazResult<()> {
        self.ensure_open()?;
        let target = resolve_url(&self.base_url, url);
        let _ = self
            .page
            .goto(target.as_str())
            .await
            .map_err(|e| match self.fail(e.to_string()) {
                closed @ TenazError::ContextClosed { .. } => closed,
                other => TenazError::NavigationError {
                    url: target.clone(),
                    message: other.to_string(),
                },
            })?;
        self.wait_for_load_state(wait_until, Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS))
            .await
    }

    async fn go_back(&self) -> TenazResult<()> {
        let _ = self.eval("history.back()").await?;
        self.wait_for_load_state(LoadState::Load, Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS))
            .await
    }

    async fn current_url(&self) -> TenazResult<String> {
        self.ensure_open()?;
        let url = self.page.url().await.map_err(|e| self.fail(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&self) -> TenazResult<String> {
        self.ensure_open()?;
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| self.fail(e.to_string()))?;
        Ok(title.unwrap_or_default())
    }

    async fn click(&self, locator: &Locator, options: ActionOptions) -> TenazResult<()> {
        let probe = self.actionable(locator, options).await?;
        tracing::trace!(%locator, x = probe.x, y = probe.y, force = options.force, "click");
        let _ = self
            .page
            .click(Point {
                x: probe.x,
                y: probe.y,
            })
            .await
            .map_err(|e| self.fail(e.to_string()))?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str, options: ActionOptions) -> TenazResult<()> {
        self.set_value(locator, value, options).await
    }

    async fn clear(&self, locator: &Locator, options: ActionOptions) -> TenazResult<()> {
        self.set_value(locator, "", options).await
    }

    async fn select_option(&self, locator: &Locator, value: &str) -> TenazResult<()> {
        let literal = serde_json::to_string(value)?;
        let selected = self
            .on_element(
                locator,
                &format!(
                    "el => {{ const opt = Array.from(el.options || []) \
                     .find(o => o.value === {literal} || o.label === {literal} || o.text.trim() === {literal}); \
                     if (!opt) return false; el.value = opt.value; \
                     el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                     el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }}"
                ),
            )
            .await?;
        if selected.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(TenazError::NotInteractable {
                selector: locator.to_string(),
                message: format!("no option matches '{value}'"),
            })
        }
    }

    async fn dispatch_click(&self, locator: &Locator) -> TenazResult<()> {
        let _ = self.on_element(locator, "el => { el.click(); }").await?;
        Ok(())
    }

    async fn is_visible(&self, locator: &Locator) -> TenazResult<bool> {
        let probe = self.probe(locator).await?;
        Ok(probe.found && probe.visible)
    }

    async fn is_enabled(&self, locator: &Locator) -> TenazResult<bool> {
        let enabled = self.on_element(locator, "el => !el.disabled").await?;
        Ok(enabled.as_bool().unwrap_or(true))
    }

    async fn input_value(&self, locator: &Locator) -> TenazResult<String> {
        let value = self.on_element(locator, "el => el.value ?? ''").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn text_content(&self, locator: &Locator) -> TenazResult<Option<String>> {
        let text = self.on_element(locator, "el => el.textContent").await?;
        Ok(text.as_str().map(str::to_string))
    }

    async fn all_text_contents(&self, locator: &Locator) -> TenazResult<Vec<String>> {
        let script = format!(
            "{}.map(el => el.textContent || '')",
            locator.selector().to_all_query()
        );
        let texts = self.eval(&script).await?;
        Ok(serde_json::from_value(texts).unwrap_or_default())
    }

    async fn count(&self, locator: &Locator) -> TenazResult<usize> {
        let count = self.eval(&locator.to_count_query()).await?;
        Ok(count.as_u64().unwrap_or_default() as usize)
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> TenazResult<()> {
        let options = WaitOptions::within(timeout);
        poll_until(options, move || async move {
            let probe = self.probe(locator).await?;
            Ok(match state {
                ElementState::Attached => probe.found,
                ElementState::Detached => !probe.found,
                ElementState::Visible => probe.found && probe.visible,
                ElementState::Hidden => !(probe.found && probe.visible),
            })
        })
        .await
    }

    async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration) -> TenazResult<()> {
        let options = WaitOptions::within(timeout);
        let result = poll_until(options, move || async move {
            Ok(pattern.matches(&self.current_url().await?))
        })
        .await;
        match result {
            Err(TenazError::Timeout { ms }) => Err(TenazError::PostConditionNotMet {
                expected: pattern.to_string(),
                observed: self.current_url().await.unwrap_or_default(),
                ms,
            }),
            other => other,
        }
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> TenazResult<()> {
        let options = WaitOptions::within(timeout);
        poll_until(options, move || self.ready_state_reached(state)).await?;
        if state != LoadState::NetworkIdle {
            return Ok(());
        }
        // idle once no new resource entries show up for 500ms
        let idle = WaitOptions::within(timeout).every(Duration::from_millis(500));
        let seen = std::sync::Mutex::new(None);
        let seen_count = &seen;
        poll_until(idle, move || async move {
            let count = self.resource_count().await?;
            let mut seen = seen_count
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let settled = *seen == Some(count);
            *seen = Some(count);
            Ok(settled)
        })
        .await
    }

    async fn evaluate(&self, script: &str) -> TenazResult<Value> {
        self.eval(script).await
    }

    async fn evaluate_on(&self, locator: &Locator, function: &str) -> TenazResult<Value> {
        self.on_element(locator, function).await
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
