//! PageDriver - Abstract Browser Automation Trait
//!
//! The automation driver is an external collaborator. Everything Tenaz does
//! against a page goes through [`PageDriver`], so the runner and the page
//! objects work the same against a real browser ([`CdpDriver`] behind the
//! `browser` feature) and against [`MockDriver`] in unit tests.
//!
//! Every method takes `&self`: an action and its post-condition wait borrow
//! the same page concurrently. Implementations keep any mutable state behind
//! interior mutability.
//!
//! [`CdpDriver`]: crate::CdpDriver

use crate::locator::Locator;
use crate::pattern::UrlPattern;
use crate::result::{TenazError, TenazResult};
use crate::wait::{poll_until, ElementState, LoadState, WaitOptions};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default timeout for element interactions (5 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;

/// Options for element interactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionOptions {
    /// Bypass visibility and actionability checks
    pub force: bool,
    /// Upper bound for the interaction, including auto-waiting
    pub timeout: Duration,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            force: false,
            timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
        }
    }
}

impl ActionOptions {
    /// Options with the given timeout
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Same options with actionability checks disabled
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// Abstract driver trait for one page context.
///
/// # Implementations
///
/// - `CdpDriver` - Chromium over CDP, uses chromiumoxide (feature `browser`)
/// - `MockDriver` - Scriptable in-memory page for unit testing
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL, relative URLs resolve against the driver's base URL
    async fn goto(&self, url: &str, wait_until: LoadState) -> TenazResult<()>;

    /// Go back in history
    async fn go_back(&self) -> TenazResult<()>;

    /// Get current URL
    async fn current_url(&self) -> TenazResult<String>;

    /// Get page title
    async fn title(&self) -> TenazResult<String>;

    /// Click element, auto-waiting for actionability unless forced
    async fn click(&self, locator: &Locator, options: ActionOptions) -> TenazResult<()>;

    /// Replace the value of an input
    async fn fill(&self, locator: &Locator, value: &str, options: ActionOptions)
        -> TenazResult<()>;

    /// Clear an input
    async fn clear(&self, locator: &Locator, options: ActionOptions) -> TenazResult<()>;

    /// Select an option of a `<select>` by value or label
    async fn select_option(&self, locator: &Locator, value: &str) -> TenazResult<()>;

    /// Invoke `element.click()` directly, bypassing the interaction layer
    async fn dispatch_click(&self, locator: &Locator) -> TenazResult<()>;

    /// Whether the element exists and is visible
    async fn is_visible(&self, locator: &Locator) -> TenazResult<bool>;

    /// Whether the element is enabled
    async fn is_enabled(&self, locator: &Locator) -> TenazResult<bool>;

    /// Current value of an input
    async fn input_value(&self, locator: &Locator) -> TenazResult<String>;

    /// Text content of the element, `None` if it has none
    async fn text_content(&self, locator: &Locator) -> TenazResult<Option<String>>;

    /// Text content of every element matching the selector
    async fn all_text_contents(&self, locator: &Locator) -> TenazResult<Vec<String>>;

    /// Number of elements matching the selector
    async fn count(&self, locator: &Locator) -> TenazResult<usize>;

    /// Wait for the element to reach `state`
    async fn wait_for(
        &self,
        locator: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> TenazResult<()>;

    /// Wait for the page URL to match `pattern`
    async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration) -> TenazResult<()>;

    /// Wait for a page load state
    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> TenazResult<()>;

    /// Execute JavaScript in page context
    async fn evaluate(&self, script: &str) -> TenazResult<serde_json::Value>;

    /// Call a JavaScript function (`el => ...`) with the resolved element
    async fn evaluate_on(&self, locator: &Locator, function: &str)
        -> TenazResult<serde_json::Value>;

    /// Whether the page context has been closed
    fn is_closed(&self) -> bool;
}

/// Join a possibly relative URL onto a base URL
#[must_use]
pub fn resolve_url(base_url: &str, url: &str) -> String {
    if url.contains("://") || base_url.is_empty() {
        return url.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if url.is_empty() {
        format!("{base}/")
    } else if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

// ============================================================================
// Mock driver
// ============================================================================

/// Polling cadence of the mock's waits
const MOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Driver operations that can be scripted to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    /// Normal click
    Click,
    /// Click with `force`
    ForceClick,
    /// Fill
    Fill,
    /// Clear
    Clear,
    /// Select option
    SelectOption,
    /// Raw `element.click()`
    DispatchClick,
    /// Navigation
    Goto,
    /// History back
    GoBack,
    /// Element state wait
    WaitFor,
    /// URL wait
    WaitForUrl,
    /// Load state wait
    WaitForLoadState,
    /// Script evaluation
    Evaluate,
}

impl MockOp {
    /// Name used in the call history
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::ForceClick => "force_click",
            Self::Fill => "fill",
            Self::Clear => "clear",
            Self::SelectOption => "select_option",
            Self::DispatchClick => "dispatch_click",
            Self::Goto => "goto",
            Self::GoBack => "go_back",
            Self::WaitFor => "wait_for",
            Self::WaitForUrl => "wait_for_url",
            Self::WaitForLoadState => "wait_for_load_state",
            Self::Evaluate => "evaluate",
        }
    }
}

/// An element of the mock page
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Whether the element is visible
    pub visible: bool,
    /// Whether the element is enabled
    pub enabled: bool,
    /// Input value
    pub value: String,
    /// Text content
    pub text: Option<String>,
    /// URL the page moves to when the element is clicked
    pub navigates_to: Option<String>,
    /// Result of `evaluate_on`
    pub eval_result: serde_json::Value,
}

impl Default for MockElement {
    fn default() -> Self {
        Self::visible()
    }
}

impl MockElement {
    /// A visible, enabled element
    #[must_use]
    pub fn visible() -> Self {
        Self {
            visible: true,
            enabled: true,
            value: String::new(),
            text: None,
            navigates_to: None,
            eval_result: serde_json::Value::Null,
        }
    }

    /// An element that is attached but not visible
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::visible()
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set input value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Clicking navigates to `url`
    #[must_use]
    pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
        self.navigates_to = Some(url.into());
        self
    }

    /// Mark as disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set the `evaluate_on` result
    #[must_use]
    pub fn with_eval_result(mut self, value: serde_json::Value) -> Self {
        self.eval_result = value;
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    title: String,
    back_stack: Vec<String>,
    closed: bool,
    elements: HashMap<Locator, MockElement>,
    failures: HashMap<MockOp, VecDeque<TenazError>>,
    js_results: VecDeque<serde_json::Value>,
    history: Vec<String>,
}

impl MockState {
    fn navigate(&mut self, url: String) {
        let previous = std::mem::replace(&mut self.url, url);
        self.back_stack.push(previous);
    }
}

/// Mock driver for unit testing.
///
/// Elements are registered per locator; scripted failures are consumed in
/// order, one per call of the matching [`MockOp`]. A scripted
/// [`TenazError::ContextClosed`] also closes the page, so every later call
/// fails the same way.
#[derive(Debug, Default)]
pub struct MockDriver {
    base_url: String,
    state: Mutex<MockState>,
}

fn element_key(locator: &Locator) -> Locator {
    locator.clone().nth(locator.index().unwrap_or(0))
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative navigation against `base_url`
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Start on `url`
    #[must_use]
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.lock().url = url.into();
        self
    }

    /// Set the page title
    #[must_use]
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.lock().title = title.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a mock element
    pub fn add_element(&self, locator: &Locator, element: MockElement) {
        let _ = self.lock().elements.insert(element_key(locator), element);
    }

    /// Remove a mock element
    pub fn remove_element(&self, locator: &Locator) {
        let _ = self.lock().elements.remove(&element_key(locator));
    }

    /// Queue an error for the next call of `op`
    pub fn fail_next(&self, op: MockOp, error: TenazError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Queue a JS result for `evaluate`
    pub fn set_js_result(&self, result: serde_json::Value) {
        self.lock().js_results.push_back(result);
    }

    /// Close the page
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Current URL without going through the trait
    #[must_use]
    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    /// Current value of an element
    #[must_use]
    pub fn value_of(&self, locator: &Locator) -> Option<String> {
        self.lock()
            .elements
            .get(&element_key(locator))
            .map(|e| e.value.clone())
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Number of calls of `op`
    #[must_use]
    pub fn calls(&self, op: MockOp) -> usize {
        let prefix = format!("{}:", op.as_str());
        self.lock()
            .history
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    /// Record the call, then fail if closed or scripted to fail
    fn enter(&self, op: MockOp, target: &str) -> TenazResult<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.history.push(format!("{}:{target}", op.as_str()));
        Self::check(&mut state, Some(op))?;
        Ok(state)
    }

    /// Read-only query on the page
    fn query(&self) -> TenazResult<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        Self::check(&mut state, None)?;
        Ok(state)
    }

    fn check(state: &mut MockState, op: Option<MockOp>) -> TenazResult<()> {
        if state.closed {
            return Err(TenazError::closed("page has been closed"));
        }
        let scripted = op.and_then(|op| state.failures.get_mut(&op).and_then(VecDeque::pop_front));
        match scripted {
            Some(error) => {
                if error.is_lifecycle() {
                    state.closed = true;
                }
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn element<'a>(state: &'a mut MockState, locator: &Locator) -> TenazResult<&'a mut MockElement> {
        state
            .elements
            .get_mut(&element_key(locator))
            .ok_or_else(|| TenazError::ElementNotFound {
                selector: locator.to_string(),
            })
    }

    fn actionable(element: &MockElement, locator: &Locator, force: bool) -> TenazResult<()> {
        if force {
            return Ok(());
        }
        if !element.visible {
            return Err(TenazError::NotInteractable {
                selector: locator.to_string(),
                message: "element is not visible".to_string(),
            });
        }
        if !element.enabled {
            return Err(TenazError::NotInteractable {
                selector: locator.to_string(),
                message: "element is disabled".to_string(),
            });
        }
        Ok(())
    }

    fn follow_link(&self, state: &mut MockState, locator: &Locator) -> TenazResult<()> {
        let target = Self::element(state, locator)?.navigates_to.clone();
        if let Some(target) = target {
            state.navigate(resolve_url(&self.base_url, &target));
        }
        Ok(())
    }

    fn matching(state: &MockState, locator: &Locator) -> Vec<(usize, MockElement)> {
        let mut found: Vec<(usize, MockElement)> = state
            .elements
            .iter()
            .filter(|(key, _)| key.selector() == locator.selector())
            .map(|(key, element)| (key.index().unwrap_or(0), element.clone()))
            .collect();
        found.sort_by_key(|(index, _)| *index);
        found
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn goto(&self, url: &str, _wait_until: LoadState) -> TenazResult<()> {
        let mut state = self.enter(MockOp::Goto, url)?;
        state.navigate(resolve_url(&self.base_url, url));
        Ok(())
    }

    async fn go_back(&self) -> TenazResult<()> {
        let mut state = self.enter(MockOp::GoBack, "")?;
        if let Some(previous) = state.back_stack.pop() {
            state.url = previous;
        }
        Ok(())
    }

    async fn current_url(&self) -> TenazResult<String> {
        Ok(self.query()?.url.clone())
    }

    async fn title(&self) -> TenazResult<String> {
        Ok(self.query()?.title.clone())
    }

    async fn click(&self, locator: &Locator, options: ActionOptions) -> TenazResult<()> {
        let op = if options.force {
            MockOp::ForceClick
        } else {
            MockOp::Click
        };
        let mut state = self.enter(op, &locator.to_string())?;
        Self::actionable(Self::element(&mut state, locator)?, locator, options.force)?;
        self.follow_link(&mut state, locator)
    }

    async fn fill(
        &self,
        locator: &Locator,
        value: &str,
        options: ActionOptions,
    ) -> TenazResult<()> {
        let mut state = self.enter(MockOp::Fill, &locator.to_string())?;
        let element = Self::element(&mut state, locator)?;
        Self::actionable(element, locator, options.force)?;
        element.value = value.to_string();
        Ok(())
    }

    async fn clear(&self, locator: &Locator, options: ActionOptions) -> TenazResult<()> {
        let mut state = self.enter(MockOp::Clear, &locator.to_string())?;
        let element = Self::element(&mut state, locator)?;
        Self::actionable(element, locator, options.force)?;
        element.value.clear();
        Ok(())
    }

    async fn select_option(&self, locator: &Locator, value: &str) -> TenazResult<()> {
        let mut state = self.enter(MockOp::SelectOption, &locator.to_string())?;
        Self::element(&mut state, locator)?.value = value.to_string();
        Ok(())
    }

    async fn dispatch_click(&self, locator: &Locator) -> TenazResult<()> {
        let mut state = self.enter(MockOp::DispatchClick, &locator.to_string())?;
        self.follow_link(&mut state, locator)
    }

    async fn is_visible(&self, locator: &Locator) -> TenazResult<bool> {
        let state = self.query()?;
        Ok(state
            .elements
            .get(&element_key(locator))
            .is_some_and(|e| e.visible))
    }

    async fn is_enabled(&self, locator: &Locator) -> TenazResult<bool> {
        let mut state = self.query()?;
        Ok(Self::element(&mut state, locator)?.enabled)
    }

    async fn input_value(&self, locator: &Locator) -> TenazResult<String> {
        let mut state = self.query()?;
        Ok(Self::element(&mut state, locator)?.value.clone())
    }

    async fn text_content(&self, locator: &Locator) -> TenazResult<Option<String>> {
        let mut state = self.query()?;
        Ok(Self::element(&mut state, locator)?.text.clone())
    }

    async fn all_text_contents(&self, locator: &Locator) -> TenazResult<Vec<String>> {
        let state = self.query()?;
        Ok(Self::matching(&state, locator)
            .into_iter()
            .map(|(_, e)| e.text.unwrap_or_default())
            .collect())
    }

    async fn count(&self, locator: &Locator) -> TenazResult<usize> {
        let state = self.query()?;
        Ok(Self::matching(&state, locator).len())
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: ElementState,
        timeout: Duration,
    ) -> TenazResult<()> {
        drop(self.enter(MockOp::WaitFor, &locator.to_string())?);
        let key = element_key(locator);
        let options = WaitOptions::within(timeout).every(MOCK_POLL_INTERVAL);
        poll_until(options, || {
            let reached = self.query().map(|page| {
                let element = page.elements.get(&key);
                match state {
                    ElementState::Attached => element.is_some(),
                    ElementState::Detached => element.is_none(),
                    ElementState::Visible => element.is_some_and(|e| e.visible),
                    ElementState::Hidden => !element.is_some_and(|e| e.visible),
                }
            });
            async move { reached }
        })
        .await
    }

    async fn wait_for_url(&self, pattern: &UrlPattern, timeout: Duration) -> TenazResult<()> {
        drop(self.enter(MockOp::WaitForUrl, &pattern.to_string())?);
        let options = WaitOptions::within(timeout).every(MOCK_POLL_INTERVAL);
        let result = poll_until(options, || {
            let matched = self.query().map(|page| pattern.matches(&page.url));
            async move { matched }
        })
        .await;
        match result {
            Err(TenazError::Timeout { ms }) => Err(TenazError::PostConditionNotMet {
                expected: pattern.to_string(),
                observed: self.url(),
                ms,
            }),
            other => other,
        }
    }

    async fn wait_for_load_state(&self, state: LoadState, _timeout: Duration) -> TenazResult<()> {
        drop(self.enter(MockOp::WaitForLoadState, state.as_str())?);
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> TenazResult<serde_json::Value> {
        let mut state = self.enter(MockOp::Evaluate, script)?;
        Ok(state.js_results.pop_front().unwrap_or(serde_json::Value::Null))
    }

    async fn evaluate_on(
        &self,
        locator: &Locator,
        _function: &str,
    ) -> TenazResult<serde_json::Value> {
        let mut state = self.enter(MockOp::Evaluate, &locator.to_string())?;
        Ok(Self::element(&mut state, locator)?.eval_result.clone())
    }

    fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
