//! Fallback policies.
//!
//! A [`FallbackPolicy`] maps an environment discriminator (the browser engine
//! driving the test) to an ordered chain of [`FallbackStrategy`] objects. The
//! policy is plain data: loaded once, shared read-only between runs.
//!
//! Built-in strategies, in the order browsers usually need them:
//!
//! | Strategy             | What it does                                               |
//! |----------------------|------------------------------------------------------------|
//! | [`ForcedInteraction`]| repeats the interaction with actionability checks disabled |
//! | [`DirectNavigation`] | goes straight to the action's known navigation target      |
//! | [`RawInvocation`]    | calls `element.click()` in page context                    |

use crate::action::{ActionKind, ActionSpec, PostCondition};
use crate::driver::{ActionOptions, PageDriver};
use crate::result::{TenazError, TenazResult};
use crate::wait::LoadState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identifier of the browser engine driving a test
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EnvironmentId(String);

impl EnvironmentId {
    /// Create an identifier, normalised to lower case
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_lowercase())
    }

    /// Chromium
    #[must_use]
    pub fn chromium() -> Self {
        Self::new("chromium")
    }

    /// Firefox
    #[must_use]
    pub fn firefox() -> Self {
        Self::new("firefox")
    }

    /// WebKit
    #[must_use]
    pub fn webkit() -> Self {
        Self::new("webkit")
    }

    /// Identifier as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnvironmentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EnvironmentId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<EnvironmentId> for String {
    fn from(id: EnvironmentId) -> Self {
        id.0
    }
}

/// Whether a strategy can run for a given spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Applicability {
    /// The strategy will be attempted
    Applies,
    /// The strategy is skipped, with the reason
    Skip(String),
}

/// One alternative way of carrying out an action.
///
/// Strategies must be distinct from the primary attempt: repeating the same
/// call would hit the same obstacle again.
#[async_trait]
pub trait FallbackStrategy: Send + Sync + fmt::Debug {
    /// Short name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Decide whether this strategy can run for `spec`
    fn applicability(&self, spec: &ActionSpec) -> Applicability {
        let _ = spec;
        Applicability::Applies
    }

    /// Carry out the action; the runner handles the post-condition
    async fn attempt(
        &self,
        driver: &dyn PageDriver,
        spec: &ActionSpec,
        timeout: Duration,
    ) -> TenazResult<()>;
}

/// Repeat the interaction with `force`
#[derive(Debug, Clone, Copy, Default)]
pub struct ForcedInteraction;

#[async_trait]
impl FallbackStrategy for ForcedInteraction {
    fn name(&self) -> &str {
        "forced_interaction"
    }

    async fn attempt(
        &self,
        driver: &dyn PageDriver,
        spec: &ActionSpec,
        timeout: Duration,
    ) -> TenazResult<()> {
        spec.perform(driver, ActionOptions::with_timeout(timeout).forced())
            .await
    }
}

/// Navigate straight to the location the action would have led to
#[derive(Debug, Clone)]
pub struct DirectNavigation {
    url: Option<String>,
    wait_until: LoadState,
}

impl Default for DirectNavigation {
    fn default() -> Self {
        Self {
            url: None,
            wait_until: LoadState::DomContentLoaded,
        }
    }
}

impl DirectNavigation {
    /// Use the action's navigation target
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Always navigate to `url`, whatever the action declares
    #[must_use]
    pub fn to(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Load state to wait for after navigating
    #[must_use]
    pub const fn wait_until(mut self, state: LoadState) -> Self {
        self.wait_until = state;
        self
    }

    fn target<'a>(&'a self, spec: &'a ActionSpec) -> Option<&'a str> {
        self.url.as_deref().or_else(|| spec.navigation_target())
    }
}

#[async_trait]
impl FallbackStrategy for DirectNavigation {
    fn name(&self) -> &str {
        "direct_navigation"
    }

    fn applicability(&self, spec: &ActionSpec) -> Applicability {
        if spec.kind() != ActionKind::Click {
            return Applicability::Skip(format!("a {} does not navigate", spec.kind()));
        }
        if !spec.is_navigation() {
            return Applicability::Skip("click is not navigation-triggering".to_string());
        }
        if self.target(spec).is_some() {
            Applicability::Applies
        } else {
            Applicability::Skip("action has no navigation target".to_string())
        }
    }

    async fn attempt(
        &self,
        driver: &dyn PageDriver,
        spec: &ActionSpec,
        _timeout: Duration,
    ) -> TenazResult<()> {
        let Some(target) = self.target(spec) else {
            return Err(TenazError::invalid_spec(format!(
                "direct navigation for {spec} has no target"
            )));
        };
        let current = driver.current_url().await?;
        let arrived = match spec.post_condition() {
            Some(PostCondition::Url(pattern)) => pattern.matches(&current),
            _ => same_location(&current, target),
        };
        if arrived {
            tracing::debug!(url = %current, "already at navigation target");
            return Ok(());
        }
        driver.goto(target, self.wait_until).await
    }
}

/// Whether `current` is the page `target` names.
///
/// Query, fragment and a trailing slash are ignored. A relative target is
/// compared with the path of `current` only.
fn same_location(current: &str, target: &str) -> bool {
    let current = location(current);
    let target = location(target);
    if target.contains("://") {
        return current == target;
    }
    let path = match current.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
        None => current,
    };
    path.trim_start_matches('/') == target.trim_start_matches('/')
}

fn location(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].trim_end_matches('/')
}

/// Invoke `element.click()` directly in page context
#[derive(Debug, Clone, Copy, Default)]
pub struct RawInvocation;

#[async_trait]
impl FallbackStrategy for RawInvocation {
    fn name(&self) -> &str {
        "raw_invocation"
    }

    fn applicability(&self, spec: &ActionSpec) -> Applicability {
        match spec.kind() {
            ActionKind::Click => Applicability::Applies,
            kind => Applicability::Skip(format!("raw invocation cannot replay a {kind}")),
        }
    }

    async fn attempt(
        &self,
        driver: &dyn PageDriver,
        spec: &ActionSpec,
        _timeout: Duration,
    ) -> TenazResult<()> {
        if driver.is_closed() {
            return Err(TenazError::closed("page closed before raw invocation"));
        }
        driver.dispatch_click(spec.target()).await
    }
}

/// Serializable name of a built-in strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyConfig {
    /// [`ForcedInteraction`]
    ForcedInteraction,
    /// [`DirectNavigation`] to the action's navigation target
    DirectNavigation,
    /// [`RawInvocation`]
    RawInvocation,
}

impl StrategyConfig {
    /// Instantiate the strategy
    #[must_use]
    pub fn build(self) -> Arc<dyn FallbackStrategy> {
        match self {
            Self::ForcedInteraction => Arc::new(ForcedInteraction),
            Self::DirectNavigation => Arc::new(DirectNavigation::new()),
            Self::RawInvocation => Arc::new(RawInvocation),
        }
    }
}

/// Planned step of a fallback chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    /// 1-based position in the chain
    pub index: usize,
    /// Strategy name
    pub strategy: String,
    /// Whether it would run
    pub applicability: Applicability,
}

/// Ordered fallback strategies per environment
#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    chains: HashMap<EnvironmentId, Vec<Arc<dyn FallbackStrategy>>>,
}

impl FallbackPolicy {
    /// Create an empty policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in browser quirks table.
    ///
    /// Firefox drops clicks on the shop's navigation links and submit
    /// buttons, so it gets forced click, direct navigation, then a raw
    /// `element.click()`. Other engines have no fallbacks.
    #[must_use]
    pub fn browser_quirks() -> Self {
        Self::new()
            .strategy(EnvironmentId::firefox(), ForcedInteraction)
            .strategy(EnvironmentId::firefox(), DirectNavigation::new())
            .strategy(EnvironmentId::firefox(), RawInvocation)
    }

    /// Build from configuration
    #[must_use]
    pub fn from_config(config: &BTreeMap<EnvironmentId, Vec<StrategyConfig>>) -> Self {
        let chains = config
            .iter()
            .map(|(env, strategies)| {
                let chain = strategies.iter().map(|s| s.build()).collect();
                (env.clone(), chain)
            })
            .collect();
        Self { chains }
    }

    /// Append a strategy to the chain of `env`
    #[must_use]
    pub fn strategy(mut self, env: EnvironmentId, strategy: impl FallbackStrategy + 'static) -> Self {
        self.chains.entry(env).or_default().push(Arc::new(strategy));
        self
    }

    /// Replace the chain of `env`
    #[must_use]
    pub fn with_chain(mut self, env: EnvironmentId, chain: Vec<Arc<dyn FallbackStrategy>>) -> Self {
        let _ = self.chains.insert(env, chain);
        self
    }

    /// Chain for `env`, `None` when the environment has no entry
    #[must_use]
    pub fn chain(&self, env: &EnvironmentId) -> Option<&[Arc<dyn FallbackStrategy>]> {
        self.chains.get(env).map(Vec::as_slice)
    }

    /// Environments with an entry, sorted
    #[must_use]
    pub fn environments(&self) -> Vec<&EnvironmentId> {
        let mut envs: Vec<&EnvironmentId> = self.chains.keys().collect();
        envs.sort();
        envs
    }

    /// Which strategies would run for `spec` under `env`, without a browser
    #[must_use]
    pub fn plan(&self, spec: &ActionSpec, env: &EnvironmentId) -> Option<Vec<PlannedStep>> {
        self.chain(env).map(|chain| {
            chain
                .iter()
                .enumerate()
                .map(|(i, strategy)| PlannedStep {
                    index: i + 1,
                    strategy: strategy.name().to_string(),
                    applicability: strategy.applicability(spec),
                })
                .collect()
        })
    }
}
