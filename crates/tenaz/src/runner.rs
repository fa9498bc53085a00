//! Resilient action runner.
//!
//! Runs an [`ActionSpec`] against a page: the primary interaction first, then
//! the fallback chain the [`FallbackPolicy`] holds for the environment. Every
//! attempt is joined with the action's post-condition wait and both must settle
//! before the attempt is judged.
//!
//! ```text
//! Idle -> Primary -> Succeeded
//!                 -> Fallback 1 -> SucceededViaFallback
//!                               -> Fallback 2 -> ... -> SoftFailed
//! ```
//!
//! Transient errors move to the next strategy, a closed page ends the chain as
//! soft-failed, contract errors and cancellation are returned to the caller.

use crate::action::{ActionKind, ActionSpec};
use crate::driver::{ActionOptions, PageDriver};
use crate::outcome::{ActionOutcome, Diagnostic, DiagnosticKind, SoftFailReason};
use crate::pattern::UrlPattern;
use crate::policy::{Applicability, EnvironmentId, FallbackPolicy};
use crate::result::{TenazError, TenazResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Default budget for the primary attempt (15 seconds)
pub const DEFAULT_PRIMARY_TIMEOUT_MS: u64 = 15_000;

/// Default budget for each fallback (10 seconds)
pub const DEFAULT_FALLBACK_TIMEOUT_MS: u64 = 10_000;

/// Extra time an attempt gets over its wait budget before it is abandoned
const SETTLE_GRACE: Duration = Duration::from_millis(250);

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Budget for the primary attempt and its post-condition
    pub primary_timeout_ms: u64,
    /// Budget for each fallback and its post-condition
    pub fallback_timeout_ms: u64,
    /// URL post-condition for click actions that declare none
    pub post_condition_pattern: Option<UrlPattern>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            primary_timeout_ms: DEFAULT_PRIMARY_TIMEOUT_MS,
            fallback_timeout_ms: DEFAULT_FALLBACK_TIMEOUT_MS,
            post_condition_pattern: None,
        }
    }
}

impl RunnerConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary budget
    #[must_use]
    pub fn with_primary_timeout(mut self, timeout: Duration) -> Self {
        self.primary_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the per-fallback budget
    #[must_use]
    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the default URL post-condition for clicks
    #[must_use]
    pub fn with_post_condition_pattern(mut self, pattern: UrlPattern) -> Self {
        self.post_condition_pattern = Some(pattern);
        self
    }

    /// Primary budget as Duration
    #[must_use]
    pub const fn primary_timeout(&self) -> Duration {
        Duration::from_millis(self.primary_timeout_ms)
    }

    /// Fallback budget as Duration
    #[must_use]
    pub const fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    /// Reject zero budgets and malformed patterns
    pub fn validate(&self) -> TenazResult<()> {
        if self.primary_timeout_ms == 0 {
            return Err(TenazError::config("primary_timeout_ms must be positive"));
        }
        if self.fallback_timeout_ms == 0 {
            return Err(TenazError::config("fallback_timeout_ms must be positive"));
        }
        if let Some(pattern) = &self.post_condition_pattern {
            pattern.validate()?;
        }
        Ok(())
    }
}

/// Executes actions with environment-specific fallbacks.
///
/// # Example
///
/// ```no_run
/// use tenaz::{
///     ActionSpec, EnvironmentId, FallbackPolicy, Locator, MockDriver, ResilientActionRunner,
///     UrlPattern,
/// };
///
/// # async fn demo() -> tenaz::TenazResult<()> {
/// let driver = MockDriver::new();
/// let spec = ActionSpec::click(Locator::new("#navbarColor01 > ul > li:nth-child(3) > a"))
///     .expect_url(UrlPattern::regex("/login"))
///     .navigates_to("/login");
/// let outcome = ResilientActionRunner::default()
///     .run(&driver, &spec, &FallbackPolicy::browser_quirks(), &EnvironmentId::firefox())
///     .await?;
/// println!("{outcome}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResilientActionRunner {
    config: RunnerConfig,
    cancel: CancellationToken,
}

impl ResilientActionRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop starting strategies once `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `spec` on `driver`, falling back per `policy` for `env`.
    ///
    /// # Errors
    ///
    /// Returns contract errors (invalid spec, missing policy for `env` after a
    /// primary failure) and [`TenazError::Cancelled`]. Interaction failures are
    /// reported through the outcome.
    pub async fn run(
        &self,
        driver: &dyn PageDriver,
        spec: &ActionSpec,
        policy: &FallbackPolicy,
        env: &EnvironmentId,
    ) -> TenazResult<ActionOutcome> {
        spec.validate()?;
        let span = tracing::info_span!(
            "resilient_action",
            run_id = %Uuid::new_v4(),
            action = %spec,
            %env,
        );
        self.run_chain(driver, &self.effective(spec), policy, env)
            .instrument(span)
            .await
    }

    fn effective<'a>(&self, spec: &'a ActionSpec) -> Cow<'a, ActionSpec> {
        match (&self.config.post_condition_pattern, spec.post_condition()) {
            (Some(pattern), None) if spec.kind() == ActionKind::Click => {
                Cow::Owned(spec.clone().expect_url(pattern.clone()))
            }
            _ => Cow::Borrowed(spec),
        }
    }

    async fn run_chain(
        &self,
        driver: &dyn PageDriver,
        spec: &ActionSpec,
        policy: &FallbackPolicy,
        env: &EnvironmentId,
    ) -> TenazResult<ActionOutcome> {
        let started = Instant::now();
        self.ensure_not_cancelled()?;

        let primary_timeout = self.config.primary_timeout();
        let primary = spec.perform(driver, ActionOptions::with_timeout(primary_timeout));
        let primary_error = match self.settle(driver, spec, primary, primary_timeout).await {
            Ok(()) => {
                debug!(target: "tenaz.runner", "primary attempt succeeded");
                return Ok(ActionOutcome::succeeded(started.elapsed()));
            }
            Err(e) if e.is_transient() || e.is_lifecycle() => e,
            Err(e) => return Err(e),
        };
        debug!(target: "tenaz.runner", error = %primary_error, "primary attempt failed");

        let Some(chain) = policy.chain(env) else {
            return Err(TenazError::MissingPolicy {
                env: env.to_string(),
                source: Box::new(primary_error),
            });
        };
        if primary_error.is_lifecycle() {
            warn!(target: "tenaz.runner", error = %primary_error, "page closed, action soft-failed");
            return Ok(ActionOutcome::soft_failed(
                SoftFailReason::ContextClosed,
                primary_error,
                Vec::new(),
                started.elapsed(),
            ));
        }

        let fallback_timeout = self.config.fallback_timeout();
        let mut diagnostics = Vec::with_capacity(chain.len());
        for (offset, strategy) in chain.iter().enumerate() {
            let index = offset + 1;
            self.ensure_not_cancelled()?;
            if driver.is_closed() {
                warn!(target: "tenaz.runner", index, "page closed before fallback, action soft-failed");
                return Ok(ActionOutcome::soft_failed(
                    SoftFailReason::ContextClosed,
                    primary_error,
                    diagnostics,
                    started.elapsed(),
                ));
            }
            if let Applicability::Skip(reason) = strategy.applicability(spec) {
                debug!(target: "tenaz.runner", index, strategy = strategy.name(), %reason, "fallback skipped");
                diagnostics.push(Diagnostic {
                    index,
                    strategy: strategy.name().to_string(),
                    kind: DiagnosticKind::Skipped(reason),
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            let attempt_started = Instant::now();
            let attempt = strategy.attempt(driver, spec, fallback_timeout);
            let result = self.settle(driver, spec, attempt, fallback_timeout).await;
            let elapsed = attempt_started.elapsed();
            match result {
                Ok(()) => {
                    info!(
                        target: "tenaz.runner",
                        index,
                        strategy = strategy.name(),
                        primary_error = %primary_error,
                        "action succeeded via fallback"
                    );
                    return Ok(ActionOutcome::via_fallback(
                        index,
                        primary_error,
                        diagnostics,
                        started.elapsed(),
                    ));
                }
                Err(e) if e.is_transient() || e.is_lifecycle() => {
                    let closed = e.is_lifecycle();
                    debug!(target: "tenaz.runner", index, strategy = strategy.name(), error = %e, "fallback failed");
                    diagnostics.push(Diagnostic {
                        index,
                        strategy: strategy.name().to_string(),
                        kind: DiagnosticKind::Failed(e),
                        elapsed,
                    });
                    if closed {
                        warn!(target: "tenaz.runner", index, "page closed during fallback, action soft-failed");
                        return Ok(ActionOutcome::soft_failed(
                            SoftFailReason::ContextClosed,
                            primary_error,
                            diagnostics,
                            started.elapsed(),
                        ));
                    }
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            target: "tenaz.runner",
            strategies = chain.len(),
            primary_error = %primary_error,
            "all fallbacks exhausted, action soft-failed"
        );
        Ok(ActionOutcome::soft_failed(
            SoftFailReason::Exhausted,
            primary_error,
            diagnostics,
            started.elapsed(),
        ))
    }

    fn ensure_not_cancelled(&self) -> TenazResult<()> {
        if self.cancel.is_cancelled() {
            return Err(TenazError::Cancelled);
        }
        Ok(())
    }

    /// Join `attempt` with the post-condition wait, abandon both on cancellation
    async fn settle<F>(
        &self,
        driver: &dyn PageDriver,
        spec: &ActionSpec,
        attempt: F,
        timeout: Duration,
    ) -> TenazResult<()>
    where
        F: Future<Output = TenazResult<()>>,
    {
        let condition = async {
            match spec.post_condition() {
                Some(condition) => condition.wait(driver, timeout).await,
                None => Ok(()),
            }
        };
        let joined = async {
            let (action, condition) = tokio::join!(attempt, condition);
            action.and(condition)
        };
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(TenazError::Cancelled),
            settled = tokio::time::timeout(timeout + SETTLE_GRACE, joined) => {
                settled.unwrap_or_else(|_| Err(TenazError::timeout(timeout)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement, MockOp};
    use crate::locator::Locator;
    use crate::outcome::ActionStatus;
    use crate::policy::{DirectNavigation, FallbackStrategy, ForcedInteraction, RawInvocation};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const BASE: &str = "https://sweetshop.netlify.app";

    fn login_link() -> Locator {
        Locator::new("#navbarColor01 > ul > li:nth-child(3) > a")
    }

    fn open_login() -> ActionSpec {
        ActionSpec::click(login_link())
            .expect_url(UrlPattern::regex("/login"))
            .navigates_to("/login")
    }

    fn fast() -> ResilientActionRunner {
        ResilientActionRunner::new(
            RunnerConfig::new()
                .with_primary_timeout(Duration::from_millis(30))
                .with_fallback_timeout(Duration::from_millis(30)),
        )
    }

    fn shop() -> MockDriver {
        MockDriver::new()
            .with_base_url(BASE)
            .with_url(format!("{BASE}/"))
    }

    #[derive(Debug, Clone, Copy)]
    enum Script {
        Pass,
        Transient,
        Closed,
    }

    #[derive(Debug)]
    struct Scripted {
        script: Script,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FallbackStrategy for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn attempt(
            &self,
            _driver: &dyn PageDriver,
            _spec: &ActionSpec,
            timeout: Duration,
        ) -> TenazResult<()> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Pass => Ok(()),
                Script::Transient => Err(TenazError::timeout(timeout)),
                Script::Closed => Err(TenazError::closed("target closed")),
            }
        }
    }

    /// Policy for firefox built from scripts, with per-strategy call counters
    fn scripted(scripts: &[Script]) -> (FallbackPolicy, Vec<Arc<AtomicUsize>>) {
        let counters: Vec<Arc<AtomicUsize>> =
            scripts.iter().map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let chain: Vec<Arc<dyn FallbackStrategy>> = scripts
            .iter()
            .zip(&counters)
            .map(|(script, calls)| {
                Arc::new(Scripted {
                    script: *script,
                    calls: Arc::clone(calls),
                }) as Arc<dyn FallbackStrategy>
            })
            .collect();
        let policy = FallbackPolicy::new().with_chain(EnvironmentId::firefox(), chain);
        (policy, counters)
    }

    /// Driver on which the primary click fails fast
    fn blocked_link() -> MockDriver {
        let driver = shop();
        driver.add_element(&login_link(), MockElement::hidden());
        driver
    }

    fn unconditional_click() -> ActionSpec {
        ActionSpec::click(login_link())
    }

    mod primary_tests {
        use super::*;

        #[tokio::test]
        async fn test_primary_success_runs_no_fallback() {
            let driver = shop();
            driver.add_element(&login_link(), MockElement::visible().navigates_to("/login"));
            let outcome = fast()
                .run(
                    &driver,
                    &open_login(),
                    &FallbackPolicy::browser_quirks(),
                    &EnvironmentId::firefox(),
                )
                .await
                .unwrap();
            assert_eq!(outcome.status, ActionStatus::Succeeded);
            assert_eq!(outcome.strategy_index, Some(0));
            assert!(outcome.diagnostics.is_empty());
            assert_eq!(driver.calls(MockOp::ForceClick), 0);
            assert_eq!(driver.calls(MockOp::Goto), 0);
            assert_eq!(driver.calls(MockOp::DispatchClick), 0);
        }

        #[tokio::test]
        async fn test_missing_policy_is_contract_error() {
            let driver = blocked_link();
            let err = fast()
                .run(
                    &driver,
                    &open_login(),
                    &FallbackPolicy::browser_quirks(),
                    &EnvironmentId::webkit(),
                )
                .await
                .unwrap_err();
            match err {
                TenazError::MissingPolicy { env, source } => {
                    assert_eq!(env, "webkit");
                    assert!(source.is_transient());
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(driver.calls(MockOp::ForceClick), 0);
        }

        #[tokio::test]
        async fn test_missing_policy_not_consulted_on_success() {
            let driver = shop();
            driver.add_element(&login_link(), MockElement::visible().navigates_to("/login"));
            let outcome = fast()
                .run(&driver, &open_login(), &FallbackPolicy::new(), &EnvironmentId::webkit())
                .await
                .unwrap();
            assert!(outcome.is_success());
        }

        #[tokio::test]
        async fn test_required_input_rejected_before_interaction() {
            let driver = shop();
            let email = Locator::new("#exampleInputEmail");
            driver.add_element(&email, MockElement::visible());
            let spec = ActionSpec::fill(email, "").require_input();
            let err = fast()
                .run(&driver, &spec, &FallbackPolicy::browser_quirks(), &EnvironmentId::firefox())
                .await
                .unwrap_err();
            assert!(matches!(err, TenazError::InvalidSpec { .. }));
            assert!(driver.history().is_empty());
        }

        #[tokio::test]
        async fn test_closed_page_on_primary_soft_fails() {
            let driver = shop();
            driver.close();
            let outcome = fast()
                .run(
                    &driver,
                    &open_login(),
                    &FallbackPolicy::browser_quirks(),
                    &EnvironmentId::firefox(),
                )
                .await
                .unwrap();
            assert_eq!(outcome.status, ActionStatus::SoftFailed);
            assert_eq!(outcome.soft_fail_reason, Some(SoftFailReason::ContextClosed));
            assert!(outcome.primary_error.as_ref().is_some_and(TenazError::is_lifecycle));
            assert_eq!(driver.calls(MockOp::ForceClick), 0);
        }

        #[tokio::test]
        async fn test_default_post_condition_applies_to_clicks() {
            let driver = shop();
            driver.add_element(&login_link(), MockElement::visible());
            let runner = ResilientActionRunner::new(
                fast()
                    .config()
                    .clone()
                    .with_post_condition_pattern(UrlPattern::regex("/login")),
            );
            let policy = FallbackPolicy::new().with_chain(EnvironmentId::firefox(), Vec::new());
            let outcome = runner
                .run(&driver, &unconditional_click(), &policy, &EnvironmentId::firefox())
                .await
                .unwrap();
            assert_eq!(outcome.soft_fail_reason, Some(SoftFailReason::Exhausted));
            assert!(matches!(
                outcome.primary_error,
                Some(TenazError::PostConditionNotMet { .. })
            ));
        }
    }

    mod fallback_tests {
        use super::*;

        #[tokio::test]
        async fn test_second_of_three_succeeds_and_third_never_runs() {
            let driver = blocked_link();
            let (policy, calls) = scripted(&[Script::Transient, Script::Pass, Script::Pass]);
            let outcome = fast()
                .run(&driver, &unconditional_click(), &policy, &EnvironmentId::firefox())
                .await
                .unwrap();
            assert_eq!(outcome.status, ActionStatus::SucceededViaFallback);
            assert_eq!(outcome.strategy_index, Some(2));
            assert_eq!(calls[0].load(Ordering::SeqCst), 1);
            assert_eq!(calls[1].load(Ordering::SeqCst), 1);
            assert_eq!(calls[2].load(Ordering::SeqCst), 0);
            assert_eq!(outcome.diagnostics.len(), 1);
        }

        #[tokio::test]
        async fn test_all_transient_soft_fails_with_one_diagnostic_each() {
            let driver = blocked_link();
            let (policy, calls) =
                scripted(&[Script::Transient, Script::Transient, Script::Transient]);
            let outcome = fast()
                .run(&driver, &unconditional_click(), &policy, &EnvironmentId::firefox())
                .await
                .unwrap();
            assert_eq!(outcome.status, ActionStatus::SoftFailed);
            assert_eq!(outcome.soft_fail_reason, Some(SoftFailReason::Exhausted));
            assert_eq!(outcome.diagnostics.len(), 3);
            let indices: Vec<usize> = outcome.diagnostics.iter().map(|d| d.index).collect();
            assert_eq!(indices, vec![1, 2, 3]);
            assert!(calls.iter().all(|c| c.load(Ordering::SeqCst) == 1));
            assert!(matches!(
                outcome.primary_error,
                Some(TenazError::NotInteractable { .. })
            ));
        }

        #[tokio::test]
        async fn test_closed_on_second_fallback_stops_chain() {
            let driver = blocked_link();
            let (policy, calls) = scripted(&[Script::Transient, Script::Closed, Script::Pass]);
            let outcome = fast()
                .run(&driver, &unconditional_click(), &policy, &EnvironmentId::firefox())
                .await
                .unwrap();
            assert_eq!(outcome.status, ActionStatus::SoftFailed);
            assert_eq!(outcome.soft_fail_reason, Some(SoftFailReason::ContextClosed));
            assert_eq!(outcome.diagnostics.len(), 2);
            assert_eq!(calls[2].load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn test_driver_closed_between_fallbacks() {
            let driver = blocked_link();
            driver.fail_next(MockOp::ForceClick, TenazError::closed("browser has been closed"));
            let outcome = fast()
                .run(
                    &driver,
                    &unconditional_click(),
                    &FallbackPolicy::browser_quirks(),
                    &EnvironmentId::firefox(),
                )
                .await
                .unwrap();
            assert_eq!(outcome.soft_fail_reason, Some(SoftFailReason::ContextClosed));
            assert_eq!(driver.calls(MockOp::DispatchClick), 0);
        }

        #[tokio::test]
        async fn test_firefox_login_link_falls_back_to_direct_navigation() {
            // The click lands but the URL never changes.
            let driver = shop();
            driver.add_element(&login_link(), MockElement::visible());
            driver.fail_next(
                MockOp::ForceClick,
                TenazError::timeout(Duration::from_millis(30)),
            );
            let outcome = fast()
                .run(
                    &driver,
                    &open_login(),
                    &FallbackPolicy::browser_quirks(),
                    &EnvironmentId::firefox(),
                )
                .await
                .unwrap();
            assert_eq!(outcome.status, ActionStatus::SucceededViaFallback);
            assert_eq!(outcome.strategy_index, Some(2));
            assert!(matches!(
                outcome.primary_error,
                Some(TenazError::PostConditionNotMet { .. })
            ));
            assert_eq!(driver.url(), format!("{BASE}/login"));
            assert_eq!(driver.calls(MockOp::Click), 1);
            assert_eq!(driver.calls(MockOp::ForceClick), 1);
            assert_eq!(driver.calls(MockOp::Goto), 1);
            assert_eq!(driver.calls(MockOp::DispatchClick), 0);
        }

        #[tokio::test]
        async fn test_inapplicable_strategies_are_skipped() {
            let email = Locator::new("#exampleInputEmail");
            let driver = shop();
            driver.add_element(&email, MockElement::hidden());
            let spec = ActionSpec::fill(email.clone(), "user@example.com");
            let outcome = fast()
                .run(&driver, &spec, &FallbackPolicy::browser_quirks(), &EnvironmentId::firefox())
                .await
                .unwrap();
            assert_eq!(outcome.status, ActionStatus::SucceededViaFallback);
            assert_eq!(outcome.strategy_index, Some(1));
            assert_eq!(driver.value_of(&email).as_deref(), Some("user@example.com"));

            driver.fail_next(MockOp::Fill, TenazError::Detached { selector: email.to_string() });
            driver.fail_next(MockOp::Fill, TenazError::Detached { selector: email.to_string() });
            let outcome = fast()
                .run(&driver, &spec, &FallbackPolicy::browser_quirks(), &EnvironmentId::firefox())
                .await
                .unwrap();
            assert_eq!(outcome.soft_fail_reason, Some(SoftFailReason::Exhausted));
            assert_eq!(outcome.diagnostics.len(), 3);
            assert!(outcome.diagnostics[1].is_skipped());
            assert!(outcome.diagnostics[2].is_skipped());
            assert_eq!(outcome.attempts(), 1);
        }

        #[tokio::test]
        async fn test_direct_navigation_home_from_login_really_navigates() {
            let logo = Locator::new("a.navbar-brand");
            let driver = MockDriver::new()
                .with_base_url(BASE)
                .with_url(format!("{BASE}/login"));
            driver.add_element(&logo, MockElement::hidden().navigates_to("/"));
            let policy = FallbackPolicy::new().strategy(EnvironmentId::firefox(), DirectNavigation::new());
            let spec = ActionSpec::click(logo).navigates_to("/");
            let outcome = fast()
                .run(&driver, &spec, &policy, &EnvironmentId::firefox())
                .await
                .unwrap();
            assert_eq!(outcome.status, ActionStatus::SucceededViaFallback);
            assert_eq!(outcome.strategy_index, Some(1));
            assert_eq!(driver.calls(MockOp::Goto), 1);
            assert_eq!(driver.url(), format!("{BASE}/"));
        }

        #[tokio::test]
        async fn test_fixed_navigation_never_stands_in_for_a_fill() {
            let email = Locator::new("#email");
            let driver = shop();
            driver.add_element(&email, MockElement::hidden());
            let policy = FallbackPolicy::new()
                .strategy(EnvironmentId::firefox(), DirectNavigation::to("/basket"));
            let outcome = fast()
                .run(&driver, &ActionSpec::fill(email.clone(), "a@b.c"), &policy, &EnvironmentId::firefox())
                .await
                .unwrap();
            assert_eq!(outcome.soft_fail_reason, Some(SoftFailReason::Exhausted));
            assert!(outcome.diagnostics[1].is_skipped());
            assert_eq!(driver.calls(MockOp::Goto), 0);
            assert_eq!(driver.url(), format!("{BASE}/"));
            assert_eq!(driver.value_of(&email).as_deref(), Some(""));
        }

        #[tokio::test]
        async fn test_raw_invocation_is_last_resort() {
            let driver = shop();
            driver.add_element(&login_link(), MockElement::hidden().navigates_to("/login"));
            let policy = FallbackPolicy::new()
                .strategy(EnvironmentId::firefox(), RawInvocation)
                .strategy(EnvironmentId::firefox(), ForcedInteraction);
            let outcome = fast()
                .run(&driver, &open_login(), &policy, &EnvironmentId::firefox())
                .await
                .unwrap();
            assert_eq!(outcome.strategy_index, Some(1));
            assert_eq!(driver.calls(MockOp::DispatchClick), 1);
            assert_eq!(driver.calls(MockOp::ForceClick), 0);
        }
    }

    mod cancellation_tests {
        use super::*;

        #[derive(Debug)]
        struct CancelThenFail(CancellationToken);

        #[async_trait]
        impl FallbackStrategy for CancelThenFail {
            fn name(&self) -> &str {
                "cancel_then_fail"
            }

            async fn attempt(
                &self,
                _driver: &dyn PageDriver,
                _spec: &ActionSpec,
                timeout: Duration,
            ) -> TenazResult<()> {
                self.0.cancel();
                Err(TenazError::timeout(timeout))
            }
        }

        #[derive(Debug)]
        struct Hang;

        #[async_trait]
        impl FallbackStrategy for Hang {
            fn name(&self) -> &str {
                "hang"
            }

            async fn attempt(
                &self,
                _driver: &dyn PageDriver,
                _spec: &ActionSpec,
                _timeout: Duration,
            ) -> TenazResult<()> {
                std::future::pending::<()>().await;
                Ok(())
            }
        }

        #[tokio::test]
        async fn test_cancelled_before_run_touches_nothing() {
            let driver = blocked_link();
            let token = CancellationToken::new();
            token.cancel();
            let err = fast()
                .with_cancellation(token)
                .run(
                    &driver,
                    &open_login(),
                    &FallbackPolicy::browser_quirks(),
                    &EnvironmentId::firefox(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, TenazError::Cancelled));
            assert!(driver.history().is_empty());
        }

        #[tokio::test]
        async fn test_no_strategy_starts_after_cancellation() {
            let driver = blocked_link();
            let token = CancellationToken::new();
            let (tail, calls) = scripted(&[Script::Pass]);
            let mut chain: Vec<Arc<dyn FallbackStrategy>> =
                vec![Arc::new(CancelThenFail(token.clone()))];
            chain.extend(tail.chain(&EnvironmentId::firefox()).unwrap().iter().cloned());
            let policy = FallbackPolicy::new().with_chain(EnvironmentId::firefox(), chain);
            let err = fast()
                .with_cancellation(token)
                .run(&driver, &unconditional_click(), &policy, &EnvironmentId::firefox())
                .await
                .unwrap_err();
            assert!(matches!(err, TenazError::Cancelled));
            assert_eq!(calls[0].load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn test_in_flight_attempt_is_abandoned() {
            let driver = blocked_link();
            let token = CancellationToken::new();
            let policy = FallbackPolicy::new().strategy(EnvironmentId::firefox(), Hang);
            let runner = ResilientActionRunner::new(
                RunnerConfig::new()
                    .with_primary_timeout(Duration::from_millis(30))
                    .with_fallback_timeout(Duration::from_secs(60)),
            )
            .with_cancellation(token.clone());
            let canceller = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                token.cancel();
            });
            let started = Instant::now();
            let err = runner
                .run(&driver, &unconditional_click(), &policy, &EnvironmentId::firefox())
                .await
                .unwrap_err();
            canceller.await.unwrap();
            assert!(matches!(err, TenazError::Cancelled));
            assert!(started.elapsed() < Duration::from_secs(5));
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = RunnerConfig::default();
            assert_eq!(config.primary_timeout(), Duration::from_secs(15));
            assert_eq!(config.fallback_timeout(), Duration::from_secs(10));
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_zero_budget_is_invalid() {
            let config = RunnerConfig::new().with_fallback_timeout(Duration::ZERO);
            assert!(matches!(config.validate(), Err(TenazError::Config { .. })));
        }

        #[test]
        fn test_partial_yaml_uses_defaults() {
            let config: RunnerConfig =
                serde_yaml_ng::from_str("primary_timeout_ms: 500\npost_condition_pattern:\n  regex: /login\n")
                    .unwrap();
            assert_eq!(config.primary_timeout_ms, 500);
            assert_eq!(config.fallback_timeout_ms, DEFAULT_FALLBACK_TIMEOUT_MS);
            assert_eq!(config.post_condition_pattern, Some(UrlPattern::regex("/login")));
        }
    }

    mod ordering_properties {
        use super::*;
        use proptest::prelude::*;

        fn script() -> impl Strategy<Value = Script> {
            prop_oneof![
                Just(Script::Pass),
                Just(Script::Transient),
                Just(Script::Closed),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn prop_first_terminal_strategy_ends_chain(scripts in prop::collection::vec(script(), 0..6)) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .unwrap();
                let (outcome, calls) = runtime.block_on(async {
                    let driver = blocked_link();
                    let (policy, calls) = scripted(&scripts);
                    let outcome = fast()
                        .run(&driver, &unconditional_click(), &policy, &EnvironmentId::firefox())
                        .await
                        .unwrap();
                    (outcome, calls)
                });

                let terminal = scripts
                    .iter()
                    .position(|s| matches!(s, Script::Pass | Script::Closed));
                for (i, counter) in calls.iter().enumerate() {
                    let expected = usize::from(terminal.map_or(true, |t| i <= t));
                    prop_assert_eq!(counter.load(Ordering::SeqCst), expected);
                }
                match terminal.map(|t| (t, scripts[t])) {
                    Some((t, Script::Pass)) => {
                        prop_assert_eq!(outcome.status, ActionStatus::SucceededViaFallback);
                        prop_assert_eq!(outcome.strategy_index, Some(t + 1));
                        prop_assert_eq!(outcome.diagnostics.len(), t);
                    }
                    Some((t, _)) => {
                        prop_assert_eq!(outcome.soft_fail_reason, Some(SoftFailReason::ContextClosed));
                        prop_assert_eq!(outcome.diagnostics.len(), t + 1);
                    }
                    None => {
                        prop_assert_eq!(outcome.soft_fail_reason, Some(SoftFailReason::Exhausted));
                        prop_assert_eq!(outcome.diagnostics.len(), scripts.len());
                    }
                }
            }
        }
    }
}
