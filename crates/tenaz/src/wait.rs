//! Load and element states, and the polling loop behind every driver wait.

use crate::result::{TenazError, TenazResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Budget of waits that have no explicit timeout
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Pause between two checks of a polling wait
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// How far a navigation must get before it counts as done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// `load` fired
    #[default]
    Load,
    /// `DOMContentLoaded` fired
    DomContentLoaded,
    /// No new network activity for 500ms
    NetworkIdle,
}

impl LoadState {
    /// Name as reported in logs and mock histories
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target state for `wait_for`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    /// In the DOM
    Attached,
    /// Not in the DOM
    Detached,
    /// In the DOM and rendered
    #[default]
    Visible,
    /// Missing or not rendered
    Hidden,
}

impl std::fmt::Display for ElementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        };
        f.write_str(name)
    }
}

/// Budget and cadence of a polling wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Give up after this long
    pub timeout: Duration,
    /// Pause between checks
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::within(Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS))
    }
}

impl WaitOptions {
    /// Wait up to `timeout` at the default cadence
    #[must_use]
    pub const fn within(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Check every `interval` instead
    #[must_use]
    pub const fn every(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Poll `check` until it reports `true` or the timeout elapses.
///
/// Errors from `check` are returned immediately. The check always runs at
/// least once, even with a zero timeout.
pub async fn poll_until<F, Fut>(options: WaitOptions, mut check: F) -> TenazResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TenazResult<bool>>,
{
    let deadline = Instant::now() + options.timeout;
    loop {
        if check().await? {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(TenazError::timeout(options.timeout));
        }
        tokio::time::sleep(options.poll_interval.min(deadline - now)).await;
    }
}
