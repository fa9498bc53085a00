//! Tenaz: resilient UI actions for cross-browser end-to-end tests
//!
//! Tenaz (Spanish: "tenacious") runs a UI action through its primary path
//! and, when that path fails for a reason known to be flaky on a browser,
//! walks an ordered chain of fallback strategies registered for that
//! browser. Every run ends in one of three outcomes: succeeded, succeeded
//! via fallback, or soft failed with per-strategy diagnostics.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────┐   ┌──────────────┐
//! │ Page objects │──►│ ResilientActionRunner │──►│ PageDriver   │
//! │ (ActionSpec) │   │  primary + fallbacks  │   │ (mock / CDP) │
//! └──────────────┘   └──────────┬───────────┘   └──────────────┘
//!                               │
//!                     ┌─────────▼─────────┐
//!                     │  FallbackPolicy   │
//!                     │ env → [strategy]  │
//!                     └───────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tenaz::{EnvironmentId, FallbackPolicy, HomePage, MockDriver, ResilientActionRunner};
//!
//! # async fn demo() -> tenaz::TenazResult<()> {
//! let driver = MockDriver::new().with_base_url("https://sweetshop.netlify.app");
//! let home = HomePage::new();
//! home.navigate(&driver).await?;
//!
//! let runner = ResilientActionRunner::default();
//! let outcome = runner
//!     .run(
//!         &driver,
//!         &home.login_link_action(),
//!         &FallbackPolicy::browser_quirks(),
//!         &EnvironmentId::firefox(),
//!     )
//!     .await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod action;
#[cfg(feature = "browser")]
mod cdp;
mod config;
mod driver;
mod locator;
mod logging;
mod outcome;
pub mod pages;
mod pattern;
mod policy;
mod result;
mod runner;
mod wait;

pub use action::{ActionKind, ActionSpec, PostCondition};
#[cfg(feature = "browser")]
pub use cdp::{CdpDriver, CdpDriverConfig};
pub use config::{TenazConfig, DEFAULT_BASE_URL};
pub use driver::{
    resolve_url, ActionOptions, MockDriver, MockElement, MockOp, PageDriver,
    DEFAULT_ACTION_TIMEOUT_MS,
};
pub use locator::{Locator, Selector};
pub use logging::{build_subscriber, init_logging, LogConfig, LogFormat};
pub use outcome::{ActionOutcome, ActionStatus, Diagnostic, DiagnosticKind, SoftFailReason};
pub use pages::{
    is_current, BasketPage, HomePage, LoginPage, PageObject, PaymentDetails, ProductPage,
    QuantityDirection, ShippingDetails, DEFAULT_PAGE_LOAD_TIMEOUT_MS,
};
pub use pattern::UrlPattern;
pub use policy::{
    Applicability, DirectNavigation, EnvironmentId, FallbackPolicy, FallbackStrategy,
    ForcedInteraction, PlannedStep, RawInvocation, StrategyConfig,
};
pub use result::{ErrorClass, TenazError, TenazResult};
pub use runner::{
    ResilientActionRunner, RunnerConfig, DEFAULT_FALLBACK_TIMEOUT_MS, DEFAULT_PRIMARY_TIMEOUT_MS,
};
pub use wait::{
    poll_until, ElementState, LoadState, WaitOptions, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};

/// Re-exports for `use tenaz::prelude::*`
pub mod prelude {
    pub use crate::{
        ActionOutcome, ActionSpec, ActionStatus, EnvironmentId, FallbackPolicy, FallbackStrategy,
        Locator, PageDriver, PageObject, ResilientActionRunner, TenazError, TenazResult,
        UrlPattern,
    };
}
