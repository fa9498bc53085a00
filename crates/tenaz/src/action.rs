//! Action specifications.
//!
//! An [`ActionSpec`] describes one intended UI action: what to interact with,
//! how, with which payload, and which observable change proves it worked.
//! Specs are built once per step and never mutated afterwards.

use crate::driver::{ActionOptions, PageDriver};
use crate::locator::Locator;
use crate::pattern::UrlPattern;
use crate::result::{TenazError, TenazResult};
use crate::wait::ElementState;
use std::fmt;
use std::time::Duration;

/// Kind of interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Click the target
    Click,
    /// Replace the value of the target input
    Fill,
    /// Clear the target input
    Clear,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Click => "click",
            Self::Fill => "fill",
            Self::Clear => "clear",
        };
        f.write_str(name)
    }
}

/// Observable state change expected after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostCondition {
    /// Page URL matches the pattern
    Url(UrlPattern),
    /// Element becomes visible
    Visible(Locator),
    /// Element becomes hidden or detached
    Hidden(Locator),
}

impl PostCondition {
    /// Check that the condition is well formed
    pub fn validate(&self) -> TenazResult<()> {
        match self {
            Self::Url(pattern) => pattern.validate(),
            Self::Visible(_) | Self::Hidden(_) => Ok(()),
        }
    }

    /// Wait until the condition holds or `timeout` elapses
    pub async fn wait(&self, driver: &dyn PageDriver, timeout: Duration) -> TenazResult<()> {
        let (result, locator, state) = match self {
            Self::Url(pattern) => return driver.wait_for_url(pattern, timeout).await,
            Self::Visible(locator) => (
                driver.wait_for(locator, ElementState::Visible, timeout).await,
                locator,
                ElementState::Visible,
            ),
            Self::Hidden(locator) => (
                driver.wait_for(locator, ElementState::Hidden, timeout).await,
                locator,
                ElementState::Hidden,
            ),
        };
        result.map_err(|e| match e {
            TenazError::Timeout { ms } => TenazError::PostConditionNotMet {
                expected: format!("{locator} {state}"),
                observed: "unchanged".to_string(),
                ms,
            },
            other => other,
        })
    }
}

impl fmt::Display for PostCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(pattern) => write!(f, "{pattern}"),
            Self::Visible(locator) => write!(f, "{locator} visible"),
            Self::Hidden(locator) => write!(f, "{locator} hidden"),
        }
    }
}

/// An intended UI action.
///
/// # Example
///
/// ```
/// use tenaz::{ActionSpec, Locator, UrlPattern};
///
/// let open_login = ActionSpec::click(Locator::new("#navbarColor01 > ul > li:nth-child(3) > a"))
///     .expect_url(UrlPattern::regex("/login"))
///     .navigates_to("/login");
/// assert!(open_login.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    target: Locator,
    kind: ActionKind,
    input: Option<String>,
    require_input: bool,
    post_condition: Option<PostCondition>,
    navigation_target: Option<String>,
}

impl ActionSpec {
    /// Create a spec of any kind without payload
    #[must_use]
    pub const fn new(kind: ActionKind, target: Locator) -> Self {
        Self {
            target,
            kind,
            input: None,
            require_input: false,
            post_condition: None,
            navigation_target: None,
        }
    }

    /// Click the target
    #[must_use]
    pub const fn click(target: Locator) -> Self {
        Self::new(ActionKind::Click, target)
    }

    /// Fill the target with `value`
    #[must_use]
    pub fn fill(target: Locator, value: impl Into<String>) -> Self {
        Self::new(ActionKind::Fill, target).with_input(value)
    }

    /// Clear the target
    #[must_use]
    pub const fn clear(target: Locator) -> Self {
        Self::new(ActionKind::Clear, target)
    }

    /// Set the payload
    #[must_use]
    pub fn with_input(mut self, value: impl Into<String>) -> Self {
        self.input = Some(value.into());
        self
    }

    /// Reject an empty payload
    #[must_use]
    pub const fn require_input(mut self) -> Self {
        self.require_input = true;
        self
    }

    /// Expect the URL to match `pattern` after the action
    #[must_use]
    pub fn expect_url(mut self, pattern: UrlPattern) -> Self {
        self.post_condition = Some(PostCondition::Url(pattern));
        self
    }

    /// Expect `locator` to become visible after the action
    #[must_use]
    pub fn expect_visible(mut self, locator: Locator) -> Self {
        self.post_condition = Some(PostCondition::Visible(locator));
        self
    }

    /// Expect `locator` to disappear after the action
    #[must_use]
    pub fn expect_hidden(mut self, locator: Locator) -> Self {
        self.post_condition = Some(PostCondition::Hidden(locator));
        self
    }

    /// Known location equivalent to the action's effect, used by direct navigation
    #[must_use]
    pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
        self.navigation_target = Some(url.into());
        self
    }

    /// Target locator
    #[must_use]
    pub const fn target(&self) -> &Locator {
        &self.target
    }

    /// Interaction kind
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Payload
    #[must_use]
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// Expected post-condition
    #[must_use]
    pub const fn post_condition(&self) -> Option<&PostCondition> {
        self.post_condition.as_ref()
    }

    /// Direct navigation target
    #[must_use]
    pub fn navigation_target(&self) -> Option<&str> {
        self.navigation_target.as_deref()
    }

    /// Whether the action is expected to change the page location
    #[must_use]
    pub const fn is_navigation(&self) -> bool {
        self.navigation_target.is_some()
            || matches!(self.post_condition, Some(PostCondition::Url(_)))
    }

    /// Reject malformed actions
    pub fn validate(&self) -> TenazResult<()> {
        match (self.kind, self.input.as_deref()) {
            (ActionKind::Fill, None) => {
                return Err(TenazError::invalid_spec(format!(
                    "fill on {} has no input",
                    self.target
                )));
            }
            (ActionKind::Fill, Some("")) if self.require_input => {
                return Err(TenazError::invalid_spec(format!(
                    "fill on {} requires a non-empty input",
                    self.target
                )));
            }
            (ActionKind::Click | ActionKind::Clear, Some(_)) => {
                return Err(TenazError::invalid_spec(format!(
                    "{} on {} takes no input",
                    self.kind, self.target
                )));
            }
            _ => {}
        }
        if let Some(condition) = &self.post_condition {
            condition.validate()?;
        }
        if self.navigation_target.as_deref() == Some("") {
            return Err(TenazError::invalid_spec("navigation target is empty"));
        }
        Ok(())
    }

    /// Perform the interaction itself, without post-condition
    pub async fn perform(&self, driver: &dyn PageDriver, options: ActionOptions) -> TenazResult<()> {
        match self.kind {
            ActionKind::Click => driver.click(&self.target, options).await,
            ActionKind::Fill => {
                let value = self.input.as_deref().unwrap_or_default();
                driver.fill(&self.target, value, options).await
            }
            ActionKind::Clear => driver.clear(&self.target, options).await,
        }
    }
}

impl fmt::Display for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.target)
    }
}
