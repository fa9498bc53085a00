//! Results of a resilient action run.

use crate::result::TenazError;
use std::fmt;
use std::time::Duration;

/// Final status of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionStatus {
    /// The primary attempt satisfied the post-condition
    Succeeded,
    /// A fallback strategy satisfied the post-condition
    SucceededViaFallback,
    /// Every strategy failed with an absorbable error, or the page went away
    SoftFailed,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Succeeded => "succeeded",
            Self::SucceededViaFallback => "succeeded via fallback",
            Self::SoftFailed => "soft failed",
        };
        f.write_str(name)
    }
}

/// Why a run ended soft-failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoftFailReason {
    /// Every strategy in the chain was tried
    Exhausted,
    /// The page context closed mid-chain
    ContextClosed,
}

impl fmt::Display for SoftFailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => f.write_str("fallbacks exhausted"),
            Self::ContextClosed => f.write_str("context closed"),
        }
    }
}

/// What happened to one strategy
#[derive(Debug)]
pub enum DiagnosticKind {
    /// The strategy ran and failed
    Failed(TenazError),
    /// The strategy did not apply to the action
    Skipped(String),
}

/// Record of one strategy attempt
#[derive(Debug)]
pub struct Diagnostic {
    /// Strategy index, 0 is the primary attempt
    pub index: usize,
    /// Strategy name
    pub strategy: String,
    /// Outcome of the strategy
    pub kind: DiagnosticKind,
    /// Time spent on the strategy
    pub elapsed: Duration,
}

impl Diagnostic {
    /// Error of a failed attempt
    #[must_use]
    pub const fn error(&self) -> Option<&TenazError> {
        match &self.kind {
            DiagnosticKind::Failed(error) => Some(error),
            DiagnosticKind::Skipped(_) => None,
        }
    }

    /// Whether the strategy was skipped
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self.kind, DiagnosticKind::Skipped(_))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::Failed(error) => {
                write!(f, "#{} {} failed: {error}", self.index, self.strategy)
            }
            DiagnosticKind::Skipped(reason) => {
                write!(f, "#{} {} skipped: {reason}", self.index, self.strategy)
            }
        }
    }
}

/// Outcome of [`ResilientActionRunner::run`](crate::ResilientActionRunner::run)
#[derive(Debug)]
pub struct ActionOutcome {
    /// Final status
    pub status: ActionStatus,
    /// Index of the strategy that succeeded, `None` when soft-failed
    pub strategy_index: Option<usize>,
    /// Error of the primary attempt, when it failed
    pub primary_error: Option<TenazError>,
    /// One entry per fallback strategy in the chain that was reached
    pub diagnostics: Vec<Diagnostic>,
    /// Set when soft-failed
    pub soft_fail_reason: Option<SoftFailReason>,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

impl ActionOutcome {
    pub(crate) const fn succeeded(elapsed: Duration) -> Self {
        Self {
            status: ActionStatus::Succeeded,
            strategy_index: Some(0),
            primary_error: None,
            diagnostics: Vec::new(),
            soft_fail_reason: None,
            elapsed,
        }
    }

    pub(crate) fn via_fallback(
        index: usize,
        primary_error: TenazError,
        diagnostics: Vec<Diagnostic>,
        elapsed: Duration,
    ) -> Self {
        Self {
            status: ActionStatus::SucceededViaFallback,
            strategy_index: Some(index),
            primary_error: Some(primary_error),
            diagnostics,
            soft_fail_reason: None,
            elapsed,
        }
    }

    pub(crate) fn soft_failed(
        reason: SoftFailReason,
        primary_error: TenazError,
        diagnostics: Vec<Diagnostic>,
        elapsed: Duration,
    ) -> Self {
        Self {
            status: ActionStatus::SoftFailed,
            strategy_index: None,
            primary_error: Some(primary_error),
            diagnostics,
            soft_fail_reason: Some(reason),
            elapsed,
        }
    }

    /// Whether the action took effect
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(
            self.status,
            ActionStatus::Succeeded | ActionStatus::SucceededViaFallback
        )
    }

    /// Whether the run was absorbed as a soft failure
    #[must_use]
    pub const fn is_soft_failed(&self) -> bool {
        matches!(self.status, ActionStatus::SoftFailed)
    }

    /// Number of fallbacks that actually ran
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.diagnostics.iter().filter(|d| !d.is_skipped()).count()
            + usize::from(self.status == ActionStatus::SucceededViaFallback)
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(index) = self.strategy_index.filter(|i| *i > 0) {
            write!(f, " (strategy {index})")?;
        }
        if let Some(reason) = self.soft_fail_reason {
            write!(f, " ({reason})")?;
        }
        write!(f, " in {}ms", self.elapsed.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(index: usize) -> Diagnostic {
        Diagnostic {
            index,
            strategy: "forced_interaction".to_string(),
            kind: DiagnosticKind::Failed(TenazError::timeout(Duration::from_millis(10))),
            elapsed: Duration::from_millis(10),
        }
    }

    fn skipped(index: usize) -> Diagnostic {
        Diagnostic {
            index,
            strategy: "raw_invocation".to_string(),
            kind: DiagnosticKind::Skipped("not a click".to_string()),
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_succeeded_has_no_diagnostics() {
        let outcome = ActionOutcome::succeeded(Duration::from_millis(3));
        assert!(outcome.is_success());
        assert_eq!(outcome.strategy_index, Some(0));
        assert!(outcome.primary_error.is_none());
        assert_eq!(outcome.to_string(), "succeeded in 3ms");
    }

    #[test]
    fn test_attempts_count_only_strategies_that_ran() {
        let outcome = ActionOutcome::via_fallback(
            3,
            TenazError::closed("x"),
            vec![failed(1), skipped(2)],
            Duration::from_millis(40),
        );
        assert_eq!(outcome.attempts(), 2);
        assert_eq!(outcome.to_string(), "succeeded via fallback (strategy 3) in 40ms");
    }

    #[test]
    fn test_soft_failed() {
        let outcome = ActionOutcome::soft_failed(
            SoftFailReason::Exhausted,
            TenazError::timeout(Duration::from_millis(10)),
            vec![failed(1)],
            Duration::from_millis(20),
        );
        assert!(outcome.is_soft_failed());
        assert!(!outcome.is_success());
        assert_eq!(outcome.strategy_index, None);
        assert!(outcome.diagnostics[0].error().is_some());
        assert_eq!(outcome.to_string(), "soft failed (fallbacks exhausted) in 20ms");
    }

    #[test]
    fn test_closed_context_reads_plainly() {
        let outcome = ActionOutcome::soft_failed(
            SoftFailReason::ContextClosed,
            TenazError::closed("target closed"),
            Vec::new(),
            Duration::from_millis(5),
        );
        assert_eq!(outcome.to_string(), "soft failed (context closed) in 5ms");
    }

    #[test]
    fn test_diagnostic_display() {
        assert_eq!(
            skipped(2).to_string(),
            "#2 raw_invocation skipped: not a click"
        );
        assert!(failed(1).to_string().starts_with("#1 forced_interaction failed"));
    }
}
