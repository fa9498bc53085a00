//! Rendering of configuration summaries and fallback plans

use console::style;
use serde::Serialize;
use tenaz::{Applicability, EnvironmentId, PlannedStep, TenazConfig};

/// Plan for one action under one environment
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    /// Environment the plan is for
    pub environment: EnvironmentId,
    /// Action kind
    pub action: String,
    /// Chain, `None` when the environment has no policy
    pub steps: Option<Vec<PlannedStep>>,
}

impl PlanReport {
    /// Number of strategies that would be attempted
    #[must_use]
    pub fn runnable(&self) -> usize {
        self.steps.as_deref().map_or(0, |steps| {
            steps
                .iter()
                .filter(|s| s.applicability == Applicability::Applies)
                .count()
        })
    }
}

/// Text renderer, styled or plain
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    use_color: bool,
}

impl Renderer {
    /// Create a renderer
    #[must_use]
    pub const fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn header(self, text: &str) -> String {
        if self.use_color {
            style(text).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn runs(self) -> String {
        if self.use_color {
            style("run ").green().to_string()
        } else {
            "run ".to_string()
        }
    }

    fn skips(self) -> String {
        if self.use_color {
            style("skip").yellow().to_string()
        } else {
            "skip".to_string()
        }
    }

    /// Summary of a validated configuration
    #[must_use]
    pub fn config_summary(self, config: &TenazConfig) -> String {
        let mut out = String::new();
        out.push_str(&self.header("Configuration OK"));
        out.push('\n');
        out.push_str(&format!("  base url:    {}\n", config.base_url));
        out.push_str(&format!("  environment: {}\n", config.environment));
        out.push_str(&format!(
            "  timeouts:    primary {}ms, fallback {}ms\n",
            config.runner.primary_timeout_ms, config.runner.fallback_timeout_ms
        ));
        if let Some(pattern) = &config.runner.post_condition_pattern {
            out.push_str(&format!("  default post-condition: {pattern}\n"));
        }
        out.push_str(&self.header("Fallback chains"));
        out.push('\n');
        if config.policies.is_empty() {
            out.push_str("  (none)\n");
        }
        for (env, chain) in &config.policies {
            let names: Vec<String> = chain
                .iter()
                .map(|s| s.build().name().to_string())
                .collect();
            let chain = if names.is_empty() {
                "(empty)".to_string()
            } else {
                names.join(" -> ")
            };
            out.push_str(&format!("  {env}: {chain}\n"));
        }
        out
    }

    /// Step list of a plan
    #[must_use]
    pub fn plan(self, report: &PlanReport) -> String {
        let mut out = String::new();
        out.push_str(&self.header(&format!(
            "Fallback plan for {} on {}",
            report.action, report.environment
        )));
        out.push('\n');
        match &report.steps {
            None => out.push_str(&format!(
                "  no fallback policy for '{}': a primary failure is raised to the caller\n",
                report.environment
            )),
            Some(steps) if steps.is_empty() => {
                out.push_str("  empty chain: a primary failure soft-fails\n");
            }
            Some(steps) => {
                for step in steps {
                    match &step.applicability {
                        Applicability::Applies => {
                            out.push_str(&format!(
                                "  {} {}. {}\n",
                                self.runs(),
                                step.index,
                                step.strategy
                            ));
                        }
                        Applicability::Skip(reason) => {
                            out.push_str(&format!(
                                "  {} {}. {} ({reason})\n",
                                self.skips(),
                                step.index,
                                step.strategy
                            ));
                        }
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tenaz::{ActionSpec, FallbackPolicy, Locator};

    fn firefox_plan(spec: &ActionSpec) -> PlanReport {
        let env = EnvironmentId::firefox();
        PlanReport {
            steps: FallbackPolicy::browser_quirks().plan(spec, &env),
            environment: env,
            action: spec.kind().to_string(),
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_default_config_summary() {
            let text = Renderer::new(false).config_summary(&TenazConfig::default());
            assert!(text.contains("environment: chromium"));
            assert!(text.contains("primary 15000ms, fallback 10000ms"));
            assert!(text
                .contains("firefox: forced_interaction -> direct_navigation -> raw_invocation"));
        }

        #[test]
        fn test_no_policies() {
            let config = TenazConfig {
                policies: std::collections::BTreeMap::new(),
                ..TenazConfig::default()
            };
            let text = Renderer::new(false).config_summary(&config);
            assert!(text.contains("(none)"));
        }
    }

    mod plan_tests {
        use super::*;

        #[test]
        fn test_click_with_target_runs_everything() {
            let spec = ActionSpec::click(Locator::new("a.login")).navigates_to("/login");
            let report = firefox_plan(&spec);
            assert_eq!(report.runnable(), 3);
            let text = Renderer::new(false).plan(&report);
            assert!(text.contains("run  2. direct_navigation"));
            assert!(!text.contains("skip"));
        }

        #[test]
        fn test_fill_skips_navigation_and_raw() {
            let spec = ActionSpec::fill(Locator::new("#email"), "a@b.c");
            let report = firefox_plan(&spec);
            assert_eq!(report.runnable(), 1);
            let text = Renderer::new(false).plan(&report);
            assert!(text.contains("skip 2. direct_navigation (a fill does not navigate)"));
            assert!(text.contains("skip 3. raw_invocation"));
        }

        #[test]
        fn test_missing_policy() {
            let spec = ActionSpec::click(Locator::new("a"));
            let env = EnvironmentId::webkit();
            let report = PlanReport {
                steps: FallbackPolicy::browser_quirks().plan(&spec, &env),
                environment: env,
                action: "click".into(),
            };
            assert_eq!(report.runnable(), 0);
            let text = Renderer::new(false).plan(&report);
            assert!(text.contains("no fallback policy for 'webkit'"));
        }

        #[test]
        fn test_report_serializes() {
            let spec = ActionSpec::click(Locator::new("a")).navigates_to("/basket");
            let json = serde_json::to_value(firefox_plan(&spec)).unwrap();
            assert_eq!(json["environment"], "firefox");
            assert_eq!(json["steps"][0]["strategy"], "forced_interaction");
            assert_eq!(json["steps"][0]["applicability"]["decision"], "applies");
        }
    }
}
