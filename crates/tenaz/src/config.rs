//! Suite configuration.
//!
//! Loaded from YAML (or JSON, by extension), then overridden from the
//! environment:
//!
//! | Variable                    | Field                          |
//! |-----------------------------|--------------------------------|
//! | `TENAZ_ENV`                 | `environment`                  |
//! | `TENAZ_BASE_URL`            | `base_url`                     |
//! | `TENAZ_PRIMARY_TIMEOUT_MS`  | `runner.primary_timeout_ms`    |
//! | `TENAZ_FALLBACK_TIMEOUT_MS` | `runner.fallback_timeout_ms`   |

use crate::logging::LogConfig;
use crate::policy::{EnvironmentId, FallbackPolicy, StrategyConfig};
use crate::result::{TenazError, TenazResult};
use crate::runner::{ResilientActionRunner, RunnerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default shop under test
pub const DEFAULT_BASE_URL: &str = "https://sweetshop.netlify.app";

/// Suite configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenazConfig {
    /// Base URL of the application under test
    pub base_url: String,
    /// Browser engine the suite runs on
    pub environment: EnvironmentId,
    /// Runner budgets and default post-condition
    pub runner: RunnerConfig,
    /// Fallback chains per environment
    pub policies: BTreeMap<EnvironmentId, Vec<StrategyConfig>>,
    /// Logging
    pub logging: LogConfig,
}

impl Default for TenazConfig {
    fn default() -> Self {
        let mut policies = BTreeMap::new();
        let _ = policies.insert(
            EnvironmentId::firefox(),
            vec![
                StrategyConfig::ForcedInteraction,
                StrategyConfig::DirectNavigation,
                StrategyConfig::RawInvocation,
            ],
        );
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            environment: EnvironmentId::chromium(),
            runner: RunnerConfig::default(),
            policies,
            logging: LogConfig::default(),
        }
    }
}

impl TenazConfig {
    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> TenazResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a file, JSON when the extension is `.json`, YAML otherwise
    pub fn load(path: impl AsRef<Path>) -> TenazResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: Self = if is_json {
            serde_json::from_str(&text)?
        } else {
            serde_yaml_ng::from_str(&text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> TenazResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Apply `TENAZ_*` variables from the process environment
    pub fn with_env_overrides(self) -> TenazResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `TENAZ_*` overrides looked up through `lookup`
    pub fn with_overrides<F>(mut self, lookup: F) -> TenazResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("TENAZ_ENV") {
            self.environment = EnvironmentId::new(env);
        }
        if let Some(url) = lookup("TENAZ_BASE_URL") {
            self.base_url = url;
        }
        if let Some(ms) = lookup("TENAZ_PRIMARY_TIMEOUT_MS") {
            self.runner.primary_timeout_ms = parse_ms("TENAZ_PRIMARY_TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("TENAZ_FALLBACK_TIMEOUT_MS") {
            self.runner.fallback_timeout_ms = parse_ms("TENAZ_FALLBACK_TIMEOUT_MS", &ms)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> TenazResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(TenazError::config("base_url must not be empty"));
        }
        if self.environment.as_str().is_empty() {
            return Err(TenazError::config("environment must not be empty"));
        }
        if self.policies.keys().any(|env| env.as_str().is_empty()) {
            return Err(TenazError::config("policy environment must not be empty"));
        }
        self.runner.validate()?;
        self.logging.env_filter().map(|_| ())
    }

    /// Fallback policy described by `policies`
    #[must_use]
    pub fn policy(&self) -> FallbackPolicy {
        FallbackPolicy::from_config(&self.policies)
    }

    /// Runner configured with `runner`
    #[must_use]
    pub fn runner(&self) -> ResilientActionRunner {
        ResilientActionRunner::new(self.runner.clone())
    }
}

fn parse_ms(key: &str, value: &str) -> TenazResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| TenazError::config(format!("{key}='{value}' is not a millisecond count: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;
    use crate::pattern::UrlPattern;
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"
base_url: https://sweetshop.netlify.app
environment: firefox
runner:
  primary_timeout_ms: 15000
  fallback_timeout_ms: 10000
  post_condition_pattern: { regex: "/login" }
policies:
  firefox:
    - forced_interaction
    - direct_navigation
    - raw_invocation
  webkit:
    - raw_invocation
logging:
  filter: info
  format: json
"#;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_sample() {
            let config = TenazConfig::from_yaml_str(SAMPLE).unwrap();
            assert_eq!(config.environment, EnvironmentId::firefox());
            assert_eq!(config.runner.post_condition_pattern, Some(UrlPattern::regex("/login")));
            assert_eq!(config.policies.len(), 2);
            assert_eq!(config.logging.format, LogFormat::Json);
            let policy = config.policy();
            assert_eq!(policy.chain(&EnvironmentId::firefox()).unwrap().len(), 3);
            assert_eq!(
                policy.chain(&EnvironmentId::webkit()).unwrap()[0].name(),
                "raw_invocation"
            );
        }

        #[test]
        fn test_empty_document_is_default() {
            let config = TenazConfig::from_yaml_str("{}").unwrap();
            assert_eq!(config, TenazConfig::default());
        }

        #[test]
        fn test_unknown_strategy_is_rejected() {
            let err = TenazConfig::from_yaml_str("policies:\n  firefox: [teleport]\n").unwrap_err();
            assert!(matches!(err, TenazError::Yaml(_)));
        }

        #[test]
        fn test_bad_pattern_is_rejected() {
            let yaml = "runner:\n  post_condition_pattern: { regex: \"[login\" }\n";
            assert!(matches!(
                TenazConfig::from_yaml_str(yaml),
                Err(TenazError::InvalidPattern { .. })
            ));
        }

        #[test]
        fn test_yaml_round_trip() {
            let config = TenazConfig::from_yaml_str(SAMPLE).unwrap();
            let again = TenazConfig::from_yaml_str(&config.to_yaml().unwrap()).unwrap();
            assert_eq!(config, again);
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn test_load_yaml_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tenaz.yaml");
            std::fs::write(&path, SAMPLE).unwrap();
            let config = TenazConfig::load(&path).unwrap();
            assert_eq!(config.environment, EnvironmentId::firefox());
        }

        #[test]
        fn test_load_json_file() {
            let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
            write!(file, r#"{{"environment": "webkit", "policies": {{"webkit": ["forced_interaction"]}}}}"#)
                .unwrap();
            let config = TenazConfig::load(file.path()).unwrap();
            assert_eq!(config.environment, EnvironmentId::webkit());
            assert_eq!(config.base_url, DEFAULT_BASE_URL);
        }

        #[test]
        fn test_missing_file_is_io_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = TenazConfig::load(dir.path().join("absent.yaml")).unwrap_err();
            assert!(matches!(err, TenazError::Io(_)));
        }
    }

    mod override_tests {
        use super::*;

        #[test]
        fn test_overrides_apply() {
            let config = TenazConfig::default()
                .with_overrides(vars(&[
                    ("TENAZ_ENV", "Firefox"),
                    ("TENAZ_BASE_URL", "http://localhost:8080"),
                    ("TENAZ_PRIMARY_TIMEOUT_MS", "2000"),
                    ("TENAZ_FALLBACK_TIMEOUT_MS", " 500 "),
                ]))
                .unwrap();
            assert_eq!(config.environment, EnvironmentId::firefox());
            assert_eq!(config.base_url, "http://localhost:8080");
            assert_eq!(config.runner.primary_timeout_ms, 2000);
            assert_eq!(config.runner.fallback_timeout_ms, 500);
        }

        #[test]
        fn test_non_numeric_timeout_is_config_error() {
            let err = TenazConfig::default()
                .with_overrides(vars(&[("TENAZ_PRIMARY_TIMEOUT_MS", "soon")]))
                .unwrap_err();
            assert!(matches!(err, TenazError::Config { .. }));
        }

        #[test]
        fn test_zero_timeout_is_config_error() {
            let err = TenazConfig::default()
                .with_overrides(vars(&[("TENAZ_FALLBACK_TIMEOUT_MS", "0")]))
                .unwrap_err();
            assert!(matches!(err, TenazError::Config { .. }));
        }

        #[test]
        fn test_mixed_case_policy_key_matches_env_override() {
            let config = TenazConfig::from_yaml_str("policies: { Firefox: [forced_interaction] }\n")
                .unwrap()
                .with_overrides(vars(&[("TENAZ_ENV", "firefox")]))
                .unwrap();
            let policy = config.policy();
            let chain = policy.chain(&config.environment).unwrap();
            assert_eq!(chain.len(), 1);
            assert_eq!(chain[0].name(), "forced_interaction");
        }

        #[test]
        fn test_no_overrides_keeps_file_values() {
            let config = TenazConfig::from_yaml_str(SAMPLE).unwrap();
            let same = config.clone().with_overrides(vars(&[])).unwrap();
            assert_eq!(config, same);
        }
    }
}
