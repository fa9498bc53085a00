//! `tenaz plan`

use super::check::load_config;
use crate::commands::{OutputFormatArg, PlanArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{PlanReport, Renderer};
use tenaz::{ActionKind, ActionSpec, EnvironmentId, FallbackPolicy, Locator, TenazConfig};

/// Build the action described by the arguments
pub fn build_action(args: &PlanArgs) -> CliResult<ActionSpec> {
    if args.target.trim().is_empty() {
        return Err(CliError::invalid_argument("--target must not be empty"));
    }
    let target = Locator::new(args.target.as_str());
    let mut spec = ActionSpec::new(ActionKind::from(args.kind), target);
    if let Some(input) = &args.input {
        spec = spec.with_input(input.as_str());
    }
    if let Some(url) = &args.navigates_to {
        spec = spec.navigates_to(url.as_str());
    }
    spec.validate()?;
    Ok(spec)
}

/// Plan `spec` against the policy in `config`, or the built-in quirks
pub fn build_report(spec: &ActionSpec, config: Option<&TenazConfig>, env: Option<&str>) -> PlanReport {
    let policy = config.map_or_else(FallbackPolicy::browser_quirks, TenazConfig::policy);
    let environment = env.map_or_else(
        || config.map_or_else(EnvironmentId::chromium, |c| c.environment.clone()),
        EnvironmentId::new,
    );
    PlanReport {
        steps: policy.plan(spec, &environment),
        action: spec.kind().to_string(),
        environment,
    }
}

/// Render the plan for the action described by `args`
pub fn execute_plan(config: &CliConfig, args: &PlanArgs) -> CliResult<String> {
    let spec = build_action(args)?;
    let loaded = args
        .config
        .as_deref()
        .map(|path| load_config(path, |key| std::env::var(key).ok()))
        .transpose()?;
    let report = build_report(&spec, loaded.as_ref(), args.env.as_deref());
    tracing::info!(
        env = %report.environment,
        action = %spec,
        runnable = report.runnable(),
        "fallback plan built"
    );
    match args.format {
        OutputFormatArg::Json => Ok(serde_json::to_string_pretty(&report)?),
        OutputFormatArg::Text => Ok(Renderer::new(config.color.should_color()).plan(&report)),
    }
}
