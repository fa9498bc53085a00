//! `tenaz check`

use crate::commands::{CheckArgs, OutputFormatArg};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Renderer;
use std::path::Path;
use tenaz::TenazConfig;

/// Load `path` and apply `TENAZ_*` overrides from `lookup`
pub fn load_config<F>(path: &Path, lookup: F) -> CliResult<TenazConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if !path.exists() {
        return Err(CliError::config(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let config = TenazConfig::load(path)?.with_overrides(lookup)?;
    tracing::debug!(path = %path.display(), env = %config.environment, "configuration loaded");
    Ok(config)
}

/// Validate the configuration and render its summary
pub fn execute_check(config: &CliConfig, args: &CheckArgs) -> CliResult<String> {
    let loaded = load_config(&args.config, |key| std::env::var(key).ok())?;
    match args.format {
        OutputFormatArg::Json => Ok(serde_json::to_string_pretty(&loaded)?),
        OutputFormatArg::Text => Ok(Renderer::new(config.color.should_color()).config_summary(&loaded)),
    }
}
