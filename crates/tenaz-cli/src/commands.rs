//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tenaz::ActionKind;

/// Tenaz: resilient UI actions for cross-browser end-to-end tests
#[derive(Parser, Debug)]
#[command(name = "tenaz")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a configuration and show its fallback chains
    Check(CheckArgs),

    /// Show which fallback strategies would run for an action
    Plan(PlanArgs),
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Configuration file (YAML, or JSON by extension)
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormatArg,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Configuration file; the built-in browser quirks when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Environment (browser engine); the configured one when omitted
    #[arg(short, long)]
    pub env: Option<String>,

    /// Action kind
    #[arg(short, long, default_value = "click")]
    pub kind: ActionKindArg,

    /// CSS selector of the target
    #[arg(short, long, default_value = "body")]
    pub target: String,

    /// Known URL the action leads to
    #[arg(long)]
    pub navigates_to: Option<String>,

    /// Payload for fill actions
    #[arg(long)]
    pub input: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormatArg,
}

/// Action kind argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActionKindArg {
    /// Click the target
    #[default]
    Click,
    /// Fill the target input
    Fill,
    /// Clear the target input
    Clear,
}

impl From<ActionKindArg> for ActionKind {
    fn from(arg: ActionKindArg) -> Self {
        match arg {
            ActionKindArg::Click => Self::Click,
            ActionKindArg::Fill => Self::Fill,
            ActionKindArg::Clear => Self::Clear,
        }
    }
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Color choice argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
