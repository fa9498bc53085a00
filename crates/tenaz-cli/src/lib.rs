//! Tenaz CLI Library
//!
//! Command-line interface for Tenaz: validate configurations and preview
//! which fallback strategies an action would go through, without a browser.

#![warn(missing_docs)]
#![allow(clippy::format_push_string)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    ActionKindArg, CheckArgs, Cli, ColorArg, Commands, OutputFormatArg, PlanArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{PlanReport, Renderer};
