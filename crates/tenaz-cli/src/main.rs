//! Tenaz CLI
//!
//! ## Usage
//!
//! ```bash
//! tenaz check tenaz.yaml                                  # Validate a config
//! tenaz plan --env firefox --navigates-to /login          # Preview a click
//! tenaz plan -c tenaz.yaml --kind fill --input a@b.c      # Preview a fill
//! ```

use clap::Parser;
use std::process::ExitCode;
use tenaz_cli::{handlers, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    let _ = tenaz::init_logging(&config.log_config())?;

    let output = match &cli.command {
        Commands::Check(args) => handlers::execute_check(&config, args)?,
        Commands::Plan(args) => handlers::execute_plan(&config, args)?,
    };
    if !config.verbosity.is_quiet() {
        print!("{output}");
        if !output.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}
