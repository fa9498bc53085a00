//! Per-invocation settings derived from the global flags

use tenaz::LogConfig;

/// How much the binary prints and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Default output
    #[default]
    Normal,
    /// Runner decisions
    Verbose,
    /// Everything, including driver calls
    Debug,
}

impl Verbosity {
    /// From the `-q` flag and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// `-q` given
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// At least one `-v`
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Log filter directive for this level
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Whether rendered output is styled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Style even when piped
    Always,
    /// Style when stdout supports it
    #[default]
    Auto,
    /// Plain text
    Never,
}

impl ColorChoice {
    /// Resolve against the actual stdout
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stdout().features().colors_supported(),
        }
    }
}

/// Settings shared by all subcommands
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Output level
    pub verbosity: Verbosity,
    /// Whether rendered output is styled
    pub color: ColorChoice,
}

impl CliConfig {
    /// Normal verbosity, automatic color
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Logging for this invocation; `RUST_LOG` still wins
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig::new().with_filter(self.verbosity.log_filter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(false, 3), Verbosity::Debug);
            assert_eq!(Verbosity::from_flags(true, 2), Verbosity::Quiet);
        }

        #[test]
        fn test_predicates() {
            assert!(Verbosity::Quiet.is_quiet());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Debug.is_verbose());
        }

        #[test]
        fn test_log_filter_per_level() {
            assert_eq!(Verbosity::Quiet.log_filter(), "error");
            assert_eq!(Verbosity::Verbose.log_filter(), "info");
            assert_eq!(
                CliConfig::new()
                    .with_verbosity(Verbosity::Debug)
                    .log_config()
                    .filter,
                "debug"
            );
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_explicit_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }

        #[test]
        fn test_builder() {
            let config = CliConfig::new().with_color(ColorChoice::Never);
            assert_eq!(config.color, ColorChoice::Never);
            assert_eq!(config.verbosity, Verbosity::Normal);
        }
    }
}
