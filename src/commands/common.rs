//! Settings shared by the subcommands: color handling, logging and progress display.

use clap::ValueEnum;
use core::time::Duration;
use std::io::{IsTerminal, stderr, stdout};

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    /// Whether console reports written to stdout should be colored.
    #[must_use]
    pub fn for_stdout(self) -> bool {
        self.resolve(|| stdout().is_terminal())
    }

    /// Whether the progress indicator drawn on stderr should be colored.
    #[must_use]
    pub fn for_stderr(self) -> bool {
        self.resolve(|| stderr().is_terminal())
    }

    fn resolve(self, is_terminal: impl FnOnce() -> bool) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => is_terminal(),
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

impl LogLevel {
    const fn filter(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Error => Some("error"),
            Self::Warn => Some("warn"),
            Self::Info => Some("info"),
            Self::Debug => Some("debug"),
            Self::Trace => Some("trace"),
        }
    }

    /// How long the progress indicator waits before showing itself.
    ///
    /// The indicator would garble log output, so it stays hidden whenever logging is on.
    #[must_use]
    pub fn progress_delay(self) -> Duration {
        if self == Self::None {
            Duration::from_millis(300)
        } else {
            Duration::from_hours(365 * 24)
        }
    }
}

/// Initialize logger based on log level. `RUST_LOG` takes precedence when set.
pub fn init_logging(log_level: LogLevel) {
    let Some(level) = log_level.filter() else {
        return;
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // a logger may already be installed when commands run more than once in a process
    let _ = env_logger::Builder::from_env(env)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}
