//! Diagnostics for the `epubkit` binary.
//!
//! Library code only emits `tracing` events; this module installs the
//! subscriber that renders them. Everything goes to stderr so that `cat` and
//! JSON output on stdout stay machine-readable.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much diagnostic output to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Progress messages.
    #[default]
    Normal,
    /// Parse progress and individual check findings.
    Verbose,
    /// Every element the parsers visit.
    Trace,
}

impl Verbosity {
    /// Map `-q` and the number of `-v` flags to a verbosity. `-q` wins.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The most detailed level shown for `epubkit` events.
    #[must_use]
    pub fn level(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    /// Filter directives used when `RUST_LOG` is unset. Other crates stay at
    /// `warn`.
    #[must_use]
    pub fn directives(self) -> String {
        format!("warn,epubkit={}", self.level()).to_lowercase()
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` replaces the directives derived from `verbosity`. Event targets
/// are shown from [`Verbosity::Verbose`] up. Calling this again is a no-op.
///
/// ```no_run
/// use epubkit::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(1, false));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= Verbosity::Verbose);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}
