//! Logging setup.
//!
//! Presets pick per-target levels; `RUST_LOG` overrides them entirely.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Startup, sessions and storage problems only
    #[default]
    Production,
    /// Every state transition
    Verbose,
    /// Everything, including each tick
    Debug,
    /// Warnings and errors only
    Quiet,
}

impl LogPreset {
    /// Picks a preset from CLI flags. Quiet wins, then debug, then verbose.
    pub fn from_flags(verbose: bool, debug: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if debug {
            Self::Debug
        } else if verbose {
            Self::Verbose
        } else {
            Self::Production
        }
    }

    pub fn directives(self) -> &'static str {
        match self {
            Self::Production => {
                "chessbar::startup=info,chessbar::engine=info,chessbar::storage=info,\
                 chessbar::timer=warn,chessbar::notify=warn,chessbar::audio=warn"
            }
            Self::Verbose => "chessbar=debug,chessbar::timer=info",
            Self::Debug => "chessbar=trace",
            Self::Quiet => "chessbar=warn",
        }
    }

    pub fn build_filter(self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }
        EnvFilter::try_new(self.directives()).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize the tracing subscriber.
pub fn init(preset: LogPreset) {
    tracing_subscriber::registry()
        .with(preset.build_filter())
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}
