//! Centralised tracing initialisation for programs embedding Jury.
//!
//! Call [`init_tracing`] (or [`init_tracing_for`]) once at program start to
//! configure the global subscriber with an `EnvFilter` and optional JSON
//! formatting. Later calls are ignored.
//!
//! Without `RUST_LOG` the filter keeps every other crate at `warn` and
//! applies the requested level to the Jury crates only. Stage transitions
//! and generation fallbacks are `debug` events; measurement start, finish
//! and verbose traces are `info`; failed measurements are `warn`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::HarnessConfig;

/// Crates whose events the default filter lets through at the chosen level.
const JURY_TARGETS: &[&str] = &["jury_core", "judge_model"];

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    std::iter::once("warn".to_string())
        .chain(JURY_TARGETS.iter().map(|t| format!("{t}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialise the global tracing subscriber.
///
/// * `json`: when `true`, emit newline-delimited JSON log lines.
/// * `level`: verbosity of the Jury crates when `RUST_LOG` is not set.
///
/// `RUST_LOG` overrides the default, e.g.
/// `RUST_LOG=jury_core::structured=debug` to watch generation tiers.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}

/// Initialise tracing at the level a harness configuration asks for:
/// `debug` with `verbose_mode`, so stage transitions show, `info` otherwise.
pub fn init_tracing_for(config: &HarnessConfig, json: bool) {
    let level = if config.verbose_mode {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(json, level);
}
