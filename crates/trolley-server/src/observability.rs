//! Log output: one `fmt` layer behind a reloadable [`EnvFilter`].
//!
//! The subscriber is installed before configuration is read, at `info`, and
//! narrowed or widened once `logging.level` is known. `RUST_LOG`, when set,
//! is used as-is and never replaced.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Connection-level crates that are noisy below `warn`.
const QUIET_TARGETS: &[&str] = &["hyper_util", "h2", "rustls"];

pub fn init_tracing() {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive("info")))
    } else {
        EnvFilter::new(directive("info"))
    };

    let (filter_layer, handle) = reload::Layer::new(filter);
    if tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(false))
        .try_init()
        .is_ok()
    {
        let _ = FILTER_HANDLE.set(handle);
    }
}

/// Switches to `level`. Returns `false` when `RUST_LOG` is in charge or the
/// subscriber was not installed by [`init_tracing`].
pub fn apply_logging_level(level: &str) -> bool {
    if std::env::var_os("RUST_LOG").is_some() {
        return false;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return false;
    };
    match handle.reload(EnvFilter::new(directive(level))) {
        Ok(()) => {
            tracing::debug!(level, "Log level applied");
            true
        }
        Err(e) => {
            tracing::warn!(level, error = %e, "Log level could not be applied");
            false
        }
    }
}

/// Filter directive for `level`, keeping connection internals at `warn` unless
/// everything is switched off.
fn directive(level: &str) -> String {
    if level == "off" {
        return level.to_string();
    }
    QUIET_TARGETS
        .iter()
        .fold(level.to_string(), |acc, target| format!("{acc},{target}=warn"))
}
