//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over the configured level when set.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use tunestats_domain::{LoggingSettings, Result, TuneStatsError};

/// Install the global subscriber.
///
/// # Errors
/// `TuneStatsError::Config` for an unparsable level, `Internal` if a global
/// subscriber is already installed.
pub fn init_tracing(settings: &LoggingSettings) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level).map_err(|e| {
            TuneStatsError::Config(format!("invalid log level {:?}: {e}", settings.level))
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if settings.json {
        registry.with(fmt::layer().json().with_target(true).with_thread_ids(false)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)).try_init()
    };

    installed.map_err(|e| TuneStatsError::Internal(format!("tracing already initialised: {e}")))
}
