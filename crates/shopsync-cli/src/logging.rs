//! Log subscriber setup

use crate::commands::LogFormat;
use crate::config::Verbosity;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber on stderr.
///
/// `RUST_LOG` wins over the verbosity flags when set.
pub fn init(verbosity: Verbosity, format: LogFormat) {
    let level = verbosity.log_level().as_str().to_lowercase();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false);
    // a second init keeps the first subscriber
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
