//! Logging setup using `tracing-subscriber`.
//!
//! Pipeline stages emit `tracing` events; the CLI installs a compact fmt
//! subscriber on stderr. `RUST_LOG` overrides the level chosen by `-v`.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Map `-v` repetitions to a level: none = warn, 1 = info, 2 = debug, 3+ = trace
pub fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Build an `EnvFilter` from the given level, respecting `RUST_LOG`.
pub fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Our crate at the requested level, dependencies stay quiet
        EnvFilter::new(format!(
            "warn,varflow={}",
            level.as_str().to_lowercase()
        ))
    })
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(verbosity: u8) {
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    // A second init (e.g. in tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(build_env_filter(level_from_verbosity(verbosity)))
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_from_verbosity(0), Level::WARN);
        assert_eq!(level_from_verbosity(1), Level::INFO);
        assert_eq!(level_from_verbosity(2), Level::DEBUG);
        assert_eq!(level_from_verbosity(9), Level::TRACE);
    }
}
