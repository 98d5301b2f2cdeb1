// logs.rs
use tabconfig::Config;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Niveau par défaut lorsque la configuration est illisible
const FALLBACK_LEVEL: &str = "info";

fn string_to_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" | "WARNING" => "warn",
        "ERROR" => "error",
        "OFF" => "off",
        _ => FALLBACK_LEVEL,
    }
}

/// Initialise le subscriber `tracing` global.
///
/// `RUST_LOG` a priorité sur `host.logger.min_level`. La sortie console n'est
/// branchée que si `host.logger.enable_console` est vrai.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config
            .get_log_min_level()
            .map(|l| string_to_directive(&l))
            .unwrap_or(FALLBACK_LEVEL);
        EnvFilter::new(level)
    });

    let subscriber = Registry::default().with(filter);

    let enable_console = config.get_log_enable_console().unwrap_or(true);

    if enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    } else {
        subscriber.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directives() {
        assert_eq!(string_to_directive("INFO"), "info");
        assert_eq!(string_to_directive(" warning "), "warn");
        assert_eq!(string_to_directive("Debug"), "debug");
        assert_eq!(string_to_directive("bogus"), "info");
    }
}
