use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Env var checked first for a log filter; `RUST_LOG` is the fallback.
const LOG_ENV: &str = "METEOR_LOG";

pub fn init_logging(verbose: bool, no_color: bool) {
    let filter = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(|_| default_filter(verbose), |value| parse_filter(&value));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_target(false)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

fn parse_filter(value: &str) -> EnvFilter {
    EnvFilter::try_new(value).unwrap_or_else(|err| {
        eprintln!("Ignoring invalid log filter '{}': {}", value, err);
        EnvFilter::new("info")
    })
}
