use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use worktrack::cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    execute(cli).await
}

/// `RUST_LOG` wins when set; otherwise `level` applies everywhere.
fn log_filter(level: tracing::Level, rust_log: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(rust_log.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_the_default_level() {
        let filter = log_filter(tracing::Level::WARN, Some("debug"));
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn default_level_applies_without_rust_log() {
        assert_eq!(log_filter(tracing::Level::WARN, None).to_string(), "warn");
        assert_eq!(log_filter(tracing::Level::DEBUG, Some("")).to_string(), "debug");
    }
}
