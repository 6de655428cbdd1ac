use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracker_api::client::Api;
use tracker_api::config::Config;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry, EnvFilter};

/// Builds a tracker client from `.env`/environment configuration
/// (`TRACKER_BASE_URL`, `TRACKER_CREDENTIALS`).
pub fn init_from_env() -> Result<Api> {
    let _ = dotenv();

    let config = Config::from_env().context("invalid TRACKER_BASE_URL")?;
    let api = Api::new(config).context("could not build tracker client")?;
    Ok(api)
}

pub fn init_tracing() {
    registry()
        .with(fmt::layer().event_format(format().pretty()))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()
                .unwrap(),
        )
        .init();
}
