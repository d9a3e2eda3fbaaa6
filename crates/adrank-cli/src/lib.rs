//! adrank command-line edge: logging setup, config resolution and JSON I/O.

use adrank_core::{PositionResult, RankConfig, RankRequest};
use anyhow::Context;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the config file when no argument is given.
pub const CONFIG_ENV: &str = "ADRANK_CONFIG";

/// Install the global subscriber. Logs go to stderr so stdout stays pure JSON.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,adrank=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Config path from the first argument, else from `env_value`.
pub fn config_path<I>(args: I, env_value: Option<String>) -> Option<PathBuf>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .next()
        .or(env_value)
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
}

/// Load the run configuration from `path` and the process environment.
pub fn load_config(path: Option<&Path>) -> RankConfig {
    resolve_config(path, |key| std::env::var(key).ok())
}

/// Load configuration, falling back to defaults when the file is missing,
/// malformed or invalid.
pub fn resolve_config<F>(path: Option<&Path>, lookup: F) -> RankConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match RankConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config, using defaults: {}", e);
            RankConfig::default()
        }
    };
    config.apply_env_overrides(lookup);

    if let Err(e) = config.validate() {
        warn!("Invalid configuration, using defaults: {}", e);
        return RankConfig::default();
    }

    config
}

/// Decode the request document.
pub fn read_request(reader: impl Read) -> anyhow::Result<RankRequest> {
    RankRequest::from_reader(reader).context("failed to parse request from stdin")
}

/// Pretty-printed JSON array of results.
pub fn render_results(results: &[PositionResult]) -> anyhow::Result<String> {
    serde_json::to_string_pretty(results).context("failed to encode results")
}
