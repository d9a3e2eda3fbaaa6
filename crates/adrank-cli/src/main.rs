use adrank_browser::{BrowserEngine, LaunchOptions};
use adrank_cli::{config_path, init_tracing, load_config, read_request, render_results, CONFIG_ENV};
use adrank_scanner::RankOrchestrator;
use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting adrank v{}", env!("CARGO_PKG_VERSION"));

    let path = config_path(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok());
    let config = load_config(path.as_deref());
    let request = read_request(std::io::stdin().lock())?;

    let engine = Arc::new(
        BrowserEngine::launch(LaunchOptions {
            headless: config.headless,
            ..LaunchOptions::default()
        })
        .await
        .context("failed to launch browser")?,
    );

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling run");
                cancel.cancel();
            }
        })
    };

    let orchestrator = RankOrchestrator::new(engine.clone(), config);
    let outcome = orchestrator.run_with_cancel(&request, cancel).await;
    interrupt.abort();
    drop(orchestrator);

    match Arc::try_unwrap(engine) {
        Ok(engine) => engine.shutdown().await,
        Err(_) => warn!("Browser engine still in use at exit"),
    }

    let report = outcome.context("rank run failed")?;
    for warning in report.warnings() {
        warn!("{}", warning);
    }

    println!("{}", render_results(&report.results)?);
    Ok(())
}
