//! Proxy-bound lane worker.
//!
//! A lane owns one browsing context and walks its cities strictly in order,
//! emitting exactly one [`PositionResult`] per city whatever happens.

use crate::distributor::ProxyLane;
use crate::error::ScanError;
use crate::scrape::{CityAttempt, ScrapeJob};
use adrank_browser::{BrowsingContext, ProxyConfig, Renderer, STEALTH_INIT_SCRIPT};
use adrank_core::{City, PositionResult};
use rand::rngs::StdRng;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// A best-effort step that failed without failing the city.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaneWarning {
    #[error("proxy '{proxy}' rejected, using a direct connection: {reason}")]
    ProxyRejected { proxy: String, reason: String },

    #[error("init script not installed: {reason}")]
    InitScript { reason: String },

    #[error("identity override failed for {city}: {reason}")]
    Identity { city: String, reason: String },

    #[error("scroll step {step} failed for {city}: {reason}")]
    Scroll {
        city: String,
        step: u32,
        reason: String,
    },

    #[error("browser context not released: {reason}")]
    ContextClose { reason: String },
}

/// A result emitted by lane `lane`.
#[derive(Debug, Clone)]
pub struct LaneMessage {
    pub lane: usize,
    pub result: PositionResult,
}

/// What a lane did, returned when it finishes.
#[derive(Debug, Clone, Default)]
pub struct LaneReport {
    pub index: usize,
    /// Proxy as configured, even if it was rejected
    pub proxy: String,
    /// Number of results emitted
    pub processed: usize,
    pub warnings: Vec<LaneWarning>,
}

pub struct LaneWorker {
    index: usize,
    lane: ProxyLane,
    renderer: Arc<dyn Renderer>,
    job: Arc<ScrapeJob>,
    rng: StdRng,
    cancel: CancellationToken,
}

impl LaneWorker {
    #[must_use]
    pub fn new(
        index: usize,
        lane: ProxyLane,
        renderer: Arc<dyn Renderer>,
        job: Arc<ScrapeJob>,
        rng: StdRng,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            index,
            lane,
            renderer,
            job,
            rng,
            cancel,
        }
    }

    /// Process every assigned city, sending each result on `tx`.
    pub async fn run(self, tx: mpsc::Sender<LaneMessage>) -> LaneReport {
        let span = tracing::info_span!(
            "lane",
            index = self.index,
            proxy = %self.lane.proxy,
            cities = self.lane.cities.len()
        );
        self.process(tx).instrument(span).await
    }

    async fn process(mut self, tx: mpsc::Sender<LaneMessage>) -> LaneReport {
        let mut report = LaneReport {
            index: self.index,
            proxy: self.lane.proxy.clone(),
            ..LaneReport::default()
        };

        let cities = std::mem::take(&mut self.lane.cities);
        if cities.is_empty() {
            tracing::debug!("No cities assigned");
            return report;
        }

        let (proxy, label) = self.resolve_proxy(&mut report);

        if self.cancel.is_cancelled() {
            self.emit_cancelled(&tx, &cities, &label, &mut report).await;
            return report;
        }

        let mut context = match self.renderer.create_context(proxy.as_ref()).await {
            Ok(context) => context,
            Err(e) => {
                let error = ScanError::ContextCreation(e).to_string();
                tracing::error!("{}", error);
                for city in &cities {
                    let result = PositionResult::failed(&city.name, error.clone()).with_proxy(&label);
                    self.emit(&tx, result, &mut report).await;
                }
                return report;
            }
        };

        if let Err(e) = context.add_init_script(STEALTH_INIT_SCRIPT).await {
            tracing::warn!("Failed to install init script: {}", e);
            report.warnings.push(LaneWarning::InitScript {
                reason: e.to_string(),
            });
        }

        self.process_cities(&tx, &*context, &cities, &label, &mut report)
            .await;

        if let Err(e) = context.close().await {
            tracing::warn!("Failed to close browser context: {}", e);
            report.warnings.push(LaneWarning::ContextClose {
                reason: e.to_string(),
            });
        }

        tracing::info!(processed = report.processed, "Lane finished");
        report
    }

    async fn process_cities(
        &mut self,
        tx: &mpsc::Sender<LaneMessage>,
        context: &dyn BrowsingContext,
        cities: &[City],
        label: &str,
        report: &mut LaneReport,
    ) {
        for (position, city) in cities.iter().enumerate() {
            let delay = self.job.delay.sample(&mut self.rng);
            tracing::debug!(city = %city, ?delay, "Waiting before city");

            let cancelled = tokio::select! {
                () = tokio::time::sleep(delay) => false,
                () = self.cancel.cancelled() => true,
            };
            if cancelled {
                tracing::info!(remaining = cities.len() - position, "Run cancelled");
                self.emit_cancelled(tx, &cities[position..], label, report)
                    .await;
                return;
            }

            let outcome = {
                let mut attempt = CityAttempt {
                    job: &self.job,
                    context,
                    city,
                    rng: &mut self.rng,
                    warnings: &mut report.warnings,
                };
                self.job
                    .retry
                    .run(city, &self.cancel, &mut attempt)
                    .instrument(tracing::info_span!("city", name = %city))
                    .await
            };

            if outcome.is_success() {
                tracing::info!(city = %city, "Ranked");
            } else {
                tracing::warn!(city = %city, error = ?outcome.error, blocked = outcome.blocked, "City failed");
            }

            let result = outcome.into_result(&city.name).with_proxy(label);
            self.emit(tx, result, report).await;
        }
    }

    /// Parse the lane's proxy; a rejected proxy falls back to a direct connection.
    fn resolve_proxy(&self, report: &mut LaneReport) -> (Option<ProxyConfig>, String) {
        if self.lane.proxy.is_empty() {
            return (None, String::new());
        }

        match ProxyConfig::parse(&self.lane.proxy) {
            Ok(proxy) => (Some(proxy), self.lane.proxy.clone()),
            Err(e) => {
                tracing::warn!("Invalid proxy, continuing without one: {}", e);
                report.warnings.push(LaneWarning::ProxyRejected {
                    proxy: self.lane.proxy.clone(),
                    reason: e.to_string(),
                });
                (None, String::new())
            }
        }
    }

    async fn emit_cancelled(
        &self,
        tx: &mpsc::Sender<LaneMessage>,
        cities: &[City],
        label: &str,
        report: &mut LaneReport,
    ) {
        let error = ScanError::Cancelled.to_string();
        for city in cities {
            let result = PositionResult::failed(&city.name, error.clone()).with_proxy(label);
            self.emit(tx, result, report).await;
        }
    }

    async fn emit(
        &self,
        tx: &mpsc::Sender<LaneMessage>,
        result: PositionResult,
        report: &mut LaneReport,
    ) {
        let message = LaneMessage {
            lane: self.index,
            result,
        };
        if tx.send(message).await.is_err() {
            tracing::debug!("Result receiver dropped");
        }
        report.processed += 1;
    }
}
