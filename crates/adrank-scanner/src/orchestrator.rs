//! Rank orchestrator for coordinating lanes.
//!
//! This module provides the `RankOrchestrator` which distributes cities over
//! proxy lanes, runs the lanes concurrently and collects exactly one result
//! per requested city.

use crate::classifier::{detector_for, BlockDetector};
use crate::distributor::distribute;
use crate::error::{Result, ScanError};
use crate::lane::{LaneMessage, LaneReport, LaneWarning, LaneWorker};
use crate::scrape::ScrapeJob;
use adrank_browser::Renderer;
use adrank_core::{City, PositionResult, RankConfig, RankRequest};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Everything a finished run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One result per requested city, in arrival order
    pub results: Vec<PositionResult>,
    /// One report per lane, in lane order
    pub lanes: Vec<LaneReport>,
}

impl RunReport {
    /// Warnings from every lane.
    pub fn warnings(&self) -> impl Iterator<Item = &LaneWarning> {
        self.lanes.iter().flat_map(|lane| lane.warnings.iter())
    }

    /// Number of results that carry an error.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }
}

/// Orchestrates ranking runs across proxy lanes.
pub struct RankOrchestrator {
    /// Renderer lanes create their browsing contexts from
    renderer: Arc<dyn Renderer>,
    config: RankConfig,
    detector: Arc<dyn BlockDetector>,
}

impl RankOrchestrator {
    /// Create a new orchestrator using the configured block detection strategy.
    #[must_use]
    pub fn new(renderer: Arc<dyn Renderer>, config: RankConfig) -> Self {
        let detector = detector_for(config.block_detection);
        Self {
            renderer,
            config,
            detector,
        }
    }

    /// Replace the block detector.
    #[must_use]
    pub fn with_block_detector(mut self, detector: Arc<dyn BlockDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Rank the request's ads in every requested city.
    pub async fn run(&self, request: &RankRequest) -> Result<RunReport> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), stopping early when `cancel` fires.
    ///
    /// Cities not processed before cancellation still get a failed result.
    /// Only an invalid configuration fails the run itself.
    pub async fn run_with_cancel(
        &self,
        request: &RankRequest,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        self.config.validate()?;

        let cities = request.city_list();
        let lanes = distribute(&cities, &self.config.proxies);
        let job = Arc::new(ScrapeJob::new(&self.config, request, self.detector.clone()));

        tracing::info!(
            cities = cities.len(),
            lanes = lanes.len(),
            targets = request.ad_ids.len(),
            max_workers = self.config.max_workers,
            detector = self.detector.name(),
            "Starting rank run"
        );

        let deadline = self.config.run_timeout().map(|limit| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                tracing::warn!("Run deadline of {:?} reached, cancelling", limit);
                cancel.cancel();
            })
        });

        let (tx, mut rx) = mpsc::channel::<LaneMessage>(cities.len().max(1));
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));

        // Proxy and cities of every spawned lane, for filling in after a panic.
        let mut meta: Vec<(String, Vec<City>)> = Vec::with_capacity(lanes.len());
        let mut tasks: Vec<JoinHandle<LaneReport>> = Vec::with_capacity(lanes.len());
        for (index, lane) in lanes.into_iter().enumerate() {
            meta.push((lane.proxy.clone(), lane.cities.clone()));
            let worker = LaneWorker::new(
                index,
                lane,
                self.renderer.clone(),
                job.clone(),
                self.lane_rng(index),
                cancel.clone(),
            );
            let tx = tx.clone();
            let semaphore = semaphore.clone();

            tasks.push(tokio::spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                worker.run(tx).await
            }));
        }
        drop(tx);

        let watcher = tokio::spawn(join_all(tasks));

        let mut results = Vec::with_capacity(cities.len());
        let mut emitted = vec![0usize; meta.len()];
        while let Some(message) = rx.recv().await {
            if let Some(count) = emitted.get_mut(message.lane) {
                *count += 1;
            }
            results.push(message.result);
        }

        let joined = match watcher.await {
            Ok(joined) => joined,
            Err(e) => {
                tracing::error!("Lane watcher failed: {}", e);
                Vec::new()
            }
        };

        let mut reports = Vec::with_capacity(meta.len());
        for (index, (proxy, lane_cities)) in meta.into_iter().enumerate() {
            match joined.get(index) {
                Some(Ok(report)) => reports.push(report.clone()),
                other => {
                    let reason = match other {
                        Some(Err(e)) => e.to_string(),
                        _ => "lane result unavailable".to_string(),
                    };
                    tracing::error!(lane = index, proxy = %proxy, "Lane aborted: {}", reason);

                    let error = ScanError::LaneAborted(reason).to_string();
                    let missing = &lane_cities[emitted[index].min(lane_cities.len())..];
                    for city in missing {
                        results.push(
                            PositionResult::failed(&city.name, error.clone()).with_proxy(&proxy),
                        );
                    }
                    reports.push(LaneReport {
                        index,
                        proxy,
                        processed: emitted[index],
                        warnings: Vec::new(),
                    });
                }
            }
        }

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        let report = RunReport {
            results,
            lanes: reports,
        };
        tracing::info!(
            results = report.results.len(),
            failed = report.failed(),
            warnings = report.warnings().count(),
            "Rank run complete"
        );

        Ok(report)
    }

    /// Randomness for lane `index`; reproducible when a seed is configured.
    fn lane_rng(&self, index: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        }
    }
}
