//! Constant-arrival-rate executor
//!
//! Starts one iteration every `time_unit / rate` for `duration`, each on a
//! free virtual user. When all `max_vus` are busy the iteration is dropped.
//! After `duration`, in-flight iterations get `graceful_stop` to finish and
//! are aborted after that.

use std::sync::Arc;
use std::time::{Duration, Instant};

use facturas_common::{ApiClient, ApiRequest};
use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::checks::{Check, Observation};
use crate::error::Result;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::scenario::LoadScenario;

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub snapshot: MetricsSnapshot,
    pub elapsed: Duration,
}

pub struct Executor {
    scenario: Arc<LoadScenario>,
    client: ApiClient,
    metrics: Arc<Metrics>,
}

/// Everything one iteration needs, cloned per spawn
#[derive(Clone)]
struct IterationContext {
    client: ApiClient,
    request: Arc<ApiRequest>,
    checks: Arc<[Check]>,
    metrics: Arc<Metrics>,
    think_time: Duration,
}

impl Executor {
    pub fn new(scenario: LoadScenario) -> Result<Self> {
        scenario.validate()?;
        let client = ApiClient::new(
            scenario.base_url.clone(),
            scenario.token.clone(),
            scenario.request_timeout,
        );
        let metrics = Arc::new(Metrics::new(&scenario.checks));
        Ok(Self {
            scenario: Arc::new(scenario),
            client,
            metrics,
        })
    }

    pub fn scenario(&self) -> &LoadScenario {
        &self.scenario
    }

    /// Shared aggregator, readable while the run is in progress
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub async fn run(&self) -> RunOutcome {
        let scenario = &self.scenario;
        let interval = scenario.iteration_interval();
        info!(
            url = %scenario.target_url(),
            rate = scenario.rate,
            time_unit_ms = scenario.time_unit.as_millis() as u64,
            duration_secs = scenario.duration.as_secs_f64(),
            pre_allocated_vus = scenario.pre_allocated_vus,
            max_vus = scenario.max_vus,
            "Starting constant-arrival-rate scenario"
        );

        let context = IterationContext {
            client: self.client.clone(),
            request: Arc::new(ApiRequest::get(scenario.endpoint.clone()).with_json_content_type()),
            checks: scenario.checks.clone().into(),
            metrics: self.metrics.clone(),
            think_time: scenario.think_time,
        };

        let vus = Arc::new(Semaphore::new(scenario.max_vus));
        let mut iterations = JoinSet::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        let started = Instant::now();
        let stop = tokio::time::sleep(scenario.duration);
        tokio::pin!(stop);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = ticker.tick() => {}
            }

            reap_finished(&mut iterations);

            match vus.clone().try_acquire_owned() {
                Ok(permit) => {
                    let active = (scenario.max_vus - vus.available_permits()) as u64;
                    if active as usize > scenario.pre_allocated_vus {
                        debug!(active, "Running beyond pre-allocated VUs");
                    }
                    self.metrics.observe_vus(active);
                    iterations.spawn(iteration(context.clone(), permit));
                }
                Err(_) => {
                    debug!("No free VU, dropping iteration");
                    self.metrics.record_dropped();
                }
            }
        }

        info!(
            in_flight = iterations.len(),
            graceful_stop_secs = scenario.graceful_stop.as_secs_f64(),
            "Duration reached, waiting for in-flight iterations"
        );
        let drained = tokio::time::timeout(scenario.graceful_stop, async {
            while let Some(joined) = iterations.join_next().await {
                log_join_error(joined);
            }
        })
        .await;

        if drained.is_err() {
            let interrupted = iterations.len() as u64;
            warn!(interrupted, "Graceful stop expired, aborting iterations");
            self.metrics.record_interrupted(interrupted);
            iterations.shutdown().await;
        }

        let outcome = RunOutcome {
            snapshot: self.metrics.snapshot(),
            elapsed: started.elapsed(),
        };
        info!(
            requests = outcome.snapshot.requests,
            failed = outcome.snapshot.failed_requests,
            dropped = outcome.snapshot.dropped_iterations,
            elapsed_secs = outcome.elapsed.as_secs_f64(),
            "Scenario finished"
        );
        outcome
    }
}

fn reap_finished(iterations: &mut JoinSet<()>) {
    while let Some(Some(joined)) = iterations.join_next().now_or_never() {
        log_join_error(joined);
    }
}

fn log_join_error(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            warn!("Iteration panicked: {}", e);
        }
    }
}

/// One stateless iteration; the VU is held until the think time is over
async fn iteration(ctx: IterationContext, _vu: OwnedSemaphorePermit) {
    let started = Instant::now();
    let observation = match ctx.client.send(&ctx.request).await {
        Ok(exchange) => Observation {
            status: Some(exchange.status),
            elapsed: exchange.elapsed,
            body: Some(exchange.text),
        },
        Err(e) => {
            debug!("Request failed: {}", e);
            Observation {
                status: None,
                elapsed: started.elapsed(),
                body: None,
            }
        }
    };

    ctx.metrics.record_request(&observation, &ctx.checks);
    tokio::time::sleep(ctx.think_time).await;
    ctx.metrics.record_iteration();
}
