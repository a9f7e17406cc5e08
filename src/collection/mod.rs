//! The collection engine: periodic passes that fan out over the monitored stacks with bounded
//! concurrency and then collect organization-level metrics.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use itertools::Itertools;
use prometheus::Registry;
use tokio::sync::{watch, Semaphore};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

mod instruments;
mod org;
mod series;
mod stack;
mod versions;

pub use instruments::*;
pub use series::WrittenSeries;
pub use versions::LastSeenVersions;

use crate::api::{PulumiApi, StackSummary};
use crate::error::{ApiError, ExporterError, MetricLabel};
use crate::settings::PulumiSettings;
use crate::ExporterResult;

/// The part of the configuration the engine consumes. Values are expected to be validated
/// already: at least one organization, a positive interval and a concurrency bound in [1, 100].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorSettings {
    pub organizations: Vec<String>,
    pub interval: Duration,
    pub max_concurrency: usize,
}

impl From<&PulumiSettings> for CollectorSettings {
    fn from(settings: &PulumiSettings) -> Self {
        Self {
            organizations: settings.organizations.iter().unique().cloned().collect(),
            interval: settings.collect_interval,
            max_concurrency: settings.max_concurrency,
        }
    }
}

pub struct Collector {
    api: Arc<dyn PulumiApi>,
    settings: CollectorSettings,
    instruments: Instruments,
    last_seen: LastSeenVersions,
    violation_series: WrittenSeries,
    neo_task_series: WrittenSeries,
    deployment_series: WrittenSeries,
    tx_passes: watch::Sender<u64>,
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("settings", &self.settings)
            .field("nr_seen_stacks", &self.last_seen.len())
            .field("passes", &*self.tx_passes.borrow())
            .finish()
    }
}

impl Collector {
    /// Creates the engine and registers its instruments. Instrument declaration is the only way
    /// construction can fail.
    pub fn new(api: Arc<dyn PulumiApi>, settings: CollectorSettings, registry: &Registry) -> ExporterResult<Self> {
        let instruments = Instruments::new(registry)?;
        let (tx_passes, _) = watch::channel(0);

        Ok(Self {
            api,
            settings,
            instruments,
            last_seen: LastSeenVersions::new(),
            violation_series: WrittenSeries::new(),
            neo_task_series: WrittenSeries::new(),
            deployment_series: WrittenSeries::new(),
            tx_passes,
        })
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn instruments(&self) -> &Instruments {
        &self.instruments
    }

    pub fn last_seen(&self) -> &LastSeenVersions {
        &self.last_seen
    }

    /// Watches the number of completed collection passes.
    pub fn passes(&self) -> watch::Receiver<u64> {
        self.tx_passes.subscribe()
    }

    /// Runs a pass immediately and then on every interval tick until `shutdown` is cancelled. A
    /// pass that overruns the interval delays the next tick; passes never overlap. Cancellation
    /// drops the in-flight pass and returns [`ExporterError::Cancelled`].
    #[tracing::instrument(level = "info", skip(self, shutdown))]
    pub async fn run(&self, shutdown: CancellationToken) -> ExporterResult<()> {
        tracing::info!(
            interval=?self.settings.interval, max_concurrency=%self.settings.max_concurrency,
            organizations=?self.settings.organizations, "starting metrics collection"
        );

        let mut ticks = tokio::time::interval(self.settings.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = ticks.tick() => {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => {
                            tracing::info!("collection pass interrupted by shutdown");
                            break;
                        },
                        _ = self.collect_once() => {},
                    }
                },
            }
        }

        tracing::info!("metrics collection stopped");
        Err(ExporterError::Cancelled)
    }

    /// Runs a single collection pass: every monitored stack with at most `max_concurrency`
    /// collections in flight, then every configured organization.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn collect_once(&self) {
        let stacks = match self.api.list_stacks().await {
            Ok(stacks) => stacks,
            Err(err) => {
                self.note_failure("list_stacks", &err);
                tracing::error!(error=?err, "failed to list stacks; skipping collection pass");
                return;
            },
        };

        let organizations: HashSet<&str> = self.settings.organizations.iter().map(String::as_str).collect();
        let nr_visible = stacks.len();
        let monitored: Vec<StackSummary> = stacks
            .into_iter()
            .filter(|s| organizations.contains(s.org_name.as_str()))
            .collect();
        tracing::info!(
            nr_stacks=%monitored.len(), %nr_visible, nr_organizations=%organizations.len(),
            "starting collection pass"
        );

        let slots = Semaphore::new(self.settings.max_concurrency);
        let stack_collections = monitored.iter().map(|stack| {
            let slots = &slots;
            async move {
                let Ok(_permit) = slots.acquire().await else {
                    return;
                };
                self.collect_stack(stack).await;
            }
        });
        futures::future::join_all(stack_collections).await;

        let org_collections = self.settings.organizations.iter().map(|org| self.collect_org_metrics(org));
        futures::future::join_all(org_collections).await;

        self.tx_passes.send_modify(|passes| *passes += 1);
        tracing::info!(
            nr_stacks=%monitored.len(), nr_organizations=%organizations.len(),
            "collection pass complete"
        );
    }

    fn note_failure(&self, operation: &str, error: &ApiError) {
        self.instruments
            .collection_errors
            .with_label_values(&[operation, error.label().as_str()])
            .inc();
    }
}
