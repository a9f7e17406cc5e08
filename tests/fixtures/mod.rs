#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prometheus::Registry;
use pulumi_exporter::api::*;
use pulumi_exporter::error::ApiError;
use pulumi_exporter::{Collector, CollectorSettings};
use reqwest::StatusCode;

pub fn init_tracing() {
    lazy_static::initialize(&pulumi_exporter::tracing::TEST_TRACING);
}

pub fn settings_for(organizations: &[&str], max_concurrency: usize) -> CollectorSettings {
    CollectorSettings {
        organizations: organizations.iter().map(|o| o.to_string()).collect(),
        interval: Duration::from_secs(60),
        max_concurrency,
    }
}

pub fn make_collector(api: &Arc<MockApi>, settings: CollectorSettings) -> Collector {
    make_collector_with_registry(api, settings).0
}

/// Collector plus the registry its instruments are registered on, for reading back exactly which
/// series were written.
pub fn make_collector_with_registry(api: &Arc<MockApi>, settings: CollectorSettings) -> (Collector, Registry) {
    let api: Arc<dyn PulumiApi> = api.clone();
    let registry = Registry::new();
    let collector = Collector::new(api, settings, &registry).expect("failed to create collector");
    (collector, registry)
}

/// The gathered value of the series of `name` with exactly `labels`, or `None` if that series
/// was never written (or has been removed).
pub fn gathered_value(registry: &Registry, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    registry
        .gather()
        .iter()
        .filter(|family| family.get_name() == name)
        .flat_map(|family| family.get_metric().iter())
        .find(|metric| {
            let pairs = metric.get_label();
            pairs.len() == labels.len()
                && labels
                    .iter()
                    .all(|(n, v)| pairs.iter().any(|p| p.get_name() == *n && p.get_value() == *v))
        })
        .map(|metric| {
            if metric.has_counter() {
                metric.get_counter().get_value()
            } else {
                metric.get_gauge().get_value()
            }
        })
}

/// Number of series currently exported under `name`.
pub fn nr_gathered_series(registry: &Registry, name: &str) -> usize {
    registry
        .gather()
        .iter()
        .filter(|family| family.get_name() == name)
        .map(|family| family.get_metric().len())
        .sum()
}

pub fn stack(org: &str, project: &str, name: &str) -> StackSummary {
    StackSummary {
        org_name: org.to_string(),
        project_name: project.to_string(),
        stack_name: name.to_string(),
        last_update: 0,
        resource_count: 0,
    }
}

pub fn update(version: i64, kind: &str, result: &str, start_time: i64, end_time: i64) -> UpdateInfo {
    UpdateInfo {
        kind: kind.to_string(),
        result: result.to_string(),
        start_time,
        end_time,
        resource_changes: HashMap::new(),
        version,
    }
}

/// How per-stack API calls behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackCalls {
    Immediate,
    Delayed(Duration),
    /// Never complete.
    Blocked,
}

impl Default for StackCalls {
    fn default() -> Self {
        Self::Immediate
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrgData {
    pub members: usize,
    pub teams: usize,
    pub environments: usize,
    pub policy_groups: usize,
    pub policy_packs: usize,
    pub violations: Vec<PolicyViolation>,
    pub neo_tasks: Vec<NeoTask>,
    pub deployments: Vec<DeploymentInfo>,
    pub metadata: PolicyResultsMetadata,
}

/// Scriptable in-memory `PulumiApi` that records which operations were called and how many
/// per-stack calls were in flight at once.
#[derive(Debug, Default)]
pub struct MockApi {
    pub stacks: Mutex<Vec<StackSummary>>,
    pub resource_counts: Mutex<HashMap<StackKey, i64>>,
    pub updates: Mutex<HashMap<StackKey, Vec<UpdateInfo>>>,
    pub orgs: Mutex<HashMap<String, OrgData>>,
    pub failing: Mutex<HashSet<&'static str>>,
    pub stack_calls: Mutex<StackCalls>,
    pub calls: Mutex<Vec<(&'static str, String)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockApi {
    pub fn with_stacks(stacks: Vec<StackSummary>) -> Self {
        let api = Self::default();
        *api.stacks.lock().unwrap() = stacks;
        api
    }

    pub fn set_updates(&self, stack: &StackKey, updates: Vec<UpdateInfo>) {
        self.updates.lock().unwrap().insert(stack.clone(), updates);
    }

    pub fn set_resource_count(&self, stack: &StackKey, count: i64) {
        self.resource_counts.lock().unwrap().insert(stack.clone(), count);
    }

    pub fn set_org(&self, org: &str, data: OrgData) {
        self.orgs.lock().unwrap().insert(org.to_string(), data);
    }

    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn set_stack_calls(&self, behavior: StackCalls) {
        *self.stack_calls.lock().unwrap() = behavior;
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn nr_calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(op, _)| *op == operation).count()
    }

    /// Operations in the order they were called.
    pub fn call_sequence(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|(op, _)| *op).collect()
    }

    /// Targets (stack or organization) the operation was called for.
    pub fn call_targets(&self, operation: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, target)| target.clone())
            .collect()
    }

    fn record(&self, operation: &'static str, target: impl ToString) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push((operation, target.to_string()));
        if self.failing.lock().unwrap().contains(operation) {
            Err(ApiError::UnexpectedStatus { operation, status: StatusCode::SERVICE_UNAVAILABLE })
        } else {
            Ok(())
        }
    }

    async fn stack_call(&self) {
        let _in_flight = InFlight::enter(self);
        let behavior = *self.stack_calls.lock().unwrap();
        match behavior {
            StackCalls::Immediate => tokio::task::yield_now().await,
            StackCalls::Delayed(delay) => tokio::time::sleep(delay).await,
            StackCalls::Blocked => futures::future::pending::<()>().await,
        }
    }

    fn org(&self, org: &str) -> OrgData {
        self.orgs.lock().unwrap().get(org).cloned().unwrap_or_default()
    }
}

struct InFlight<'a>(&'a MockApi);

impl<'a> InFlight<'a> {
    fn enter(api: &'a MockApi) -> Self {
        let now = api.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        api.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(api)
    }
}

impl<'a> Drop for InFlight<'a> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PulumiApi for MockApi {
    async fn list_stacks(&self) -> Result<Vec<StackSummary>, ApiError> {
        self.record("list_stacks", "")?;
        Ok(self.stacks.lock().unwrap().clone())
    }

    async fn get_resource_count(&self, stack: &StackKey) -> Result<ResourceCount, ApiError> {
        self.stack_call().await;
        self.record("get_resource_count", stack)?;
        let count = self.resource_counts.lock().unwrap().get(stack).copied().unwrap_or_default();
        Ok(ResourceCount { count, version: 0 })
    }

    async fn list_updates(&self, stack: &StackKey, page: u32, page_size: u32) -> Result<Vec<UpdateInfo>, ApiError> {
        assert_eq!((page, page_size), (1, UPDATES_PAGE_SIZE));
        self.stack_call().await;
        self.record("list_updates", stack)?;
        Ok(self.updates.lock().unwrap().get(stack).cloned().unwrap_or_default())
    }

    async fn list_org_deployments(&self, org: &str) -> Result<Vec<DeploymentInfo>, ApiError> {
        self.record("list_org_deployments", org)?;
        Ok(self.org(org).deployments)
    }

    async fn list_members(&self, org: &str) -> Result<Vec<MemberInfo>, ApiError> {
        self.record("list_members", org)?;
        Ok(vec![MemberInfo::default(); self.org(org).members])
    }

    async fn list_teams(&self, org: &str) -> Result<Vec<TeamInfo>, ApiError> {
        self.record("list_teams", org)?;
        Ok(vec![TeamInfo::default(); self.org(org).teams])
    }

    async fn list_environments(&self, org: &str) -> Result<Vec<EnvironmentInfo>, ApiError> {
        self.record("list_environments", org)?;
        Ok(vec![EnvironmentInfo::default(); self.org(org).environments])
    }

    async fn list_policy_groups(&self, org: &str) -> Result<Vec<PolicyGroupInfo>, ApiError> {
        self.record("list_policy_groups", org)?;
        Ok(vec![PolicyGroupInfo::default(); self.org(org).policy_groups])
    }

    async fn list_policy_packs(&self, org: &str) -> Result<Vec<PolicyPackInfo>, ApiError> {
        self.record("list_policy_packs", org)?;
        Ok(vec![PolicyPackInfo::default(); self.org(org).policy_packs])
    }

    async fn list_policy_violations(&self, org: &str) -> Result<Vec<PolicyViolation>, ApiError> {
        self.record("list_policy_violations", org)?;
        Ok(self.org(org).violations)
    }

    async fn list_neo_tasks(&self, org: &str) -> Result<Vec<NeoTask>, ApiError> {
        self.record("list_neo_tasks", org)?;
        Ok(self.org(org).neo_tasks)
    }

    async fn get_policy_results_metadata(&self, org: &str) -> Result<PolicyResultsMetadata, ApiError> {
        self.record("get_policy_results_metadata", org)?;
        Ok(self.org(org).metadata)
    }
}

pub const ORG_OPERATIONS: [&str; 9] = [
    "list_members",
    "list_teams",
    "list_environments",
    "list_policy_groups",
    "list_policy_packs",
    "list_policy_violations",
    "list_neo_tasks",
    "list_org_deployments",
    "get_policy_results_metadata",
];
