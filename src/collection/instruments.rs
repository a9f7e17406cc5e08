use prometheus::{GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};

pub const LABEL_ORG: &str = "org";
pub const LABEL_PROJECT: &str = "project";
pub const LABEL_STACK: &str = "stack";
pub const LABEL_KIND: &str = "kind";
pub const LABEL_RESULT: &str = "result";
pub const LABEL_OPERATION: &str = "operation";
pub const LABEL_STATUS: &str = "status";
pub const LABEL_LEVEL: &str = "level";
pub const LABEL_ERROR_TYPE: &str = "error_type";

const STACK_LABELS: [&str; 3] = [LABEL_ORG, LABEL_PROJECT, LABEL_STACK];
const UPDATE_LABELS: [&str; 5] = [LABEL_ORG, LABEL_PROJECT, LABEL_STACK, LABEL_KIND, LABEL_RESULT];
const CHANGE_LABELS: [&str; 5] = [LABEL_ORG, LABEL_PROJECT, LABEL_STACK, LABEL_KIND, LABEL_OPERATION];
const ORG_LABELS: [&str; 1] = [LABEL_ORG];

/// Bucket boundaries, in seconds, for update durations.
pub const UPDATE_DURATION_BUCKETS: [f64; 8] = [5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0];

/// The fixed set of instruments written by the collector. Instruments are created and registered
/// once; any failure is fatal to startup.
#[derive(Debug, Clone)]
pub struct Instruments {
    pub stack_resource_count: IntGaugeVec,
    pub update_duration: HistogramVec,
    pub update_total: IntCounterVec,
    pub update_resource_changes: IntCounterVec,
    pub stack_last_update: GaugeVec,
    pub deployment_status: IntGaugeVec,

    pub org_member_count: IntGaugeVec,
    pub org_team_count: IntGaugeVec,
    pub org_environment_count: IntGaugeVec,
    pub org_policy_group_count: IntGaugeVec,
    pub org_policy_pack_count: IntGaugeVec,
    pub org_policy_violations: IntGaugeVec,
    pub org_neo_task_count: IntGaugeVec,
    pub org_policy_total: IntGaugeVec,
    pub org_policy_with_issues: IntGaugeVec,
    pub org_governed_resources_total: IntGaugeVec,
    pub org_governed_resources_with_issues: IntGaugeVec,

    pub collection_errors: IntCounterVec,
}

impl Instruments {
    #[tracing::instrument(level = "info", skip(registry))]
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let instruments = Self {
            stack_resource_count: int_gauge(
                "pulumi_stack_resource_count",
                "Number of resources in a Pulumi stack",
                &STACK_LABELS,
            )?,
            update_duration: HistogramVec::new(
                HistogramOpts::new(
                    "pulumi_update_duration_seconds",
                    "Duration of Pulumi stack updates in seconds",
                )
                .buckets(UPDATE_DURATION_BUCKETS.to_vec()),
                &UPDATE_LABELS,
            )?,
            update_total: IntCounterVec::new(
                Opts::new("pulumi_update_total", "Total number of Pulumi stack updates"),
                &UPDATE_LABELS,
            )?,
            update_resource_changes: IntCounterVec::new(
                Opts::new(
                    "pulumi_update_resource_changes",
                    "Number of resource changes per Pulumi update",
                ),
                &CHANGE_LABELS,
            )?,
            stack_last_update: GaugeVec::new(
                Opts::new(
                    "pulumi_stack_last_update_timestamp",
                    "Unix timestamp of the last update to a Pulumi stack",
                ),
                &STACK_LABELS,
            )?,
            deployment_status: int_gauge(
                "pulumi_deployment_status",
                "Number of Pulumi deployments by status",
                &[LABEL_ORG, LABEL_STATUS],
            )?,

            org_member_count: int_gauge(
                "pulumi_org_member_count",
                "Number of members in a Pulumi organization",
                &ORG_LABELS,
            )?,
            org_team_count: int_gauge(
                "pulumi_org_team_count",
                "Number of teams in a Pulumi organization",
                &ORG_LABELS,
            )?,
            org_environment_count: int_gauge(
                "pulumi_org_environment_count",
                "Number of ESC environments in a Pulumi organization",
                &ORG_LABELS,
            )?,
            org_policy_group_count: int_gauge(
                "pulumi_org_policy_group_count",
                "Number of policy groups in a Pulumi organization",
                &ORG_LABELS,
            )?,
            org_policy_pack_count: int_gauge(
                "pulumi_org_policy_pack_count",
                "Number of policy packs in a Pulumi organization",
                &ORG_LABELS,
            )?,
            org_policy_violations: int_gauge(
                "pulumi_org_policy_violations",
                "Number of policy violations by level and kind",
                &[LABEL_ORG, LABEL_LEVEL, LABEL_KIND],
            )?,
            org_neo_task_count: int_gauge(
                "pulumi_org_neo_task_count",
                "Number of Pulumi Neo AI tasks by status",
                &[LABEL_ORG, LABEL_STATUS],
            )?,
            org_policy_total: int_gauge(
                "pulumi_org_policy_total",
                "Total number of policies in a Pulumi organization",
                &ORG_LABELS,
            )?,
            org_policy_with_issues: int_gauge(
                "pulumi_org_policy_with_issues",
                "Number of policies with issues in a Pulumi organization",
                &ORG_LABELS,
            )?,
            org_governed_resources_total: int_gauge(
                "pulumi_org_governed_resources_total",
                "Total number of resources governed by policies in a Pulumi organization",
                &ORG_LABELS,
            )?,
            org_governed_resources_with_issues: int_gauge(
                "pulumi_org_governed_resources_with_issues",
                "Number of governed resources with issues in a Pulumi organization",
                &ORG_LABELS,
            )?,

            collection_errors: IntCounterVec::new(
                Opts::new(
                    "pulumi_exporter_collection_errors",
                    "Number of failed Pulumi Cloud API calls during collection",
                ),
                &[LABEL_OPERATION, LABEL_ERROR_TYPE],
            )?,
        };

        instruments.register(registry)?;
        Ok(instruments)
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.stack_resource_count.clone()))?;
        registry.register(Box::new(self.update_duration.clone()))?;
        registry.register(Box::new(self.update_total.clone()))?;
        registry.register(Box::new(self.update_resource_changes.clone()))?;
        registry.register(Box::new(self.stack_last_update.clone()))?;
        registry.register(Box::new(self.deployment_status.clone()))?;
        registry.register(Box::new(self.org_member_count.clone()))?;
        registry.register(Box::new(self.org_team_count.clone()))?;
        registry.register(Box::new(self.org_environment_count.clone()))?;
        registry.register(Box::new(self.org_policy_group_count.clone()))?;
        registry.register(Box::new(self.org_policy_pack_count.clone()))?;
        registry.register(Box::new(self.org_policy_violations.clone()))?;
        registry.register(Box::new(self.org_neo_task_count.clone()))?;
        registry.register(Box::new(self.org_policy_total.clone()))?;
        registry.register(Box::new(self.org_policy_with_issues.clone()))?;
        registry.register(Box::new(self.org_governed_resources_total.clone()))?;
        registry.register(Box::new(self.org_governed_resources_with_issues.clone()))?;
        registry.register(Box::new(self.collection_errors.clone()))?;
        Ok(())
    }
}

fn int_gauge(name: &str, help: &str, labels: &[&str]) -> Result<IntGaugeVec, prometheus::Error> {
    IntGaugeVec::new(Opts::new(name, help), labels)
}
