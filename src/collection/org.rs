use std::future::Future;

use itertools::Itertools;
use prometheus::IntGaugeVec;

use super::Collector;
use crate::error::ApiError;

const UNKNOWN: &str = "unknown";

impl Collector {
    /// Collects the organization-level metrics. The sub-collections run concurrently and each
    /// failure only suppresses its own metrics. Grouped gauges drop the series of groups that no
    /// longer appear in a successful fetch.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn collect_org_metrics(&self, org: &str) {
        let instruments = &self.instruments;
        tokio::join!(
            self.collect_count(org, "list_members", &instruments.org_member_count, self.api.list_members(org)),
            self.collect_count(org, "list_teams", &instruments.org_team_count, self.api.list_teams(org)),
            self.collect_count(
                org,
                "list_environments",
                &instruments.org_environment_count,
                self.api.list_environments(org)
            ),
            self.collect_count(
                org,
                "list_policy_groups",
                &instruments.org_policy_group_count,
                self.api.list_policy_groups(org)
            ),
            self.collect_count(
                org,
                "list_policy_packs",
                &instruments.org_policy_pack_count,
                self.api.list_policy_packs(org)
            ),
            self.collect_policy_violations(org),
            self.collect_neo_tasks(org),
            self.collect_deployments(org),
            self.collect_policy_results_metadata(org),
        );
    }

    async fn collect_count<T, F>(&self, org: &str, operation: &str, gauge: &IntGaugeVec, fetch: F)
    where
        F: Future<Output = Result<Vec<T>, ApiError>>,
    {
        match fetch.await {
            Ok(items) => gauge.with_label_values(&[org]).set(items.len() as i64),
            Err(err) => self.note_org_failure(operation, org, &err),
        }
    }

    async fn collect_policy_violations(&self, org: &str) {
        let violations = match self.api.list_policy_violations(org).await {
            Ok(violations) => violations,
            Err(err) => {
                self.note_org_failure("list_policy_violations", org, &err);
                return;
            },
        };

        let counts = violations
            .iter()
            .map(|v| (or_unknown(&v.level), or_unknown(&v.kind)))
            .counts();

        self.violation_series.publish(
            &self.instruments.org_policy_violations,
            org,
            counts.into_iter().map(|((level, kind), count)| (vec![level, kind], count)),
        );
    }

    async fn collect_neo_tasks(&self, org: &str) {
        match self.api.list_neo_tasks(org).await {
            Ok(tasks) => {
                let counts = tasks.iter().map(|t| t.status.as_str()).counts();
                self.neo_task_series.publish(
                    &self.instruments.org_neo_task_count,
                    org,
                    counts.into_iter().map(|(status, count)| (vec![status], count)),
                );
            },
            Err(err) => self.note_org_failure("list_neo_tasks", org, &err),
        }
    }

    async fn collect_deployments(&self, org: &str) {
        match self.api.list_org_deployments(org).await {
            Ok(deployments) => {
                let counts = deployments.iter().map(|d| d.status.as_str()).counts();
                self.deployment_series.publish(
                    &self.instruments.deployment_status,
                    org,
                    counts.into_iter().map(|(status, count)| (vec![status], count)),
                );
            },
            Err(err) => self.note_org_failure("list_org_deployments", org, &err),
        }
    }

    async fn collect_policy_results_metadata(&self, org: &str) {
        match self.api.get_policy_results_metadata(org).await {
            Ok(metadata) => {
                let labels = [org];
                self.instruments
                    .org_policy_total
                    .with_label_values(&labels)
                    .set(metadata.policy_total_count);
                self.instruments
                    .org_policy_with_issues
                    .with_label_values(&labels)
                    .set(metadata.policy_with_issues_count);
                self.instruments
                    .org_governed_resources_total
                    .with_label_values(&labels)
                    .set(metadata.resources_total_count);
                self.instruments
                    .org_governed_resources_with_issues
                    .with_label_values(&labels)
                    .set(metadata.resources_with_issues_count);
            },
            Err(err) => self.note_org_failure("get_policy_results_metadata", org, &err),
        }
    }

    fn note_org_failure(&self, operation: &str, org: &str, error: &ApiError) {
        self.note_failure(operation, error);
        tracing::error!(%org, %operation, error=?error, "organization sub-collection failed");
    }
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        UNKNOWN
    } else {
        value
    }
}
