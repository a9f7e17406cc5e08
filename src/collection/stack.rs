use super::Collector;
use crate::api::{StackKey, StackSummary, UpdateInfo, UPDATES_PAGE_SIZE};
use crate::error::ApiError;

impl Collector {
    /// Collects the resource count and the not yet counted updates of one stack. Each API call is
    /// best-effort: a failure is logged and only suppresses the metrics that call feeds.
    #[tracing::instrument(
        level = "debug",
        skip(self, stack),
        fields(org=%stack.org_name, project=%stack.project_name, stack=%stack.stack_name)
    )]
    pub async fn collect_stack(&self, stack: &StackSummary) {
        let key = stack.key();
        let stack_labels = [key.org.as_str(), key.project.as_str(), key.stack.as_str()];

        match self.api.get_resource_count(&key).await {
            Ok(resources) => {
                self.instruments
                    .stack_resource_count
                    .with_label_values(&stack_labels)
                    .set(resources.count);
            },
            Err(err) => self.note_stack_failure("get_resource_count", &key, &err),
        }

        let updates = match self.api.list_updates(&key, 1, UPDATES_PAGE_SIZE).await {
            Ok(updates) => updates,
            Err(err) => {
                self.note_stack_failure("list_updates", &key, &err);
                Vec::new()
            },
        };

        let last_seen = self.last_seen.get(&key);
        let mut latest_end_time = 0;
        let mut nr_processed = 0;
        for update in updates.iter().filter(|u| last_seen < u.version) {
            self.record_update(&key, update);
            latest_end_time = latest_end_time.max(update.end_time);
            self.last_seen.advance(&key, update.version);
            nr_processed += 1;
        }
        tracing::debug!(%last_seen, nr_fetched=%updates.len(), %nr_processed, "processed stack updates");

        let last_update = if 0 < latest_end_time {
            Some(latest_end_time)
        } else if 0 < stack.last_update {
            Some(stack.last_update)
        } else {
            None
        };

        if let Some(timestamp) = last_update {
            self.instruments
                .stack_last_update
                .with_label_values(&stack_labels)
                .set(timestamp as f64);
        }
    }

    fn record_update(&self, key: &StackKey, update: &UpdateInfo) {
        tracing::debug!(version=%update.version, kind=%update.kind, result=%update.result, "recording update");
        let update_labels = [
            key.org.as_str(),
            key.project.as_str(),
            key.stack.as_str(),
            update.kind.as_str(),
            update.result.as_str(),
        ];

        if 0 < update.start_time && 0 < update.end_time {
            let duration_secs = (update.end_time - update.start_time) as f64;
            self.instruments
                .update_duration
                .with_label_values(&update_labels)
                .observe(duration_secs);
        }

        self.instruments.update_total.with_label_values(&update_labels).inc();

        for (operation, count) in update.resource_changes.iter() {
            // counters cannot decrease
            let Ok(count) = u64::try_from(*count) else {
                continue;
            };

            self.instruments
                .update_resource_changes
                .with_label_values(&[
                    key.org.as_str(),
                    key.project.as_str(),
                    key.stack.as_str(),
                    update.kind.as_str(),
                    operation.as_str(),
                ])
                .inc_by(count);
        }
    }

    fn note_stack_failure(&self, operation: &str, key: &StackKey, error: &ApiError) {
        self.note_failure(operation, error);
        tracing::error!(
            org=%key.org, project=%key.project, stack=%key.stack, %operation, error=?error,
            "stack sub-collection failed"
        );
    }
}
