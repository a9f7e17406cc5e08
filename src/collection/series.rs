use std::collections::HashSet;

use dashmap::DashMap;
use prometheus::IntGaugeVec;

/// Label groups an organization-grouped gauge was last written with, per organization. A group
/// that disappears from the next successful fetch has its series removed instead of keeping its
/// last count.
#[derive(Debug, Default)]
pub struct WrittenSeries(DashMap<String, HashSet<Vec<String>>>);

impl WrittenSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `gauge{org, group..}` to each group's count and removes the series of groups written
    /// for `org` previously but absent now.
    pub fn publish<'a, I>(&self, gauge: &IntGaugeVec, org: &str, groups: I)
    where
        I: IntoIterator<Item = (Vec<&'a str>, usize)>,
    {
        let mut written = HashSet::new();
        for (group, count) in groups {
            let mut labels = Vec::with_capacity(group.len() + 1);
            labels.push(org);
            labels.extend(group.iter().copied());
            gauge.with_label_values(&labels).set(count as i64);
            written.insert(group.into_iter().map(str::to_string).collect::<Vec<_>>());
        }

        let previous = self.0.insert(org.to_string(), written.clone()).unwrap_or_default();
        for stale in previous.difference(&written) {
            let mut labels = Vec::with_capacity(stale.len() + 1);
            labels.push(org);
            labels.extend(stale.iter().map(String::as_str));
            if let Err(err) = gauge.remove_label_values(&labels) {
                tracing::warn!(?labels, error=?err, "failed to remove stale series");
            } else {
                tracing::debug!(?labels, "removed stale series");
            }
        }
    }

    /// Label groups last written for the organization.
    pub fn groups(&self, org: &str) -> HashSet<Vec<String>> {
        self.0.get(org).map(|groups| groups.clone()).unwrap_or_default()
    }
}
