use dashmap::DashMap;

use crate::api::StackKey;

/// Highest update version already counted per stack. Owned by a single [`Collector`] and created
/// empty with it; safe for concurrent use by the per-stack collectors of a pass.
///
/// [`Collector`]: super::Collector
#[derive(Debug, Default)]
pub struct LastSeenVersions(DashMap<StackKey, i64>);

impl LastSeenVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last seen version for the stack, or 0 if the stack has not been seen.
    pub fn get(&self, stack: &StackKey) -> i64 {
        self.0.get(stack).map(|version| *version).unwrap_or(0)
    }

    /// Raises the stored version for the stack if `version` is higher. Returns whether the stored
    /// value changed.
    pub fn advance(&self, stack: &StackKey, version: i64) -> bool {
        let mut current = self.0.entry(stack.clone()).or_insert(0);
        let previous = *current;
        if previous < version {
            tracing::debug!(%stack, %previous, %version, "advancing last seen version");
            *current = version;
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
