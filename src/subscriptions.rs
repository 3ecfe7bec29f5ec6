//! Registry of match ids that want live deltas.
//!
//! The registry is the source of truth for subscriptions whether or not the
//! realtime transport is currently up. The connection manager owns it and
//! replays it after every reconnect; the reconciler and snapshot poller read
//! it through a shared reference.

use std::collections::BTreeSet;

use crate::protocol::MatchId;

/// Ordered set of subscribed match ids.
///
/// Inputs are normalized through [`MatchId`], so numeric and string forms of
/// the same id are one entry.
///
/// ```
/// use livescore_client::subscriptions::SubscriptionRegistry;
///
/// let mut registry = SubscriptionRegistry::new();
/// assert!(registry.add(42_u64));
/// assert!(!registry.add("42"));
/// assert!(registry.contains("42"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionRegistry {
    ids: BTreeSet<MatchId>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an id. Returns `true` if it was not already present.
    pub fn add(&mut self, id: impl Into<MatchId>) -> bool {
        self.ids.insert(id.into())
    }

    /// Remove an id. Returns `true` if it was present.
    pub fn remove(&mut self, id: impl Into<MatchId>) -> bool {
        self.ids.remove(&id.into())
    }

    pub fn contains(&self, id: impl Into<MatchId>) -> bool {
        self.ids.contains(&id.into())
    }

    /// Snapshot of every subscribed id, in sorted order.
    pub fn all(&self) -> Vec<MatchId> {
        self.ids.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_ids_share_a_key() {
        let mut registry = SubscriptionRegistry::new();
        assert!(registry.add("42"));
        assert!(registry.contains(42_u64));
        assert!(registry.contains(MatchId::from(42_i64)));
        assert!(registry.remove(42_i32));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_missing_id_reports_false() {
        let mut registry = SubscriptionRegistry::new();
        registry.add("1");
        assert!(!registry.remove("2"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn all_is_sorted_and_deduplicated() {
        let mut registry = SubscriptionRegistry::new();
        registry.add("9");
        registry.add(7_u32);
        registry.add("7");
        assert_eq!(registry.all(), vec![MatchId::from("7"), MatchId::from("9")]);
    }
}
