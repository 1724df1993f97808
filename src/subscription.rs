//! Per-connection subscription registry.

use std::collections::{btree_map::Entry, BTreeMap};

use crate::{event::Event, filter::FilterSet};

/// Subscriptions held by one connection, keyed by the client-chosen id.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: BTreeMap<String, FilterSet>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `filters` under `sub_id`, replacing any previous filter set
    /// for the same id. Returns the stored set.
    pub fn add(&mut self, sub_id: String, filters: FilterSet) -> &FilterSet {
        match self.subscriptions.entry(sub_id) {
            Entry::Occupied(mut entry) => {
                entry.insert(filters);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(filters),
        }
    }

    /// Drop a subscription. Returns whether it existed.
    pub fn remove(&mut self, sub_id: &str) -> bool {
        self.subscriptions.remove(sub_id).is_some()
    }

    /// Ids of every subscription whose filter set matches `event`, in id
    /// order.
    pub fn matching_sub_ids<'a>(&'a self, event: &'a Event) -> impl Iterator<Item = &'a str> + 'a {
        self.subscriptions
            .iter()
            .filter(move |(_, filters)| filters.matches_any(event))
            .map(|(sub_id, _)| sub_id.as_str())
    }

    /// Remove all subscriptions.
    pub fn teardown(&mut self) {
        self.subscriptions.clear();
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }
}
