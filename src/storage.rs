//! In-memory append-only event log.

use std::sync::Arc;

use crate::{event::Event, filter::FilterSet};

/// Shared event history. Events are never updated or removed, and iteration
/// always follows insertion order.
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Arc<Event>>,
}

impl EventStore {
    /// Append an event to the end of the log.
    pub fn append(&mut self, event: Event) -> Arc<Event> {
        let event = Arc::new(event);
        self.events.push(Arc::clone(&event));
        event
    }

    /// Lazily yield stored events matching any filter in `filters`, oldest
    /// first.
    ///
    /// The returned iterator borrows the store, so no append can happen
    /// until it is dropped: each call sees the log as it was when called.
    pub fn query<'a>(&'a self, filters: &'a FilterSet) -> impl Iterator<Item = &'a Event> + 'a {
        self.events
            .iter()
            .map(Arc::as_ref)
            .filter(move |ev| filters.matches_any(ev))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use serde_json::{json, Value};

    fn event(id: &str, kind: u32) -> Event {
        Event::from_value(json!({"id": id, "pubkey": "p1", "kind": kind, "created_at": 1})).unwrap()
    }

    fn kinds(kinds: Vec<u32>) -> FilterSet {
        FilterSet(vec![Filter {
            kinds: Some(kinds),
            ..Default::default()
        }])
    }

    #[test]
    fn query_follows_insertion_order() {
        let mut store = EventStore::default();
        for id in ["e3", "e1", "e2"] {
            store.append(event(id, 1));
        }
        let set = kinds(vec![1]);
        let ids: Vec<&str> = store.query(&set).map(|ev| ev.id.as_str()).collect();
        assert_eq!(ids, vec!["e3", "e1", "e2"]);
    }

    #[test]
    fn query_skips_non_matching() {
        let mut store = EventStore::default();
        store.append(event("a", 1));
        store.append(event("b", 2));
        store.append(event("c", 1));
        let set = kinds(vec![1]);
        let ids: Vec<&str> = store.query(&set).map(|ev| ev.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn empty_store_yields_nothing() {
        let store = EventStore::default();
        assert_eq!(store.len(), 0);
        let set = FilterSet(vec![Filter::default()]);
        assert_eq!(store.query(&set).count(), 0);
    }

    #[test]
    fn query_yields_published_documents() {
        let mut store = EventStore::default();
        let doc = json!({"id": "a", "pubkey": "p1", "kind": 1, "created_at": 1, "extra": "keep"});
        store.append(Event::from_value(doc.clone()).unwrap());
        let set = kinds(vec![1]);
        let docs: Vec<&Value> = store.query(&set).map(Event::document).collect();
        assert_eq!(docs, vec![&doc]);
    }

    #[test]
    fn append_keeps_duplicates() {
        let mut store = EventStore::default();
        let first = store.append(event("a", 1));
        store.append(event("a", 1));
        assert_eq!(first.id, "a");
        let set = kinds(vec![1]);
        assert_eq!(store.query(&set).count(), 2);
    }
}
