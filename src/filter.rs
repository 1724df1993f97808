//! Subscription filters and the matching predicate.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::event::Event;

/// A single NIP-01 filter. Every present field is an AND constraint; a
/// filter with nothing set matches every event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Event id values, matched exactly or as prefixes.
    pub ids: Option<Vec<String>>,
    /// Author pubkeys, matched exactly or as prefixes.
    pub authors: Option<Vec<String>>,
    pub kinds: Option<Vec<u32>>,
    /// `#<name>` constraints keyed by tag name.
    pub tags: BTreeMap<String, Vec<String>>,
    /// Inclusive lower bound on `created_at`.
    pub since: Option<i128>,
    /// Inclusive upper bound on `created_at`.
    pub until: Option<i128>,
}

impl Filter {
    /// Convert a Nostr filter JSON object into a `Filter`.
    ///
    /// Returns `None` when `val` is not an object. A clause whose value has
    /// the wrong shape is left unset, and array elements of the wrong type
    /// are dropped.
    pub fn from_value(val: &Value) -> Option<Self> {
        let obj = val.as_object()?;
        let mut filter = Filter {
            ids: string_list(val, "ids"),
            authors: string_list(val, "authors"),
            kinds: array(val, "kinds").map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_u64().and_then(|k| u32::try_from(k).ok()))
                    .collect()
            }),
            since: integer(val, "since"),
            until: integer(val, "until"),
            ..Default::default()
        };
        for key in obj.keys() {
            let Some(name) = key.strip_prefix('#').filter(|n| !n.is_empty()) else {
                continue;
            };
            if let Some(values) = string_list(val, key) {
                filter.tags.insert(name.to_string(), values);
            }
        }
        Some(filter)
    }

    /// Does `ev` satisfy every constraint of this filter?
    pub fn matches(&self, ev: &Event) -> bool {
        self.ids.as_deref().map_or(true, |ids| exact_or_prefix(ids, &ev.id))
            && self
                .authors
                .as_deref()
                .map_or(true, |authors| exact_or_prefix(authors, &ev.pubkey))
            && self.kinds.as_ref().map_or(true, |kinds| kinds.contains(&ev.kind))
            && self.tags.iter().all(|(name, values)| {
                ev.tags.iter().any(|tag| {
                    tag.name() == Some(name.as_str())
                        && tag.value().map_or(false, |v| values.iter().any(|x| x == v))
                })
            })
            && self.since.map_or(true, |s| i128::from(ev.created_at) >= s)
            && self.until.map_or(true, |u| i128::from(ev.created_at) <= u)
    }
}

/// Ordered OR of filters attached to one subscription.
///
/// An empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet(pub Vec<Filter>);

impl FilterSet {
    /// Build a set from the filter elements of a `REQ` message, dropping
    /// elements that are not JSON objects.
    pub fn from_values<'a>(vals: impl IntoIterator<Item = &'a Value>) -> Self {
        FilterSet(
            vals.into_iter()
                .filter_map(|v| {
                    let filter = Filter::from_value(v);
                    if filter.is_none() {
                        tracing::trace!(filter = %v, "dropping non-object filter");
                    }
                    filter
                })
                .collect(),
        )
    }

    /// True iff at least one filter matches `ev`.
    pub fn matches_any(&self, ev: &Event) -> bool {
        self.0.iter().any(|f| f.matches(ev))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Exact membership is covered by the prefix test.
fn exact_or_prefix(candidates: &[String], value: &str) -> bool {
    candidates.iter().any(|c| value.starts_with(c.as_str()))
}

fn array<'a>(val: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    let field = val.get(key)?;
    let arr = field.as_array();
    if arr.is_none() {
        tracing::trace!(field = key, "ignoring filter clause with unexpected shape");
    }
    arr
}

fn string_list(val: &Value, key: &str) -> Option<Vec<String>> {
    array(val, key).map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect()
    })
}

/// Any JSON integer, signed or not.
fn integer(val: &Value, key: &str) -> Option<i128> {
    let field = val.get(key)?;
    let n = field
        .as_i64()
        .map(i128::from)
        .or_else(|| field.as_u64().map(i128::from));
    if n.is_none() {
        tracing::trace!(field = key, "ignoring filter clause with unexpected shape");
    }
    n
}
