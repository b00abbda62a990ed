//! # Fragment Cache
//!
//! The normalized store behind every [`Store`](crate::store::Store). It owns two maps:
//!
//! - `fragments[partial][id]`: one entity snapshot per projection ("partial"),
//! - `queries[base_path]`: what an address currently returns (an id list for
//!   collections, a single id for items, an opaque snapshot for singleton resources).
//!
//! Every mutation returns a [`Touched`] set naming the fragment ids and query paths
//! whose stored value actually changed, which the store turns into change events.
//!
//! ## Tombstones
//! Removed entries are kept as `None` rather than deleted from the maps. Readers treat
//! a tombstone exactly like a missing key.
//!
//! ## Consistency
//! A collection query that lists an id with no live fragment slot behind it means the
//! two maps have diverged. `fetch` reports that as [`CacheError::MissingFragment`] instead of
//! silently dropping the member.

use crate::error::{CacheError, Result};
use crate::model::{
    now, CacheEntry, Classify, Descriptor, FetchResult, QueryData, Status, Strategy, Touch,
    Touched, STALE_TIMESTAMP,
};
use crate::path::strip_query;
use crate::store::events::NotifyOptions;
use serde_json::Value;
use std::collections::BTreeMap;
use std::iter::once;

type FragmentSlot = Option<CacheEntry<Value>>;
type QuerySlot = Option<CacheEntry<QueryData>>;

/// Options for [`FragmentCache::invalidate`].
#[derive(Debug, Clone, Default)]
pub struct InvalidateOptions {
    /// Drop cached data as well as freshness.
    pub clear: bool,
    /// Leave query entries alone.
    pub no_queries: bool,
    /// Leave fragment entries alone.
    pub no_fragments: bool,
    /// Forwarded to the store's change events.
    pub notify: NotifyOptions,
}

impl InvalidateOptions {
    pub fn clear() -> Self {
        Self {
            clear: true,
            ..Self::default()
        }
    }
}

/// Live entry counts, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub fragments: usize,
    pub queries: usize,
}

/// Ids produced by an update: one for items, many for collections.
enum DataId {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default)]
pub struct FragmentCache {
    fragments: BTreeMap<String, BTreeMap<String, FragmentSlot>>,
    queries: BTreeMap<String, QuerySlot>,
}

fn truthy(value: &Value) -> bool {
    !value.is_null()
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Shallow merge: keys of `incoming` overwrite keys of `existing`.
fn shallow_merge(existing: &Value, incoming: &Value) -> Value {
    match (existing, incoming) {
        (Value::Object(old), Value::Object(new)) => {
            let mut merged = old.clone();
            merged.extend(new.iter().map(|(k, v)| (k.clone(), v.clone())));
            Value::Object(merged)
        }
        _ => incoming.clone(),
    }
}

/// Applies `strategy` to produce the next stored value.
fn combine(strategy: Strategy, existing: Option<&Value>, incoming: Option<&Value>) -> Option<Value> {
    match (strategy, existing, incoming) {
        (Strategy::Merge, Some(old), Some(new)) => Some(shallow_merge(old, new)),
        (Strategy::Merge, Some(old), None) => Some(old.clone()),
        (_, _, new) => new.cloned(),
    }
}

fn dedupe(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

fn ensure_writable(descriptor: &Descriptor) -> Result<()> {
    if descriptor.valid {
        Ok(())
    } else {
        Err(CacheError::InvalidDescriptor(
            descriptor.path.clone().unwrap_or_else(|| descriptor.label()),
        ))
    }
}

impl FragmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn fragment(&self, partial: &str, id: &str) -> Option<&CacheEntry<Value>> {
        self.fragments.get(partial)?.get(id)?.as_ref()
    }

    fn query(&self, path: &str) -> Option<&CacheEntry<QueryData>> {
        self.queries.get(path)?.as_ref()
    }

    /// Data of a collection/item member. The slot must be live; a live entry whose
    /// data was emptied or cleared reads as an empty object.
    fn member(&self, partial: &str, id: &str) -> Result<Value> {
        self.fragment(partial, id)
            .map(|entry| {
                entry
                    .data
                    .clone()
                    .unwrap_or_else(|| Value::Object(Default::default()))
            })
            .ok_or_else(|| CacheError::MissingFragment {
                id: id.to_string(),
                partial: partial.to_string(),
            })
    }

    /// Reads what the cache holds for `descriptor`. Never mutates state.
    pub fn fetch(&self, descriptor: &Descriptor) -> Result<FetchResult> {
        let mut result = FetchResult::default();

        if let Some(id) = &descriptor.id {
            if let Some(entry) = self.fragment(&descriptor.partial, id) {
                result.status = entry.status;
                result.timestamp = entry.timestamp;
                result.data = entry.data.clone().filter(truthy);
            }
            if result.data.is_none() {
                self.fill_from_fallbacks(descriptor, id, &mut result);
            }
        } else if let Some(base_path) = &descriptor.base_path {
            if let Some(entry) = self.query(base_path) {
                result.status = entry.status;
                result.timestamp = entry.timestamp;
                result.data = match (&entry.data, descriptor.classify) {
                    (None, _) => None,
                    (Some(QueryData::Ids(ids)), Classify::Collection) => Some(Value::Array(
                        ids.iter()
                            .map(|id| self.member(&descriptor.partial, id))
                            .collect::<Result<Vec<_>>>()?,
                    )),
                    (Some(QueryData::Id(id)), Classify::Item) => {
                        Some(self.member(&descriptor.partial, id)?)
                    }
                    (Some(QueryData::Snapshot(snapshot)), _) => Some(snapshot.clone()),
                    (Some(QueryData::Ids(ids)), _) => Some(Value::from(ids.clone())),
                    (Some(QueryData::Id(id)), _) => Some(Value::String(id.clone())),
                };
            }
        }

        if result.data.is_none() && descriptor.classify == Classify::Collection {
            result.data = Some(Value::Array(Vec::new()));
        }
        Ok(result)
    }

    /// Assembles a partial view from the fallback projections, most specific first.
    fn fill_from_fallbacks(&self, descriptor: &Descriptor, id: &str, result: &mut FetchResult) {
        let chain = descriptor
            .fragments
            .iter()
            .map(String::as_str)
            .chain(once(descriptor.default_partial.as_str()))
            .filter(|partial| *partial != descriptor.partial);

        for partial in chain {
            let Some(entry) = self.fragment(partial, id) else {
                continue;
            };
            let Some(data) = entry.data.as_ref().filter(|d| truthy(d)) else {
                continue;
            };
            if result.data.is_none() {
                result.data = Some(data.clone());
                if result.timestamp == STALE_TIMESTAMP {
                    result.timestamp = entry.timestamp;
                }
            } else if let (Some(Value::Object(acc)), Value::Object(more)) = (&mut result.data, data) {
                for (key, value) in more {
                    acc.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
            result.status = Status::Partial;
        }
    }

    /// Merges `patch` into the addressed entry's metadata, creating it if needed.
    pub fn touch(&mut self, descriptor: &Descriptor, patch: &Touch) -> Result<Touched> {
        ensure_writable(descriptor)?;
        let mut touched = Touched::default();
        if patch.is_empty() {
            return Ok(touched);
        }

        if let Some(id) = &descriptor.id {
            let slot = self
                .fragments
                .entry(descriptor.partial.clone())
                .or_default()
                .entry(id.clone())
                .or_insert(None);
            let entry = slot.get_or_insert_with(CacheEntry::default);
            let before = entry.clone();
            entry.apply(patch);
            if *entry != before {
                touched.fragment(id);
            }
        } else if let Some(base_path) = &descriptor.base_path {
            let slot = self.queries.entry(base_path.clone()).or_insert(None);
            let entry = slot.get_or_insert_with(CacheEntry::default);
            let before = entry.clone();
            entry.apply(patch);
            if *entry != before {
                touched.query(base_path);
            }
        }
        Ok(touched)
    }

    /// Stores `data` for `descriptor`.
    ///
    /// Collections write one fragment per member (a lone object is one member) and
    /// record the member ids under the collection's address; items write their fragment and point their address at
    /// it; anything else is stored as an opaque snapshot. Empty payloads store a
    /// stale timestamp so the address is refetched.
    pub fn update(
        &mut self,
        descriptor: &Descriptor,
        data: Option<Value>,
        status: Option<Status>,
    ) -> Result<Touched> {
        ensure_writable(descriptor)?;
        let status = status.unwrap_or(Status::Complete);
        let data = data.filter(truthy);
        let timestamp = if data.is_some() { now() } else { STALE_TIMESTAMP };
        let mut touched = Touched::default();

        let data_id = match descriptor.classify {
            Classify::Collection => match &data {
                Some(Value::Array(items)) => Some(DataId::Many(
                    items
                        .iter()
                        .map(|item| {
                            self.update_item(descriptor, None, Some(item), status, timestamp, &mut touched)
                        })
                        .collect::<Result<_>>()?,
                )),
                Some(item @ Value::Object(_)) => Some(DataId::One(self.update_item(
                    descriptor,
                    None,
                    Some(item),
                    status,
                    timestamp,
                    &mut touched,
                )?)),
                Some(other) => {
                    return Err(CacheError::InvalidPayload(format!(
                        "collection data must be an array or object, got {other}"
                    )))
                }
                None => None,
            },
            Classify::Item => Some(DataId::One(self.update_item(
                descriptor,
                descriptor.id.as_deref(),
                data.as_ref(),
                status,
                timestamp,
                &mut touched,
            )?)),
            _ => None,
        };

        let Some(base_path) = &descriptor.base_path else {
            return Ok(touched);
        };

        match (descriptor.classify, data_id) {
            (Classify::Collection, data_id) => {
                let ids = match data_id {
                    Some(DataId::Many(ids)) => dedupe(ids),
                    Some(DataId::One(id)) => vec![id],
                    None => Vec::new(),
                };
                let slot = self.queries.entry(base_path.clone()).or_insert(None);
                let previous_ids = slot.as_ref().and_then(|e| e.data.clone());
                let next = if ids.is_empty() {
                    let kept = match (descriptor.collection_strategy, &data) {
                        (Strategy::Replace, Some(_)) => Some(QueryData::Ids(Vec::new())),
                        _ => previous_ids,
                    };
                    CacheEntry::new(Status::Stale, STALE_TIMESTAMP, kept)
                } else {
                    let ids = match (descriptor.collection_strategy, previous_ids) {
                        (Strategy::Merge, Some(QueryData::Ids(existing))) => {
                            dedupe(existing.into_iter().chain(ids).collect())
                        }
                        _ => ids,
                    };
                    CacheEntry::new(status, timestamp, Some(QueryData::Ids(ids)))
                };
                if slot.as_ref().map_or(true, |prev| !prev.same_content(&next)) {
                    touched.query(base_path);
                }
                *slot = Some(next);
            }
            (Classify::Item, Some(DataId::One(id))) => {
                if touched.fragments.contains(&id) {
                    for (path, slot) in &self.queries {
                        let lists = slot
                            .as_ref()
                            .and_then(|e| e.data.as_ref())
                            .is_some_and(|q| q.lists(&id));
                        if lists {
                            touched.query(path);
                        }
                    }
                }
                let next = CacheEntry::new(status, timestamp, Some(QueryData::Id(id)));
                let slot = self.queries.entry(base_path.clone()).or_insert(None);
                if slot.as_ref().map_or(true, |prev| !prev.same_content(&next)) {
                    touched.query(base_path);
                }
                *slot = Some(next);
            }
            _ => {
                let slot = self.queries.entry(base_path.clone()).or_insert(None);
                let existing = match slot.as_ref().and_then(|e| e.data.as_ref()) {
                    Some(QueryData::Snapshot(snapshot)) => Some(snapshot),
                    _ => None,
                };
                let snapshot = combine(descriptor.cache_strategy, existing, data.as_ref());
                let next = CacheEntry::new(status, timestamp, snapshot.map(QueryData::Snapshot));
                if slot.as_ref().map_or(true, |prev| !prev.same_content(&next)) {
                    touched.query(base_path);
                }
                *slot = Some(next);
            }
        }
        Ok(touched)
    }

    /// Writes one entity fragment and returns its id.
    fn update_item(
        &mut self,
        descriptor: &Descriptor,
        explicit_id: Option<&str>,
        item: Option<&Value>,
        status: Status,
        timestamp: u64,
        touched: &mut Touched,
    ) -> Result<String> {
        let id = explicit_id
            .map(str::to_string)
            .or_else(|| {
                item.and_then(|i| i.get(&descriptor.id_attribute))
                    .and_then(id_string)
            })
            .ok_or_else(|| {
                CacheError::MissingId(
                    item.map(Value::to_string)
                        .unwrap_or_else(|| descriptor.label()),
                )
            })?;

        let slot = self
            .fragments
            .entry(descriptor.partial.clone())
            .or_default()
            .entry(id.clone())
            .or_insert(None);
        let existing = slot.as_ref().and_then(|e| e.data.as_ref());
        let data = combine(descriptor.cache_strategy, existing, item);
        let next = CacheEntry::new(status, timestamp, data);

        if slot.as_ref().map_or(true, |prev| !prev.same_content(&next)) {
            touched.fragment(&id);
        }
        *slot = Some(next);
        Ok(id)
    }

    /// Marks matching entries stale. `None` flushes every query and fragment.
    pub fn invalidate(
        &mut self,
        descriptor: Option<&Descriptor>,
        options: &InvalidateOptions,
    ) -> Touched {
        let mut touched = Touched::default();

        if !options.no_queries {
            for (path, slot) in self.queries.iter_mut() {
                let Some(entry) = slot else {
                    continue;
                };
                let matches = match descriptor {
                    None => true,
                    Some(d) => {
                        d.base_path
                            .as_deref()
                            .is_some_and(|base| path == base || strip_query(path) == base)
                            || d.id.as_deref().is_some_and(|id| {
                                entry.data.as_ref().is_some_and(|q| q.lists(id))
                            })
                    }
                };
                if matches {
                    entry.mark_stale(options.clear);
                    touched.query(path);
                }
            }
        }

        if !options.no_fragments {
            match descriptor {
                // An entity's id is stale in every projection at once.
                Some(d) => {
                    if let Some(id) = &d.id {
                        for partial in self.fragments.values_mut() {
                            if let Some(Some(entry)) = partial.get_mut(id) {
                                entry.mark_stale(options.clear);
                                touched.fragment(id);
                            }
                        }
                    }
                }
                None => {
                    for partial in self.fragments.values_mut() {
                        for (id, slot) in partial.iter_mut() {
                            if let Some(entry) = slot {
                                entry.mark_stale(options.clear);
                                touched.fragment(id);
                            }
                        }
                    }
                }
            }
        }
        touched
    }

    /// Removes the addressed entity (repairing collection membership) or query.
    pub fn destroy(&mut self, descriptor: &Descriptor) -> Result<Touched> {
        ensure_writable(descriptor)?;
        let mut touched = Touched::default();

        if let Some(id) = &descriptor.id {
            let mut found = false;
            for partial in self.fragments.values_mut() {
                if let Some(slot) = partial.get_mut(id) {
                    found |= slot.take().is_some();
                }
            }
            if !found {
                return Ok(touched);
            }
            touched.fragment(id);

            for (path, slot) in self.queries.iter_mut() {
                if let Some(CacheEntry {
                    data: Some(QueryData::Ids(ids)),
                    ..
                }) = slot
                {
                    if ids.contains(id) {
                        ids.retain(|member| member != id);
                        touched.query(path);
                    }
                }
            }
        } else if let Some(base_path) = &descriptor.base_path {
            if let Some(slot) = self.queries.get_mut(base_path) {
                if slot.take().is_some() {
                    touched.query(base_path);
                }
            }
        }
        Ok(touched)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            fragments: self
                .fragments
                .values()
                .flat_map(|partial| partial.values())
                .filter(|slot| slot.is_some())
                .count(),
            queries: self.queries.values().filter(|slot| slot.is_some()).count(),
        }
    }

    /// Raw query data for `path`, tombstones read as absent.
    pub fn query_data(&self, path: &str) -> Option<&QueryData> {
        self.query(path)?.data.as_ref()
    }

    pub fn query_status(&self, path: &str) -> Option<Status> {
        self.query(path).map(|entry| entry.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> Descriptor {
        Descriptor::collection("/users")
    }

    fn user(id: &str) -> Descriptor {
        Descriptor::item(id, format!("/users/{id}"))
    }

    #[test]
    fn test_round_trip_item() {
        let mut cache = FragmentCache::new();
        cache
            .update(&user("1"), Some(json!({"id": 1, "name": "Ada"})), None)
            .unwrap();

        let result = cache.fetch(&user("1")).unwrap();
        assert_eq!(result.data, Some(json!({"id": 1, "name": "Ada"})));
        assert_eq!(result.status, Status::Complete);
        assert!(result.timestamp > STALE_TIMESTAMP);
    }

    #[test]
    fn test_merge_versus_replace() {
        let mut cache = FragmentCache::new();
        cache.update(&user("1"), Some(json!({"a": 1, "b": 2})), None).unwrap();
        let merge = user("1").with_cache_strategy(Strategy::Merge);
        cache.update(&merge, Some(json!({"b": 3, "c": 4})), None).unwrap();
        assert_eq!(
            cache.fetch(&user("1")).unwrap().data,
            Some(json!({"a": 1, "b": 3, "c": 4}))
        );

        cache.update(&user("2"), Some(json!({"a": 1, "b": 2})), None).unwrap();
        cache.update(&user("2"), Some(json!({"b": 3, "c": 4})), None).unwrap();
        assert_eq!(
            cache.fetch(&user("2")).unwrap().data,
            Some(json!({"b": 3, "c": 4}))
        );
    }

    #[test]
    fn test_partial_fallback_prefers_most_specific() {
        let mut cache = FragmentCache::new();
        cache
            .update(&user("1"), Some(json!({"id": 1, "name": "full", "bio": "x"})), None)
            .unwrap();
        cache
            .update(
                &user("1").with_partial("summary"),
                Some(json!({"id": 1, "name": "summary"})),
                None,
            )
            .unwrap();

        let card = user("1").with_partial("card").with_fragments(["summary"]);
        let result = cache.fetch(&card).unwrap();
        assert_eq!(result.status, Status::Partial);
        assert_eq!(
            result.data,
            Some(json!({"id": 1, "name": "summary", "bio": "x"}))
        );
    }

    #[test]
    fn test_collection_fetch_always_yields_array() {
        let cache = FragmentCache::new();
        let result = cache.fetch(&users()).unwrap();
        assert_eq!(result.data, Some(json!([])));
        assert_eq!(result.status, Status::Stale);
    }

    #[test]
    fn test_unknown_item_is_stale_and_empty() {
        let cache = FragmentCache::new();
        assert_eq!(cache.fetch(&user("9")).unwrap(), FetchResult::default());
    }

    #[test]
    fn test_collection_merge_unions_ids() {
        let mut cache = FragmentCache::new();
        cache
            .update(&users(), Some(json!([{"id": 1}, {"id": 2}])), None)
            .unwrap();
        let merging = users().with_collection_strategy(Strategy::Merge);
        cache
            .update(&merging, Some(json!([{"id": 2}, {"id": 3}])), None)
            .unwrap();
        assert_eq!(
            cache.query_data("/users"),
            Some(&QueryData::Ids(vec!["1".into(), "2".into(), "3".into()]))
        );

        cache.update(&users(), Some(json!([{"id": 3}])), None).unwrap();
        assert_eq!(
            cache.query_data("/users"),
            Some(&QueryData::Ids(vec!["3".into()]))
        );
    }

    #[test]
    fn test_collection_object_payload_is_one_member() {
        let mut cache = FragmentCache::new();
        cache.update(&users(), Some(json!([{"id": "a"}])), None).unwrap();
        let created = users().with_collection_strategy(Strategy::Merge);
        cache.update(&created, Some(json!({"id": "b"})), None).unwrap();
        assert_eq!(
            cache.fetch(&users()).unwrap().data,
            Some(json!([{"id": "a"}, {"id": "b"}]))
        );
    }

    #[test]
    fn test_collection_rejects_scalar_payload() {
        let mut cache = FragmentCache::new();
        let err = cache.update(&users(), Some(json!(5)), None).unwrap_err();
        assert!(matches!(err, CacheError::InvalidPayload(_)));
    }

    #[test]
    fn test_member_without_id_is_fatal() {
        let mut cache = FragmentCache::new();
        let err = cache
            .update(&users(), Some(json!([{"name": "anon"}])), None)
            .unwrap_err();
        assert!(matches!(err, CacheError::MissingId(_)));
    }

    #[test]
    fn test_custom_id_attribute() {
        let mut cache = FragmentCache::new();
        let mut descriptor = users();
        descriptor.id_attribute = "uuid".to_string();
        cache
            .update(&descriptor, Some(json!([{"uuid": "u-1"}])), None)
            .unwrap();
        assert!(cache.fetch(&user("u-1")).unwrap().data.is_some());
    }

    #[test]
    fn test_unchanged_update_touches_nothing() {
        let mut cache = FragmentCache::new();
        let first = cache.update(&user("1"), Some(json!({"id": 1})), None).unwrap();
        assert_eq!(first.fragments, vec!["1"]);
        let second = cache.update(&user("1"), Some(json!({"id": 1})), None).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_item_update_touches_listing_collections() {
        let mut cache = FragmentCache::new();
        cache.update(&users(), Some(json!([{"id": 1}])), None).unwrap();
        let touched = cache
            .update(&user("1"), Some(json!({"id": 1, "name": "new"})), None)
            .unwrap();
        assert_eq!(touched.fragments, vec!["1"]);
        assert!(touched.queries.contains(&"/users".to_string()));
        assert!(touched.queries.contains(&"/users/1".to_string()));
    }

    #[test]
    fn test_resource_snapshot_merge() {
        let mut cache = FragmentCache::new();
        let settings = Descriptor::resource("/settings").with_cache_strategy(Strategy::Merge);
        cache.update(&settings, Some(json!({"theme": "dark"})), None).unwrap();
        cache.update(&settings, Some(json!({"lang": "en"})), None).unwrap();
        assert_eq!(
            cache.fetch(&settings).unwrap().data,
            Some(json!({"theme": "dark", "lang": "en"}))
        );
    }

    #[test]
    fn test_touch_marks_metadata_only() {
        let mut cache = FragmentCache::new();
        cache.update(&user("1"), Some(json!({"id": 1})), None).unwrap();
        let touched = cache.touch(&user("1"), &Touch::status(Status::Pending)).unwrap();
        assert_eq!(touched.fragments, vec!["1"]);

        let result = cache.fetch(&user("1")).unwrap();
        assert_eq!(result.status, Status::Pending);
        assert_eq!(result.data, Some(json!({"id": 1})));

        assert!(cache.touch(&user("1"), &Touch::default()).unwrap().is_empty());
    }

    #[test]
    fn test_touch_creates_query_entry() {
        let mut cache = FragmentCache::new();
        let touched = cache.touch(&users(), &Touch::status(Status::Pending)).unwrap();
        assert_eq!(touched.queries, vec!["/users"]);
        assert_eq!(cache.query_status("/users"), Some(Status::Pending));
    }

    #[test]
    fn test_invalid_descriptor_cannot_write() {
        let mut cache = FragmentCache::new();
        let mut descriptor = user("1");
        descriptor.valid = false;
        assert!(matches!(
            cache.update(&descriptor, Some(json!({"id": 1})), None),
            Err(CacheError::InvalidDescriptor(_))
        ));
        assert!(cache.destroy(&descriptor).is_err());
        assert!(cache.fetch(&descriptor).is_ok());
    }

    #[test]
    fn test_invalidate_is_projection_agnostic() {
        let mut cache = FragmentCache::new();
        cache.update(&user("1"), Some(json!({"id": 1})), None).unwrap();
        cache
            .update(&user("1").with_partial("summary"), Some(json!({"id": 1})), None)
            .unwrap();

        let touched = cache.invalidate(Some(&user("1")), &InvalidateOptions::default());
        assert_eq!(touched.fragments, vec!["1"]);
        for partial in ["default", "summary"] {
            let result = cache.fetch(&user("1").with_partial(partial)).unwrap();
            assert_eq!(result.status, Status::Stale);
            assert_eq!(result.data, Some(json!({"id": 1})));
        }
    }

    #[test]
    fn test_invalidate_matches_query_string_variants() {
        let mut cache = FragmentCache::new();
        cache
            .update(&Descriptor::collection("/users?page=2"), Some(json!([{"id": 1}])), None)
            .unwrap();
        let touched = cache.invalidate(Some(&users()), &InvalidateOptions::default());
        assert_eq!(touched.queries, vec!["/users?page=2"]);
    }

    #[test]
    fn test_invalidate_clear_drops_data() {
        let mut cache = FragmentCache::new();
        cache.update(&user("1"), Some(json!({"id": 1})), None).unwrap();
        cache.invalidate(Some(&user("1")), &InvalidateOptions::clear());
        assert_eq!(cache.fetch(&user("1")).unwrap().data, None);
    }

    #[test]
    fn test_invalidate_everything_respects_suppression() {
        let mut cache = FragmentCache::new();
        cache.update(&users(), Some(json!([{"id": 1}, {"id": 2}])), None).unwrap();
        let options = InvalidateOptions {
            no_fragments: true,
            ..InvalidateOptions::default()
        };
        let touched = cache.invalidate(None, &options);
        assert_eq!(touched.queries, vec!["/users"]);
        assert!(touched.fragments.is_empty());
        assert_eq!(cache.fetch(&user("1")).unwrap().status, Status::Complete);
    }

    #[test]
    fn test_destroy_by_path_only_removes_query() {
        let mut cache = FragmentCache::new();
        cache.update(&users(), Some(json!([{"id": 1}])), None).unwrap();
        let touched = cache.destroy(&users()).unwrap();
        assert_eq!(touched.queries, vec!["/users"]);
        assert!(cache.query_data("/users").is_none());
        assert!(cache.fetch(&user("1")).unwrap().data.is_some());
    }

    #[test]
    fn test_destroy_missing_is_noop() {
        let mut cache = FragmentCache::new();
        assert!(cache.destroy(&user("404")).unwrap().is_empty());
    }

    #[test]
    fn test_emptied_member_reads_as_empty_object() {
        let mut cache = FragmentCache::new();
        cache
            .update(&users(), Some(json!([{"id": 1}, {"id": 2}])), None)
            .unwrap();
        cache.update(&user("1"), None, None).unwrap();

        let result = cache.fetch(&users()).unwrap();
        assert_eq!(result.data, Some(json!([{}, {"id": 2}])));
    }

    #[test]
    fn test_clearing_fragments_keeps_collections_readable() {
        let mut cache = FragmentCache::new();
        cache.update(&users(), Some(json!([{"id": 1}])), None).unwrap();
        let options = InvalidateOptions {
            no_queries: true,
            ..InvalidateOptions::clear()
        };
        cache.invalidate(None, &options);

        let result = cache.fetch(&users()).unwrap();
        assert_eq!(result.data, Some(json!([{}])));
        assert_eq!(result.status, Status::Complete);
    }

    #[test]
    fn test_tombstoned_member_is_divergence() {
        let mut cache = FragmentCache::new();
        cache.update(&users(), Some(json!([{"id": 1}])), None).unwrap();
        cache.fragments.get_mut("default").unwrap().insert("1".into(), None);
        assert!(matches!(
            cache.fetch(&users()),
            Err(CacheError::MissingFragment { id, .. }) if id == "1"
        ));
    }

    #[test]
    fn test_stats_ignore_tombstones() {
        let mut cache = FragmentCache::new();
        cache.update(&users(), Some(json!([{"id": 1}, {"id": 2}])), None).unwrap();
        cache.destroy(&user("2")).unwrap();
        assert_eq!(
            cache.stats(),
            CacheStats {
                fragments: 1,
                queries: 1
            }
        );
    }
}
