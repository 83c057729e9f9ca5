//! Keyed store of backend responses.
//!
//! One cache exists per console session. Entries are addressed only by
//! [`CacheKey`]; readers observe changes through [`Subscription`]s and an
//! entry nobody subscribes to is dropped by [`QueryCache::gc`].

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::client::ApiRequest;

/// Resource name plus the parameter tuple that produced the response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    resource: String,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(resource: &str) -> Self {
        CacheKey {
            resource: resource.to_string(),
            params: BTreeMap::new(),
        }
    }

    /// Blank values are dropped so `search=""` and no search share a key.
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        let value = value.trim();
        if !value.is_empty() {
            self.params.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn param_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// `users` owns `users` and `users/...` but not `users-archive`.
    pub fn belongs_to(&self, resource: &str) -> bool {
        self.resource == resource
            || self
                .resource
                .strip_prefix(resource)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

/// Read-only view of one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedQuery {
    pub data: Option<Value>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_stale: bool,
    pub is_fetching: bool,
}

/// Issued when a fetch starts; a result is applied only if its ticket's
/// generation still matches the entry.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    key: CacheKey,
    generation: u64,
}

/// Cached values of one resource, copied out by value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    entries: Vec<(CacheKey, Option<Value>)>,
}

impl Snapshot {
    pub fn entries(&self) -> &[(CacheKey, Option<Value>)] {
        &self.entries
    }
}

struct Entry {
    data: Option<Value>,
    error: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    stale: bool,
    in_flight: usize,
    generation: u64,
    request: Option<ApiRequest>,
    subscribers: usize,
    version: watch::Sender<u64>,
}

impl Entry {
    fn new() -> Self {
        let (version, _) = watch::channel(0);
        Entry {
            data: None,
            error: None,
            updated_at: None,
            stale: false,
            in_flight: 0,
            generation: 0,
            request: None,
            subscribers: 0,
            version,
        }
    }

    fn view(&self) -> CachedQuery {
        CachedQuery {
            data: self.data.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
            is_stale: self.stale,
            is_fetching: self.in_flight > 0,
        }
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<RwLock<HashMap<CacheKey, Entry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedQuery> {
        self.entries.read().get(key).map(Entry::view)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn subscribe(&self, key: &CacheKey) -> Subscription {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        entry.subscribers += 1;
        Subscription {
            cache: self.clone(),
            key: key.clone(),
            changes: entry.version.subscribe(),
        }
    }

    fn unsubscribe(&self, key: &CacheKey) {
        if let Some(entry) = self.entries.write().get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
        }
    }

    /// Marks a fetch as started and remembers how to repeat it.
    pub fn begin_fetch(&self, key: &CacheKey, request: ApiRequest) -> FetchTicket {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        entry.in_flight += 1;
        entry.request = Some(request);
        entry.notify();
        FetchTicket {
            key: key.clone(),
            generation: entry.generation,
        }
    }

    /// Applies a fetch result. Returns false when the fetch was cancelled
    /// or its entry has been evicted.
    pub fn settle(&self, ticket: FetchTicket, result: Result<Value, String>) -> bool {
        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(&ticket.key) else {
            return false;
        };
        if entry.generation != ticket.generation {
            return false;
        }

        entry.in_flight = entry.in_flight.saturating_sub(1);
        match result {
            Ok(data) => {
                entry.data = Some(data);
                entry.error = None;
                entry.stale = false;
                entry.updated_at = Some(Utc::now());
            }
            // Keep the last good data; the view decides how to show the error.
            Err(message) => entry.error = Some(message),
        }
        entry.notify();
        true
    }

    pub fn set_data(&self, key: &CacheKey, data: Value) {
        let mut entries = self.entries.write();
        let entry = entries.entry(key.clone()).or_insert_with(Entry::new);
        entry.data = Some(data);
        entry.notify();
    }

    /// Discards the results of every in-flight fetch of `resource`.
    pub fn cancel(&self, resource: &str) {
        for (key, entry) in self.entries.write().iter_mut() {
            if key.belongs_to(resource) && entry.in_flight > 0 {
                entry.generation += 1;
                entry.in_flight = 0;
                entry.notify();
            }
        }
    }

    pub fn snapshot(&self, resource: &str) -> Snapshot {
        let mut entries: Vec<(CacheKey, Option<Value>)> = self
            .entries
            .read()
            .iter()
            .filter(|(key, _)| key.belongs_to(resource))
            .map(|(key, entry)| (key.clone(), entry.data.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Snapshot { entries }
    }

    pub fn restore(&self, snapshot: Snapshot) {
        let mut entries = self.entries.write();
        for (key, data) in snapshot.entries {
            if let Some(entry) = entries.get_mut(&key) {
                entry.data = data;
                entry.notify();
            }
        }
    }

    /// Marks every entry of `resource` stale and returns the subscribed ones
    /// together with the request that last filled them.
    pub fn invalidate(&self, resource: &str) -> Vec<(CacheKey, ApiRequest)> {
        let mut active = Vec::new();
        for (key, entry) in self.entries.write().iter_mut() {
            if !key.belongs_to(resource) {
                continue;
            }
            entry.stale = true;
            entry.notify();
            if entry.subscribers > 0 {
                if let Some(request) = &entry.request {
                    active.push((key.clone(), request.clone()));
                }
            }
        }
        active.sort_by(|a, b| a.0.cmp(&b.0));
        active
    }

    /// Evicts entries with no subscribers and nothing in flight.
    pub fn gc(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.subscribers > 0 || entry.in_flight > 0);
        before - entries.len()
    }
}

/// Interest in one key; dropping it releases the interest.
pub struct Subscription {
    cache: QueryCache,
    key: CacheKey,
    changes: watch::Receiver<u64>,
}

impl Subscription {
    /// Waits for the next change to the entry. Returns false if the entry
    /// was evicted while waiting.
    pub async fn changed(&mut self) -> bool {
        self.changes.changed().await.is_ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users(page: u32, status: Option<&str>) -> CacheKey {
        CacheKey::new("users")
            .param("page", page)
            .param("limit", 10)
            .param_opt("status", status)
    }

    #[test]
    fn distinct_parameter_tuples_never_share_an_entry() {
        let cache = QueryCache::new();
        let a = users(1, Some("ACTIVE"));
        let b = users(1, Some("BLOCKED"));
        let c = users(2, Some("ACTIVE"));

        cache.set_data(&a, json!({"users": ["a"]}));
        cache.set_data(&b, json!({"users": ["b"]}));

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.get(&a).unwrap().data, Some(json!({"users": ["a"]})));
        assert_eq!(cache.get(&b).unwrap().data, Some(json!({"users": ["b"]})));
        assert!(cache.get(&c).is_none());
    }

    #[test]
    fn key_ignores_insertion_order_and_blank_values() {
        let a = CacheKey::new("plans").param("page", 1).param("search", "pro");
        let b = CacheKey::new("plans")
            .param("search", "pro")
            .param("status", "  ")
            .param("page", 1);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "plans?page=1&search=pro");
    }

    #[test]
    fn params_are_readable_by_name() {
        let key = users(2, Some("BLOCKED"));
        assert_eq!(key.get("status"), Some("BLOCKED"));
        assert_eq!(key.get("page"), Some("2"));
        assert_eq!(users(1, None).get("status"), None);
    }

    #[test]
    fn resource_prefix_matching() {
        let detail = CacheKey::new("verifications/detail").param("id", "v1");
        assert!(detail.belongs_to("verifications"));
        assert!(!detail.belongs_to("verification"));
        assert!(!CacheKey::new("users-archive").belongs_to("users"));
    }

    #[test]
    fn cancelled_fetch_cannot_overwrite_entry() {
        let cache = QueryCache::new();
        let key = users(1, None);
        cache.set_data(&key, json!({"v": 1}));

        let ticket = cache.begin_fetch(&key, ApiRequest::get("/admin/users"));
        cache.cancel("users");
        cache.set_data(&key, json!({"v": "optimistic"}));

        assert!(!cache.settle(ticket, Ok(json!({"v": "late"}))));
        let view = cache.get(&key).unwrap();
        assert_eq!(view.data, Some(json!({"v": "optimistic"})));
        assert!(!view.is_fetching);
    }

    #[test]
    fn failed_refetch_keeps_previous_data() {
        let cache = QueryCache::new();
        let key = users(1, None);
        let first = cache.begin_fetch(&key, ApiRequest::get("/admin/users"));
        cache.settle(first, Ok(json!([1, 2])));

        let second = cache.begin_fetch(&key, ApiRequest::get("/admin/users"));
        assert!(cache.get(&key).unwrap().is_fetching);
        cache.settle(second, Err("Network error".to_string()));

        let view = cache.get(&key).unwrap();
        assert_eq!(view.data, Some(json!([1, 2])));
        assert_eq!(view.error.as_deref(), Some("Network error"));
    }

    #[test]
    fn snapshot_restore_is_exact() {
        let cache = QueryCache::new();
        let a = users(1, None);
        let b = users(2, None);
        cache.set_data(&a, json!({"users": [{"id": "u1", "status": "ACTIVE"}]}));
        cache.subscribe(&b);

        let snapshot = cache.snapshot("users");
        cache.set_data(&a, json!({"users": []}));
        cache.set_data(&b, json!({"users": []}));
        cache.restore(snapshot.clone());

        assert_eq!(cache.snapshot("users"), snapshot);
        assert_eq!(cache.get(&b).unwrap().data, None);
    }

    #[test]
    fn invalidate_returns_only_subscribed_entries() {
        let cache = QueryCache::new();
        let active = users(1, None);
        let idle = users(2, None);

        let _sub = cache.subscribe(&active);
        let t1 = cache.begin_fetch(&active, ApiRequest::get("/admin/users").query("page", 1));
        cache.settle(t1, Ok(json!([])));
        let t2 = cache.begin_fetch(&idle, ApiRequest::get("/admin/users").query("page", 2));
        cache.settle(t2, Ok(json!([])));

        let refetch = cache.invalidate("users");
        assert_eq!(refetch.len(), 1);
        assert_eq!(refetch[0].0, active);
        assert!(cache.get(&idle).unwrap().is_stale);
    }

    #[test]
    fn gc_evicts_entries_after_last_subscription_drops() {
        let cache = QueryCache::new();
        let key = users(1, None);
        let first = cache.subscribe(&key);
        let second = cache.subscribe(&key);
        assert_eq!(cache.entries.read()[&key].subscribers, 2);

        drop(first);
        assert_eq!(cache.gc(), 0);
        drop(second);
        assert_eq!(cache.gc(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn subscribers_observe_changes() {
        let cache = QueryCache::new();
        let key = users(1, None);
        let mut sub = cache.subscribe(&key);

        let writer = cache.clone();
        let written = key.clone();
        tokio::spawn(async move {
            writer.set_data(&written, json!({"users": []}));
        });

        assert!(sub.changed().await);
        assert_eq!(cache.get(&key).unwrap().data, Some(json!({"users": []})));
    }
}
