use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use super::QueryClient;
use crate::cache::{CacheKey, QueryCache, Snapshot};
use crate::client::{ApiRequest, ClientError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("A change to {0} is already in progress")]
    InFlight(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl MutationError {
    pub fn user_message(&self) -> String {
        match self {
            MutationError::InFlight(_) => self.to_string(),
            MutationError::Client(e) => e.user_message(),
        }
    }
}

/// Computes the expected post-mutation value of one cached entry.
pub trait OptimisticUpdate: Send + Sync {
    /// Returns `None` to leave the entry untouched.
    fn apply(&self, key: &CacheKey, cached: &Value) -> Option<Value>;
}

pub enum CacheStrategy {
    /// Refetch the affected resources after a successful write.
    Invalidate,
    /// Write the expected result first, roll back on failure, refetch on
    /// either outcome.
    Optimistic(Box<dyn OptimisticUpdate>),
}

/// Write wrapper for one group of resources.
///
/// Clones share the pending set, so a second write to the same entity is
/// refused while the first is in flight.
#[derive(Clone)]
pub struct Mutation {
    client: QueryClient,
    resources: Vec<&'static str>,
    pending: Arc<Mutex<HashSet<String>>>,
}

impl Mutation {
    pub fn new(client: &QueryClient, resources: &[&'static str]) -> Self {
        Mutation {
            client: client.clone(),
            resources: resources.to_vec(),
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn begin(&self, entity: &str) -> Result<PendingGuard, MutationError> {
        let mut pending = self.pending.lock();
        if !pending.insert(entity.to_string()) {
            return Err(MutationError::InFlight(entity.to_string()));
        }
        Ok(PendingGuard {
            pending: self.pending.clone(),
            entity: entity.to_string(),
        })
    }

    /// Performs one write against the backend.
    ///
    /// With [`CacheStrategy::Optimistic`] the speculative write is committed
    /// to the cache before the request is sent; the snapshot taken just
    /// before it is restored if the request fails.
    pub async fn mutate(
        &self,
        entity: &str,
        request: ApiRequest,
        strategy: CacheStrategy,
    ) -> Result<Value, MutationError> {
        let _pending = self.begin(entity)?;

        let speculation = match &strategy {
            CacheStrategy::Optimistic(update) => Some(self.speculate(update.as_ref())),
            CacheStrategy::Invalidate => None,
        };

        let result = self.client.transport().send(request).await;

        let optimistic = speculation.is_some();
        match (&result, speculation) {
            (Ok(_), Some(speculation)) => speculation.commit(),
            (Err(e), Some(speculation)) => {
                warn!("rolling back optimistic change to {}: {}", entity, e);
                drop(speculation);
            }
            _ => {}
        }

        if optimistic || result.is_ok() {
            for resource in &self.resources {
                self.client.invalidate(resource).await;
            }
        }

        result.map_err(MutationError::from)
    }

    /// Runs [`Mutation::mutate`] and invokes exactly one of the callbacks
    /// before handing the result back.
    pub async fn mutate_with<S, E>(
        &self,
        entity: &str,
        request: ApiRequest,
        strategy: CacheStrategy,
        on_success: S,
        on_error: E,
    ) -> Result<Value, MutationError>
    where
        S: FnOnce(&Value),
        E: FnOnce(&MutationError),
    {
        let result = self.mutate(entity, request, strategy).await;
        match &result {
            Ok(value) => on_success(value),
            Err(err) => on_error(err),
        }
        result
    }

    fn speculate(&self, update: &dyn OptimisticUpdate) -> Speculation {
        let cache = self.client.cache();
        let mut snapshots = Vec::with_capacity(self.resources.len());

        for resource in &self.resources {
            // In-flight reads would land on top of the speculative value.
            cache.cancel(resource);
            let snapshot = cache.snapshot(resource);
            for (key, data) in snapshot.entries() {
                if let Some(next) = data.as_ref().and_then(|d| update.apply(key, d)) {
                    debug!("optimistic write to {}", key);
                    cache.set_data(key, next);
                }
            }
            snapshots.push(snapshot);
        }

        Speculation {
            cache: cache.clone(),
            snapshots,
            committed: false,
        }
    }
}

struct PendingGuard {
    pending: Arc<Mutex<HashSet<String>>>,
    entity: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.entity);
    }
}

/// Pre-mutation values of every touched entry. Restored on drop unless
/// committed, so an abandoned or failed write never leaves speculative data
/// behind.
struct Speculation {
    cache: QueryCache,
    snapshots: Vec<Snapshot>,
    committed: bool,
}

impl Speculation {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Speculation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for snapshot in self.snapshots.drain(..) {
            self.cache.restore(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Method;
    use crate::query::testing::ScriptedTransport;
    use serde_json::json;

    struct MarkDone(&'static str);

    impl OptimisticUpdate for MarkDone {
        fn apply(&self, _key: &CacheKey, cached: &Value) -> Option<Value> {
            let mut next = cached.clone();
            let item = next
                .as_array_mut()?
                .iter_mut()
                .find(|item| item["id"] == self.0)?;
            item["done"] = json!(true);
            Some(next)
        }
    }

    fn setup() -> (ScriptedTransport, QueryClient, CacheKey) {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/tasks", |_| {
            Ok(json!([{"id": "t1", "done": false}, {"id": "t2", "done": false}]))
        });
        let client = QueryClient::new(Arc::new(transport.clone()));
        let key = CacheKey::new("tasks").param("page", 1);
        (transport, client, key)
    }

    #[tokio::test]
    async fn optimistic_value_is_visible_before_the_response() {
        let (transport, client, key) = setup();
        transport.on(Method::Patch, "/tasks/t1", |_| Ok(json!({})));
        let _sub = client.cache().subscribe(&key);
        client.fetch(&key, ApiRequest::get("/tasks")).await.unwrap();

        transport.hold();
        let mutation = Mutation::new(&client, &["tasks"]);
        let task = {
            let mutation = mutation.clone();
            tokio::spawn(async move {
                mutation
                    .mutate(
                        "t1",
                        ApiRequest::patch("/tasks/t1"),
                        CacheStrategy::Optimistic(Box::new(MarkDone("t1"))),
                    )
                    .await
            })
        };
        transport.wait_for(Method::Patch, "/tasks/t1", 1).await;

        let cached = client.cache().get(&key).unwrap().data.unwrap();
        assert_eq!(cached[0]["done"], json!(true));
        assert!(mutation.pending.lock().contains("t1"));

        transport.release();
        task.await.unwrap().unwrap();
        assert!(!mutation.pending.lock().contains("t1"));
    }

    #[tokio::test]
    async fn failed_write_restores_exact_bytes() {
        let (transport, client, key) = setup();
        transport.on(Method::Patch, "/tasks/t1", |_| {
            Err(ClientError::Rejected {
                status: 422,
                message: "Task locked".to_string(),
            })
        });
        client.fetch(&key, ApiRequest::get("/tasks")).await.unwrap();
        let before = serde_json::to_vec(&client.cache().get(&key).unwrap().data).unwrap();

        let err = Mutation::new(&client, &["tasks"])
            .mutate(
                "t1",
                ApiRequest::patch("/tasks/t1"),
                CacheStrategy::Optimistic(Box::new(MarkDone("t1"))),
            )
            .await
            .unwrap_err();

        let after = serde_json::to_vec(&client.cache().get(&key).unwrap().data).unwrap();
        assert_eq!(before, after);
        assert_eq!(err.user_message(), "Task locked");
    }

    #[tokio::test]
    async fn second_write_to_same_entity_is_refused_while_pending() {
        let (transport, client, _) = setup();
        transport.on(Method::Patch, "/tasks/t1", |_| Ok(json!({})));
        transport.hold();

        let mutation = Mutation::new(&client, &["tasks"]);
        let first = {
            let mutation = mutation.clone();
            tokio::spawn(async move {
                mutation
                    .mutate("t1", ApiRequest::patch("/tasks/t1"), CacheStrategy::Invalidate)
                    .await
            })
        };
        transport.wait_for(Method::Patch, "/tasks/t1", 1).await;

        let second = mutation
            .mutate("t1", ApiRequest::patch("/tasks/t1"), CacheStrategy::Invalidate)
            .await;
        assert_eq!(second, Err(MutationError::InFlight("t1".to_string())));

        transport.release();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(transport.count(Method::Patch, "/tasks/t1"), 1);
    }

    #[tokio::test]
    async fn invalidation_refetches_only_after_success() {
        let (transport, client, key) = setup();
        transport.once(
            Method::Patch,
            "/tasks/t2",
            Err(ClientError::Network("down".to_string())),
        );
        transport.on(Method::Patch, "/tasks/t2", |_| Ok(json!({})));
        let _sub = client.cache().subscribe(&key);
        client.fetch(&key, ApiRequest::get("/tasks")).await.unwrap();
        let mutation = Mutation::new(&client, &["tasks"]);

        let outcome = std::cell::Cell::new(None);
        let result = mutation
            .mutate_with(
                "t2",
                ApiRequest::patch("/tasks/t2"),
                CacheStrategy::Invalidate,
                |_| outcome.set(Some("success")),
                |_| outcome.set(Some("error")),
            )
            .await;
        assert_eq!(outcome.get(), Some("error"));
        assert!(result.is_err());
        assert_eq!(transport.count(Method::Get, "/tasks"), 1);

        mutation
            .mutate("t2", ApiRequest::patch("/tasks/t2"), CacheStrategy::Invalidate)
            .await
            .unwrap();
        assert_eq!(transport.count(Method::Get, "/tasks"), 2);
    }
}
