//! Data-access layer: query and mutation wrappers over the cache and the
//! transport.

mod mutation;
mod query;

pub use mutation::{CacheStrategy, Mutation, MutationError, OptimisticUpdate};
pub use query::{Query, QueryOptions};

use log::debug;
use serde_json::Value;
use std::sync::Arc;

use crate::cache::{CacheKey, QueryCache};
use crate::client::{ApiRequest, ClientError, Transport};

/// Cache plus transport; cheap to clone, shared by every wrapper of one
/// console session.
#[derive(Clone)]
pub struct QueryClient {
    cache: QueryCache,
    transport: Arc<dyn Transport>,
}

impl QueryClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        QueryClient {
            cache: QueryCache::new(),
            transport,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Fetches `request` into the entry for `key`. The result is written only
    /// to that key, so a superseded parameter tuple cannot clobber the
    /// current one.
    pub async fn fetch(&self, key: &CacheKey, request: ApiRequest) -> Result<Value, ClientError> {
        let ticket = self.cache.begin_fetch(key, request.clone());
        let result = self.transport.send(request).await;
        let applied = self
            .cache
            .settle(ticket, result.clone().map_err(|e| e.user_message()));
        if !applied {
            debug!("discarded superseded response for {}", key);
        }
        result
    }

    /// Marks `resource` stale and refetches the entries someone is watching.
    pub async fn invalidate(&self, resource: &str) {
        for (key, request) in self.cache.invalidate(resource) {
            // Errors land in the entry; the owning view renders them.
            let _ = self.fetch(&key, request).await;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use crate::client::Method;
    use serde_json::json;

    #[tokio::test]
    async fn fetch_writes_to_its_own_key_only() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/admin/users", |req| {
            Ok(json!({"page": req.query[0].1.clone()}))
        });
        let client = QueryClient::new(Arc::new(transport));

        let page1 = CacheKey::new("users").param("page", 1);
        let page2 = CacheKey::new("users").param("page", 2);
        client
            .fetch(&page2, ApiRequest::get("/admin/users").query("page", 2))
            .await
            .unwrap();

        assert!(client.cache().get(&page1).is_none());
        assert_eq!(
            client.cache().get(&page2).unwrap().data,
            Some(json!({"page": "2"}))
        );
    }

    #[tokio::test]
    async fn invalidate_refetches_subscribed_entries() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/admin/subscription-plans", |_| Ok(json!({"plans": []})));
        let client = QueryClient::new(Arc::new(transport.clone()));

        let key = CacheKey::new("plans").param("page", 1);
        let _sub = client.cache().subscribe(&key);
        client
            .fetch(&key, ApiRequest::get("/admin/subscription-plans"))
            .await
            .unwrap();

        client.invalidate("plans").await;

        assert_eq!(transport.count(Method::Get, "/admin/subscription-plans"), 2);
        assert!(!client.cache().get(&key).unwrap().is_stale);
    }
}
