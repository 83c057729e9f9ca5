use chrono::{DateTime, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::QueryClient;
use crate::cache::{CacheKey, Subscription};
use crate::client::{ApiRequest, ClientError};

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Refetch on a fixed interval while the query is mounted.
    pub poll_interval: Option<Duration>,
    /// Serve the previously mounted query's data until this key settles.
    pub keep_previous_data: bool,
}

impl QueryOptions {
    pub fn paginated() -> Self {
        QueryOptions {
            poll_interval: None,
            keep_previous_data: true,
        }
    }

    pub fn polling(interval: Duration) -> Self {
        QueryOptions {
            poll_interval: Some(interval),
            keep_previous_data: false,
        }
    }

    pub fn with_polling(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    /// Nothing to show yet for this key: no data, no placeholder, no error.
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_error: bool,
    pub error: Option<String>,
    /// `data` belongs to the previously mounted key.
    pub is_placeholder: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A mounted read of one cache key.
///
/// Holding a `Query` keeps the key subscribed and, when configured, keeps a
/// polling task alive. Dropping it releases both.
pub struct Query<T> {
    client: QueryClient,
    key: CacheKey,
    request: ApiRequest,
    placeholder: Option<Value>,
    _subscription: Subscription,
    poller: Option<JoinHandle<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Query<T> {
    pub fn mount(
        client: &QueryClient,
        key: CacheKey,
        request: ApiRequest,
        options: &QueryOptions,
        previous: Option<&Query<T>>,
    ) -> Self {
        let placeholder = if options.keep_previous_data {
            previous.and_then(Query::current_value)
        } else {
            None
        };

        let subscription = client.cache().subscribe(&key);
        let poller = options
            .poll_interval
            .and_then(|period| spawn_poller(client, &key, &request, period));

        Query {
            client: client.clone(),
            key,
            request,
            placeholder,
            _subscription: subscription,
            poller,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    fn current_value(&self) -> Option<Value> {
        self.client
            .cache()
            .get(&self.key)
            .and_then(|entry| entry.data)
            .or_else(|| self.placeholder.clone())
    }

    pub fn state(&self) -> QueryState<T> {
        let entry = self.client.cache().get(&self.key);
        let is_fetching = entry.as_ref().is_some_and(|e| e.is_fetching);
        let mut error = entry.as_ref().and_then(|e| e.error.clone());
        let updated_at = entry.as_ref().and_then(|e| e.updated_at);

        // Once this key has failed, the error panel replaces the placeholder.
        let (value, is_placeholder) = match entry.and_then(|e| e.data) {
            Some(value) => (Some(value), false),
            None if error.is_some() => (None, false),
            None => (self.placeholder.clone(), self.placeholder.is_some()),
        };

        let data = match value.map(serde_json::from_value::<T>) {
            Some(Ok(data)) => Some(data),
            Some(Err(e)) => {
                error = Some(format!("Invalid response: {}", e));
                None
            }
            None => None,
        };

        QueryState {
            is_loading: data.is_none() && error.is_none(),
            is_fetching,
            is_error: error.is_some(),
            error,
            data,
            is_placeholder,
            updated_at,
        }
    }

    /// Fetches when the key has no data yet or has been invalidated.
    pub async fn ensure(&self) -> Result<(), ClientError> {
        let needs_fetch = match self.client.cache().get(&self.key) {
            Some(entry) => entry.data.is_none() || entry.is_stale,
            None => true,
        };
        if needs_fetch {
            self.refetch().await?;
        }
        Ok(())
    }

    pub async fn refetch(&self) -> Result<(), ClientError> {
        self.client
            .fetch(&self.key, self.request.clone())
            .await
            .map(|_| ())
    }
}

impl<T> Drop for Query<T> {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

fn spawn_poller(
    client: &QueryClient,
    key: &CacheKey,
    request: &ApiRequest,
    period: Duration,
) -> Option<JoinHandle<()>> {
    let Ok(runtime) = Handle::try_current() else {
        debug!("no runtime, polling disabled for {}", key);
        return None;
    };

    let client = client.clone();
    let key = key.clone();
    let request = request.clone();
    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the mount itself does the initial fetch.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = client.fetch(&key, request.clone()).await {
                debug!("poll of {} failed: {}", key, e);
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Method;
    use crate::query::testing::ScriptedTransport;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Stats {
        total: u32,
    }

    fn setup() -> (ScriptedTransport, QueryClient) {
        let transport = ScriptedTransport::new();
        let client = QueryClient::new(Arc::new(transport.clone()));
        (transport, client)
    }

    #[tokio::test]
    async fn loading_only_until_first_data() {
        let (transport, client) = setup();
        transport.on(Method::Get, "/stats", |_| Ok(json!({"total": 3})));

        let query: Query<Stats> = Query::mount(
            &client,
            CacheKey::new("stats"),
            ApiRequest::get("/stats"),
            &QueryOptions::default(),
            None,
        );
        assert!(query.state().is_loading);

        query.ensure().await.unwrap();
        let state = query.state();
        assert!(!state.is_loading);
        assert_eq!(state.data, Some(Stats { total: 3 }));

        // A background refetch that fails keeps the data on screen.
        transport.once(
            Method::Get,
            "/stats",
            Err(ClientError::Network("reset".to_string())),
        );
        assert!(query.refetch().await.is_err());
        let state = query.state();
        assert!(!state.is_loading);
        assert!(state.is_error);
        assert_eq!(state.data, Some(Stats { total: 3 }));
    }

    #[tokio::test]
    async fn ensure_skips_fresh_entries() {
        let (transport, client) = setup();
        transport.on(Method::Get, "/stats", |_| Ok(json!({"total": 1})));

        let query: Query<Stats> = Query::mount(
            &client,
            CacheKey::new("stats"),
            ApiRequest::get("/stats"),
            &QueryOptions::default(),
            None,
        );
        query.ensure().await.unwrap();
        query.ensure().await.unwrap();
        assert_eq!(transport.count(Method::Get, "/stats"), 1);

        client.cache().invalidate("stats");
        query.ensure().await.unwrap();
        assert_eq!(transport.count(Method::Get, "/stats"), 2);
    }

    #[tokio::test]
    async fn previous_data_is_kept_while_next_page_loads() {
        let (transport, client) = setup();
        transport.on(Method::Get, "/stats", |req| {
            let page: u32 = req.query[0].1.parse().unwrap();
            Ok(json!({"total": page * 10}))
        });

        let first: Query<Stats> = Query::mount(
            &client,
            CacheKey::new("stats").param("page", 1),
            ApiRequest::get("/stats").query("page", 1),
            &QueryOptions::paginated(),
            None,
        );
        first.ensure().await.unwrap();

        let second: Query<Stats> = Query::mount(
            &client,
            CacheKey::new("stats").param("page", 2),
            ApiRequest::get("/stats").query("page", 2),
            &QueryOptions::paginated(),
            Some(&first),
        );
        drop(first);

        let state = second.state();
        assert!(!state.is_loading);
        assert!(state.is_placeholder);
        assert_eq!(state.data, Some(Stats { total: 10 }));

        second.ensure().await.unwrap();
        let state = second.state();
        assert!(!state.is_placeholder);
        assert_eq!(state.data, Some(Stats { total: 20 }));
    }

    #[tokio::test]
    async fn undecodable_data_is_an_error_state() {
        let (transport, client) = setup();
        transport.on(Method::Get, "/stats", |_| Ok(json!({"total": "many"})));

        let query: Query<Stats> = Query::mount(
            &client,
            CacheKey::new("stats"),
            ApiRequest::get("/stats"),
            &QueryOptions::default(),
            None,
        );
        query.ensure().await.unwrap();
        let state = query.state();
        assert!(state.is_error);
        assert!(!state.is_loading);
        assert!(state.data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_refetches_and_stops_on_drop() {
        let (transport, client) = setup();
        transport.on(Method::Get, "/stats", |_| Ok(json!({"total": 1})));

        let query: Query<Stats> = Query::mount(
            &client,
            CacheKey::new("stats"),
            ApiRequest::get("/stats"),
            &QueryOptions::polling(Duration::from_secs(10)),
            None,
        );
        query.ensure().await.unwrap();
        assert!(query.poller.is_some());

        tokio::time::sleep(Duration::from_secs(25)).await;
        let polled = transport.count(Method::Get, "/stats");
        assert!(polled >= 3, "expected two polls after the initial fetch, got {}", polled);

        drop(query);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.count(Method::Get, "/stats"), polled);
    }
}
