use chrono::{DateTime, Utc};
use log::debug;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{Paginated, Pagination, StatusFilter};
use crate::query::{Query, QueryClient, QueryOptions};
use crate::resources::{ListParams, ListResource};

/// Page, status filter and search term of one listing.
///
/// The search box has a draft that only becomes part of the parameter
/// tuple on [`ListControls::commit_search`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListControls<S> {
    page: u32,
    limit: u32,
    status: Option<S>,
    draft_search: String,
    search: Option<String>,
    /// `totalPages` of the last response for this filter and search.
    last_page: Option<u32>,
}

impl<S: StatusFilter + PartialEq> ListControls<S> {
    pub fn new(limit: u32) -> Self {
        ListControls {
            page: 1,
            limit: limit.max(1),
            status: None,
            draft_search: String::new(),
            search: None,
            last_page: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn status(&self) -> Option<S> {
        self.status
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn draft_search(&self) -> &str {
        &self.draft_search
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Stays put on the last known page.
    pub fn next_page(&mut self) {
        if self.last_page.is_some_and(|last| self.page >= last) {
            return;
        }
        self.page = self.page.saturating_add(1);
    }

    pub fn set_last_page(&mut self, total_pages: u32) {
        self.last_page = Some(total_pages);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    /// A different filter starts over at page 1.
    pub fn set_status(&mut self, status: Option<S>) {
        if self.status != status {
            self.status = status;
            self.page = 1;
            self.last_page = None;
        }
    }

    /// Parses a filter value from the front end; blank or `all` clears it.
    pub fn set_status_str(&mut self, value: Option<&str>) -> Result<(), String> {
        let status = match value.map(str::trim) {
            None | Some("") => None,
            Some(v) if v.eq_ignore_ascii_case("all") => None,
            Some(v) => Some(S::parse(v).ok_or_else(|| format!("Unknown status filter: {}", v))?),
        };
        self.set_status(status);
        Ok(())
    }

    pub fn set_draft_search(&mut self, text: impl Into<String>) {
        self.draft_search = text.into();
    }

    /// Promotes the draft to the committed term. Returns true when the term
    /// changed, which also resets the page.
    pub fn commit_search(&mut self) -> bool {
        let term = self.draft_search.trim();
        let next = (!term.is_empty()).then(|| term.to_string());
        if next == self.search {
            return false;
        }
        self.search = next;
        self.page = 1;
        self.last_page = None;
        true
    }

    pub fn clear_search(&mut self) -> bool {
        self.draft_search.clear();
        self.commit_search()
    }

    /// Applies `command`; `Retry` leaves the controls as they are.
    pub fn apply(&mut self, command: &ListCommand) -> Result<(), String> {
        match command {
            ListCommand::SetPage { page } => self.set_page(*page),
            ListCommand::NextPage => self.next_page(),
            ListCommand::PrevPage => self.prev_page(),
            ListCommand::SetStatus { status } => self.set_status_str(status.as_deref())?,
            ListCommand::Draft { text } => self.set_draft_search(text.clone()),
            ListCommand::CommitSearch => {
                self.commit_search();
            }
            ListCommand::ClearSearch => {
                self.clear_search();
            }
            ListCommand::Retry => {}
        }
        Ok(())
    }

    pub fn params(&self) -> ListParams {
        ListParams {
            page: self.page,
            limit: self.limit,
            status: self.status.map(|s| s.as_str().to_string()),
            search: self.search.clone(),
        }
    }
}

/// One interaction with a listing's controls.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ListCommand {
    SetPage { page: u32 },
    NextPage,
    PrevPage,
    SetStatus { status: Option<String> },
    /// Typing in the search box; does not refetch.
    Draft { text: String },
    CommitSearch,
    ClearSearch,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationView {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub can_prev: bool,
    pub can_next: bool,
}

impl PaginationView {
    /// `page` is the requested page; the response may be a placeholder for
    /// a different one.
    pub fn new(page: u32, limit: u32, pagination: &Pagination) -> Self {
        PaginationView {
            page,
            limit,
            total: pagination.total,
            total_pages: pagination.total_pages,
            can_prev: page > 1,
            can_next: page < pagination.total_pages,
        }
    }
}

/// What the front end renders for a listing. Failed loads come back here
/// as `isError` with `canRetry`, never as a failed request.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListView<T> {
    pub items: Vec<T>,
    pub pagination: PaginationView,
    pub status: Option<String>,
    pub search: Option<String>,
    pub draft_search: String,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_placeholder: bool,
    pub is_error: bool,
    pub error: Option<String>,
    pub can_retry: bool,
    /// When the shown rows were last fetched for this tuple.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A mounted listing: controls plus the query for their current tuple.
pub struct ListPage<T, S> {
    resource: ListResource,
    options: QueryOptions,
    controls: ListControls<S>,
    query: Option<Query<Paginated<T>>>,
}

impl<T: DeserializeOwned, S: StatusFilter + PartialEq> ListPage<T, S> {
    pub fn new(resource: ListResource, limit: u32, options: QueryOptions) -> Self {
        ListPage {
            resource,
            options,
            controls: ListControls::new(limit),
            query: None,
        }
    }

    pub fn controls(&self) -> &ListControls<S> {
        &self.controls
    }

    /// Remounts when the controls point at a different key. The outgoing
    /// query is dropped only after the new one has taken its data as a
    /// placeholder, and only a page change of the same filter and search
    /// keeps it.
    fn sync(&mut self, client: &QueryClient) {
        let params = self.controls.params();
        let key = params.key(self.resource.resource);
        if self.query.as_ref().is_some_and(|q| q.key() == &key) {
            return;
        }
        let previous = self.query.as_ref().filter(|q| {
            q.key().get("status") == key.get("status") && q.key().get("search") == key.get("search")
        });
        self.query = Some(self.resource.mount(client, &params, &self.options, previous));
    }

    /// Drops the query, and with it any polling. The controls are kept for
    /// the next visit.
    pub fn unmount(&mut self) {
        self.query = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.query.is_some()
    }

    fn record_bounds(&mut self) {
        let Some(state) = self.query.as_ref().map(Query::state) else {
            return;
        };
        if let (Some(list), false) = (state.data, state.is_placeholder) {
            self.controls.set_last_page(list.pagination.total_pages);
        }
    }

    pub async fn load(&mut self, client: &QueryClient) -> ListView<T> {
        self.sync(client);
        if let Some(query) = &self.query {
            if let Err(e) = query.ensure().await {
                debug!("{} list load failed: {}", self.resource.resource, e);
            }
        }
        self.record_bounds();
        self.view()
    }

    /// Refetches the current tuple even if it is fresh.
    pub async fn retry(&mut self, client: &QueryClient) -> ListView<T> {
        self.sync(client);
        if let Some(query) = &self.query {
            if let Err(e) = query.refetch().await {
                debug!("{} list retry failed: {}", self.resource.resource, e);
            }
        }
        self.record_bounds();
        self.view()
    }

    /// Applies a control command and renders the resulting page.
    pub async fn handle(&mut self, client: &QueryClient, command: &ListCommand) -> Result<ListView<T>, String> {
        self.controls.apply(command)?;
        Ok(match command {
            ListCommand::Retry => self.retry(client).await,
            _ => self.load(client).await,
        })
    }

    pub fn view(&self) -> ListView<T> {
        let page = self.controls.page;
        let limit = self.controls.limit;
        let state = self.query.as_ref().map(Query::state);

        let updated_at = state.as_ref().and_then(|s| s.updated_at);
        let (items, pagination, flags) = match state {
            Some(state) => {
                let (items, pagination) = match state.data {
                    Some(list) => (list.items, list.pagination),
                    None => (Vec::new(), Pagination::default()),
                };
                (
                    items,
                    pagination,
                    (state.is_loading, state.is_fetching, state.is_placeholder, state.error),
                )
            }
            None => (Vec::new(), Pagination::default(), (true, false, false, None)),
        };
        let (is_loading, is_fetching, is_placeholder, error) = flags;

        ListView {
            items,
            pagination: PaginationView::new(page, limit, &pagination),
            status: self.controls.status.map(|s| s.as_str().to_string()),
            search: self.controls.search.clone(),
            draft_search: self.controls.draft_search.clone(),
            is_loading,
            is_fetching,
            is_placeholder,
            is_error: error.is_some(),
            can_retry: error.is_some(),
            error,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Method;
    use crate::models::{User, UserStatus};
    use crate::query::testing::ScriptedTransport;
    use crate::resources::users;
    use serde_json::json;
    use std::sync::Arc;

    fn page_of_users(req: &crate::client::ApiRequest) -> serde_json::Value {
        let page: u32 = req
            .query
            .iter()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(1);
        let users = if page <= 3 {
            json!([{"id": format!("u{}", page), "name": "Asha", "email": "a@x.io", "status": "ACTIVE"}])
        } else {
            json!([])
        };
        json!({
            "users": users,
            "pagination": {"page": page, "limit": 1, "total": 3, "totalPages": 3}
        })
    }

    #[test]
    fn filter_and_search_changes_reset_the_page() {
        let mut controls: ListControls<UserStatus> = ListControls::new(10);
        controls.set_page(3);
        controls.set_status(Some(UserStatus::Blocked));
        assert_eq!(controls.page(), 1);

        controls.set_page(3);
        controls.set_draft_search("asha");
        assert_eq!(controls.page(), 3);
        assert_eq!(controls.params().search, None);

        assert!(controls.commit_search());
        assert_eq!(controls.page(), 1);
        assert_eq!(controls.params().search.as_deref(), Some("asha"));

        controls.set_page(2);
        controls.set_draft_search("  asha ");
        assert!(!controls.commit_search());
        assert_eq!(controls.page(), 2);
    }

    #[test]
    fn page_zero_is_coerced_and_filters_are_checked() {
        let mut controls: ListControls<UserStatus> = ListControls::new(10);
        controls.set_page(0);
        assert_eq!(controls.page(), 1);
        controls.prev_page();
        assert_eq!(controls.page(), 1);

        assert!(controls.set_status_str(Some("archived")).is_err());
        controls.set_status_str(Some("blocked")).unwrap();
        assert_eq!(controls.status(), Some(UserStatus::Blocked));
        controls.set_status_str(Some("all")).unwrap();
        assert_eq!(controls.status(), None);
    }

    #[test]
    fn commands_drive_the_controls() {
        let mut controls: ListControls<UserStatus> = ListControls::new(10);
        controls.apply(&ListCommand::SetPage { page: 4 }).unwrap();
        controls.apply(&ListCommand::PrevPage).unwrap();
        assert_eq!(controls.page(), 3);

        let command: ListCommand =
            serde_json::from_value(json!({"action": "setStatus", "status": "ACTIVE"})).unwrap();
        controls.apply(&command).unwrap();
        assert_eq!(controls.page(), 1);
        assert_eq!(controls.status(), Some(UserStatus::Active));

        let bad = ListCommand::SetStatus { status: Some("deleted".to_string()) };
        assert!(controls.apply(&bad).is_err());
    }

    #[tokio::test]
    async fn pagination_bounds_and_past_the_end() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/admin/users", |req| Ok(page_of_users(req)));
        let client = QueryClient::new(Arc::new(transport));
        let mut page: ListPage<User, UserStatus> =
            ListPage::new(users::LIST, 1, QueryOptions::paginated());

        let view = page.load(&client).await;
        assert!(!view.pagination.can_prev);
        assert!(view.pagination.can_next);

        page.controls.set_page(3);
        let view = page.load(&client).await;
        assert!(view.pagination.can_prev);
        assert!(!view.pagination.can_next);

        page.controls.set_page(7);
        let view = page.load(&client).await;
        assert!(view.items.is_empty());
        assert!(!view.is_error);
        assert!(!view.pagination.can_next);
    }

    #[tokio::test]
    async fn next_page_stops_at_the_last_page() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/admin/users", |_| {
            Ok(json!({
                "users": [{"id": "u1", "name": "Asha", "email": "a@x.io", "status": "ACTIVE"}],
                "pagination": {"page": 1, "limit": 10, "total": 1, "totalPages": 1}
            }))
        });
        let client = QueryClient::new(Arc::new(transport.clone()));
        let mut page: ListPage<User, UserStatus> =
            ListPage::new(users::LIST, 10, QueryOptions::paginated());

        let view = page.load(&client).await;
        assert!(!view.pagination.can_next);

        page.handle(&client, &ListCommand::NextPage).await.unwrap();
        let view = page.handle(&client, &ListCommand::NextPage).await.unwrap();
        assert_eq!(view.pagination.page, 1);
        assert_eq!(view.items.len(), 1);
        assert_eq!(transport.count(Method::Get, "/admin/users"), 1);
        assert!(transport
            .requests()
            .iter()
            .all(|r| r.query.contains(&("page".to_string(), "1".to_string()))));
    }

    #[tokio::test]
    async fn next_page_walks_until_total_pages() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/admin/users", |req| Ok(page_of_users(req)));
        let client = QueryClient::new(Arc::new(transport));
        let mut page: ListPage<User, UserStatus> =
            ListPage::new(users::LIST, 1, QueryOptions::paginated());

        page.load(&client).await;
        for _ in 0..5 {
            page.handle(&client, &ListCommand::NextPage).await.unwrap();
        }
        let view = page.view();
        assert_eq!(view.pagination.page, 3);
        assert_eq!(view.items[0].id, "u3");
    }

    #[tokio::test]
    async fn failed_fetch_under_a_new_filter_shows_no_old_rows() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/admin/users", |req| Ok(page_of_users(req)));
        let client = QueryClient::new(Arc::new(transport.clone()));
        let mut page: ListPage<User, UserStatus> =
            ListPage::new(users::LIST, 1, QueryOptions::paginated());
        page.load(&client).await;

        // Until the new filter settles nothing from the old one is shown.
        page.controls.set_status(Some(UserStatus::Blocked));
        page.sync(&client);
        let pending = page.view();
        assert!(pending.items.is_empty());
        assert!(!pending.is_placeholder);

        transport.once(
            Method::Get,
            "/admin/users",
            Err(crate::client::ClientError::Network("reset".to_string())),
        );
        let view = page.load(&client).await;
        assert_eq!(view.status.as_deref(), Some("BLOCKED"));
        assert!(view.is_error);
        assert!(!view.is_placeholder);
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn failed_next_page_drops_the_placeholder() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/admin/users", |req| Ok(page_of_users(req)));
        let client = QueryClient::new(Arc::new(transport.clone()));
        let mut page: ListPage<User, UserStatus> =
            ListPage::new(users::LIST, 1, QueryOptions::paginated());
        page.load(&client).await;

        page.controls.next_page();
        page.sync(&client);
        let view = page.view();
        assert!(view.is_placeholder);
        assert_eq!(view.items[0].id, "u1");

        transport.once(
            Method::Get,
            "/admin/users",
            Err(crate::client::ClientError::Network("reset".to_string())),
        );
        let view = page.load(&client).await;
        assert!(view.is_error);
        assert!(!view.is_placeholder);
        assert!(view.items.is_empty());
    }

    #[test]
    fn a_new_filter_forgets_the_page_bound() {
        let mut controls: ListControls<UserStatus> = ListControls::new(10);
        controls.set_last_page(1);
        controls.next_page();
        assert_eq!(controls.page(), 1);

        controls.set_status(Some(UserStatus::Active));
        controls.next_page();
        assert_eq!(controls.page(), 2);
    }

    #[tokio::test]
    async fn failed_load_is_rendered_with_retry() {
        let transport = ScriptedTransport::new();
        transport.once(
            Method::Get,
            "/admin/users",
            Err(crate::client::ClientError::Network("refused".to_string())),
        );
        transport.on(Method::Get, "/admin/users", |req| Ok(page_of_users(req)));
        let client = QueryClient::new(Arc::new(transport));
        let mut page: ListPage<User, UserStatus> =
            ListPage::new(users::LIST, 1, QueryOptions::paginated());

        let view = page.load(&client).await;
        assert!(view.is_error);
        assert!(view.can_retry);
        assert!(view.items.is_empty());

        let view = page.retry(&client).await;
        assert!(!view.is_error);
        assert_eq!(view.items.len(), 1);
    }

    #[tokio::test]
    async fn draft_search_does_not_refetch() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/admin/users", |req| Ok(page_of_users(req)));
        let client = QueryClient::new(Arc::new(transport.clone()));
        let mut page: ListPage<User, UserStatus> =
            ListPage::new(users::LIST, 1, QueryOptions::paginated());

        page.load(&client).await;
        page.controls.set_draft_search("as");
        let view = page.load(&client).await;
        assert_eq!(view.draft_search, "as");
        assert_eq!(transport.count(Method::Get, "/admin/users"), 1);

        page.controls.commit_search();
        page.load(&client).await;
        let last = transport.requests().pop().unwrap();
        assert!(last.query.contains(&("search".to_string(), "as".to_string())));
    }
}
