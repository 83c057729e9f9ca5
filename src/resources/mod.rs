//! One data-access module per backend resource: cache keys, read requests,
//! and the write operations with their cache strategy.

pub mod dashboard;
pub mod memberships;
pub mod sessions;
pub mod slots;
pub mod subscriptions;
pub mod trainer;
pub mod users;
pub mod verifications;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::CacheKey;
use crate::client::{ApiRequest, ClientError};
use crate::models::Paginated;
use crate::query::{Query, QueryClient, QueryOptions};

/// Parameter tuple of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn first_page(limit: u32) -> Self {
        ListParams {
            page: 1,
            limit,
            status: None,
            search: None,
        }
    }

    pub fn key(&self, resource: &str) -> CacheKey {
        CacheKey::new(resource)
            .param("page", self.page)
            .param("limit", self.limit)
            .param_opt("status", self.status.as_deref())
            .param_opt("search", self.search.as_deref())
    }

    pub fn request(&self, path: &str) -> ApiRequest {
        ApiRequest::get(path)
            .query("page", self.page)
            .query("limit", self.limit)
            .query_opt("status", self.status.as_deref())
            .query_opt("search", self.search.as_deref())
    }
}

/// A paginated backend listing: the cache resource it fills and its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListResource {
    pub resource: &'static str,
    pub path: &'static str,
}

impl ListResource {
    pub fn mount<T: DeserializeOwned>(
        &self,
        client: &QueryClient,
        params: &ListParams,
        options: &QueryOptions,
        previous: Option<&Query<Paginated<T>>>,
    ) -> Query<Paginated<T>> {
        Query::mount(
            client,
            params.key(self.resource),
            params.request(self.path),
            options,
            previous,
        )
    }
}

pub(crate) fn json_request<T: Serialize>(
    request: ApiRequest,
    body: &T,
) -> Result<ApiRequest, ClientError> {
    Ok(request.json(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_and_request_carry_the_same_tuple() {
        let params = ListParams {
            page: 3,
            limit: 10,
            status: Some("pending".to_string()),
            search: Some("".to_string()),
        };
        assert_eq!(
            params.key("verifications").to_string(),
            "verifications?limit=10&page=3&status=pending"
        );
        let request = params.request("/admin/verification");
        assert_eq!(request.query.len(), 3);
    }
}
