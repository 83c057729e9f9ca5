use log::{info, warn};
use serde_json::Value;

use super::{ListResource, json_request};
use crate::cache::CacheKey;
use crate::client::ApiRequest;
use crate::models::{RejectVerificationDto, TrainerVerification};
use crate::query::{CacheStrategy, Mutation, MutationError, Query, QueryClient, QueryOptions};

pub const RESOURCE: &str = "verifications";

pub const LIST: ListResource = ListResource {
    resource: RESOURCE,
    path: "/admin/verification",
};

pub fn detail_key(id: &str) -> CacheKey {
    CacheKey::new("verifications/detail").param("id", id)
}

pub fn mount_detail(
    client: &QueryClient,
    id: &str,
    options: &QueryOptions,
) -> Query<TrainerVerification> {
    Query::mount(
        client,
        detail_key(id),
        ApiRequest::get(format!("/admin/verification/{}", id)),
        options,
        None,
    )
}

/// Review decisions also move the dashboard's pending counter.
pub fn review_mutation(client: &QueryClient) -> Mutation {
    Mutation::new(client, &[RESOURCE, super::dashboard::RESOURCE])
}

pub async fn approve(mutation: &Mutation, id: &str) -> Result<Value, MutationError> {
    mutation
        .mutate_with(
            id,
            ApiRequest::post(format!("/admin/verification/{}/approve", id)),
            CacheStrategy::Invalidate,
            |_| info!("verification {} approved", id),
            |e| warn!("approving verification {} failed: {}", id, e),
        )
        .await
}

pub async fn reject(mutation: &Mutation, id: &str, reason: &str) -> Result<Value, MutationError> {
    let request = json_request(
        ApiRequest::post(format!("/admin/verification/{}/reject", id)),
        &RejectVerificationDto {
            reason: reason.trim().to_string(),
        },
    )?;
    mutation
        .mutate_with(
            id,
            request,
            CacheStrategy::Invalidate,
            |_| info!("verification {} rejected", id),
            |e| warn!("rejecting verification {} failed: {}", id, e),
        )
        .await
}
