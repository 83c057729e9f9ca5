use serde_json::Value;

use super::{ListResource, json_request};
use crate::client::ApiRequest;
use crate::models::{PlanInput, PlanStatus, UpdatePlanStatusDto};
use crate::query::{CacheStrategy, Mutation, MutationError, QueryClient};

pub const RESOURCE: &str = "plans";

pub const LIST: ListResource = ListResource {
    resource: RESOURCE,
    path: "/admin/subscription-plans",
};

/// Entity name used to gate concurrent plan creation.
const NEW_PLAN: &str = "new-plan";

pub fn plan_mutation(client: &QueryClient) -> Mutation {
    Mutation::new(client, &[RESOURCE])
}

pub async fn create(mutation: &Mutation, input: &PlanInput) -> Result<Value, MutationError> {
    let request = json_request(ApiRequest::post(LIST.path), input)?;
    mutation.mutate(NEW_PLAN, request, CacheStrategy::Invalidate).await
}

pub async fn update(
    mutation: &Mutation,
    id: &str,
    input: &PlanInput,
) -> Result<Value, MutationError> {
    let request = json_request(
        ApiRequest::patch(format!("{}/{}", LIST.path, id)),
        input,
    )?;
    mutation.mutate(id, request, CacheStrategy::Invalidate).await
}

/// Plans refresh after the write settles; no speculative update.
pub async fn update_status(
    mutation: &Mutation,
    id: &str,
    status: PlanStatus,
) -> Result<Value, MutationError> {
    let request = json_request(
        ApiRequest::patch(format!("{}/{}/status", LIST.path, id)),
        &UpdatePlanStatusDto { status },
    )?;
    mutation.mutate(id, request, CacheStrategy::Invalidate).await
}
