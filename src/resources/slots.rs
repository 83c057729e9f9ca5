use serde_json::Value;

use super::{ListResource, json_request};
use crate::client::ApiRequest;
use crate::models::{RecurringSlotPayload, SingleSlotPayload};
use crate::query::{CacheStrategy, Mutation, MutationError, QueryClient};

pub const RESOURCE: &str = "slots";

pub const LIST: ListResource = ListResource {
    resource: RESOURCE,
    path: "/trainer/get-slots",
};

const NEW_SLOT: &str = "new-slot";

/// Slot writes also change the trainer's session counters.
pub fn slot_mutation(client: &QueryClient) -> Mutation {
    Mutation::new(client, &[RESOURCE, super::dashboard::TRAINER_RESOURCE])
}

pub async fn create(
    mutation: &Mutation,
    payload: &SingleSlotPayload,
) -> Result<Value, MutationError> {
    let request = json_request(ApiRequest::post("/trainer/slots"), payload)?;
    mutation.mutate(NEW_SLOT, request, CacheStrategy::Invalidate).await
}

pub async fn create_recurring(
    mutation: &Mutation,
    payload: &RecurringSlotPayload,
) -> Result<Value, MutationError> {
    let request = json_request(ApiRequest::post("/trainer/recurring-slots"), payload)?;
    mutation.mutate(NEW_SLOT, request, CacheStrategy::Invalidate).await
}

pub async fn delete(mutation: &Mutation, id: &str) -> Result<Value, MutationError> {
    mutation
        .mutate(
            id,
            ApiRequest::delete(format!("/trainer/slots/{}", id)),
            CacheStrategy::Invalidate,
        )
        .await
}

pub async fn cancel(mutation: &Mutation, id: &str) -> Result<Value, MutationError> {
    mutation
        .mutate(
            id,
            ApiRequest::patch(format!("/trainer/slots/{}/cancel", id)),
            CacheStrategy::Invalidate,
        )
        .await
}
