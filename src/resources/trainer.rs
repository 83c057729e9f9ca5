use serde_json::Value;
use std::time::Duration;

use crate::cache::CacheKey;
use crate::client::{ApiRequest, FormPart, Upload};
use crate::models::{TrainerProfile, TrainerVerification, VerificationSubmission, Wallet};
use crate::query::{CacheStrategy, Mutation, MutationError, Query, QueryClient, QueryOptions};

pub const PROFILE_RESOURCE: &str = "trainer-profile";
pub const VERIFICATION_RESOURCE: &str = "trainer-verification";
pub const WALLET_RESOURCE: &str = "trainer-wallet";

pub fn mount_profile(client: &QueryClient, poll: Duration) -> Query<TrainerProfile> {
    Query::mount(
        client,
        CacheKey::new(PROFILE_RESOURCE),
        ApiRequest::get("/trainer/profile"),
        &QueryOptions::polling(poll),
        None,
    )
}

/// The trainer's own verification request; `None` until one is submitted.
pub fn mount_verification(
    client: &QueryClient,
    poll: Duration,
) -> Query<Option<TrainerVerification>> {
    Query::mount(
        client,
        CacheKey::new(VERIFICATION_RESOURCE),
        ApiRequest::get("/trainer/verification"),
        &QueryOptions::polling(poll),
        None,
    )
}

pub fn mount_wallet(client: &QueryClient) -> Query<Wallet> {
    Query::mount(
        client,
        CacheKey::new(WALLET_RESOURCE),
        ApiRequest::get("/trainer/wallet"),
        &QueryOptions::default(),
        None,
    )
}

pub fn profile_mutation(client: &QueryClient) -> Mutation {
    Mutation::new(client, &[PROFILE_RESOURCE])
}

pub fn verification_mutation(client: &QueryClient) -> Mutation {
    Mutation::new(client, &[VERIFICATION_RESOURCE, PROFILE_RESOURCE])
}

/// Fields of a profile edit, already validated.
pub struct ProfileChanges {
    pub name: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub image: Option<Upload>,
}

pub async fn update_profile(
    mutation: &Mutation,
    changes: ProfileChanges,
) -> Result<Value, MutationError> {
    let mut parts = vec![FormPart::text("name", changes.name)];
    if let Some(phone) = changes.phone {
        parts.push(FormPart::text("phone", phone));
    }
    if let Some(bio) = changes.bio {
        parts.push(FormPart::text("bio", bio));
    }
    if let Some(image) = changes.image {
        parts.push(FormPart::file("profileImage", image));
    }

    mutation
        .mutate(
            "profile",
            ApiRequest::patch("/trainer/profile-update").multipart(parts),
            CacheStrategy::Invalidate,
        )
        .await
}

pub async fn submit_verification(
    mutation: &Mutation,
    submission: VerificationSubmission,
) -> Result<Value, MutationError> {
    mutation
        .mutate(
            "verification",
            ApiRequest::post("/trainer/verification").multipart(submission.into_parts()),
            CacheStrategy::Invalidate,
        )
        .await
}
