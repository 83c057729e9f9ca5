use super::ListResource;
use crate::cache::CacheKey;
use crate::client::ApiRequest;
use crate::models::TrainingSession;
use crate::query::{Query, QueryClient, QueryOptions};

pub const RESOURCE: &str = "sessions";

pub const ADMIN_LIST: ListResource = ListResource {
    resource: RESOURCE,
    path: "/admin/sessions",
};

pub const TRAINER_LIST: ListResource = ListResource {
    resource: "trainer-sessions",
    path: "/trainer/sessions",
};

pub fn detail_key(id: &str) -> CacheKey {
    CacheKey::new("sessions/detail").param("id", id)
}

pub fn mount_detail(client: &QueryClient, id: &str) -> Query<TrainingSession> {
    Query::mount(
        client,
        detail_key(id),
        ApiRequest::get(format!("/admin/sessions/{}", id)),
        &QueryOptions::default(),
        None,
    )
}
