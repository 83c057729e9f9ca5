use serde_json::Value;

use super::{ListResource, json_request};
use crate::cache::CacheKey;
use crate::client::ApiRequest;
use crate::models::{StatusFilter, UpdateUserStatusDto, UserStatus, list_items_mut, remove_list_row};
use crate::query::{CacheStrategy, Mutation, MutationError, OptimisticUpdate, QueryClient};

pub const RESOURCE: &str = "users";

pub const LIST: ListResource = ListResource {
    resource: RESOURCE,
    path: "/admin/users",
};

pub fn status_mutation(client: &QueryClient) -> Mutation {
    Mutation::new(client, &[RESOURCE, super::dashboard::RESOURCE])
}

/// Speculative status change of one user across every cached user list.
///
/// Lists filtered by the old status lose the row and their counts shrink.
pub struct UserStatusChange {
    pub id: String,
    pub status: UserStatus,
}

impl OptimisticUpdate for UserStatusChange {
    fn apply(&self, key: &CacheKey, cached: &Value) -> Option<Value> {
        let mut next = cached.clone();
        let items = list_items_mut(&mut next)?;
        let index = items
            .iter()
            .position(|u| u.get("id").or_else(|| u.get("_id")).and_then(Value::as_str) == Some(self.id.as_str()))?;

        let filtered_out = key
            .get("status")
            .is_some_and(|filter| !filter.eq_ignore_ascii_case(self.status.as_str()));

        if filtered_out {
            remove_list_row(&mut next, index);
        } else {
            items[index]["status"] = Value::from(self.status.as_str());
        }
        Some(next)
    }
}

pub async fn update_status(
    mutation: &Mutation,
    id: &str,
    status: UserStatus,
) -> Result<Value, MutationError> {
    let request = json_request(
        ApiRequest::patch(format!("/admin/users/{}/status", id)),
        &UpdateUserStatusDto { status },
    )?;
    mutation
        .mutate(
            id,
            request,
            CacheStrategy::Optimistic(Box::new(UserStatusChange {
                id: id.to_string(),
                status,
            })),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cached() -> Value {
        json!({
            "users": [
                {"id": "u1", "name": "Asha", "email": "a@x.io", "status": "ACTIVE"},
                {"id": "u2", "name": "Ben", "email": "b@x.io", "status": "ACTIVE"}
            ],
            "pagination": {"page": 1, "limit": 2, "total": 3, "totalPages": 2}
        })
    }

    #[test]
    fn unfiltered_list_flips_the_row_in_place() {
        let change = UserStatusChange { id: "u2".to_string(), status: UserStatus::Blocked };
        let next = change
            .apply(&CacheKey::new("users").param("page", 1), &cached())
            .unwrap();
        assert_eq!(next["users"][1]["status"], json!("BLOCKED"));
        assert_eq!(next["pagination"]["total"], json!(3));
    }

    #[test]
    fn filtered_list_drops_the_row_and_recounts() {
        let change = UserStatusChange { id: "u1".to_string(), status: UserStatus::Blocked };
        let key = CacheKey::new("users").param("page", 1).param("status", "ACTIVE");
        let next = change.apply(&key, &cached()).unwrap();
        assert_eq!(next["users"].as_array().unwrap().len(), 1);
        assert_eq!(next["pagination"]["total"], json!(2));
        assert_eq!(next["pagination"]["totalPages"], json!(1));
    }

    #[test]
    fn lists_without_the_user_are_untouched() {
        let change = UserStatusChange { id: "u9".to_string(), status: UserStatus::Blocked };
        assert!(change.apply(&CacheKey::new("users"), &cached()).is_none());
    }
}
