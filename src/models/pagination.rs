use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys the backend uses for the rows of a list response.
pub const LIST_ITEM_KEYS: &[&str] = &[
    "items",
    "users",
    "verifications",
    "plans",
    "memberships",
    "sessions",
    "slots",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default, alias = "pages")]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            limit: 0,
            total: 0,
            total_pages: 0,
        }
    }
}

pub fn total_pages(total: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit)) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paginated<T> {
    #[serde(
        alias = "users",
        alias = "verifications",
        alias = "plans",
        alias = "memberships",
        alias = "sessions",
        alias = "slots",
        default
    )]
    pub items: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Rows of a cached list response, whatever key the backend used.
pub fn list_items_mut(value: &mut Value) -> Option<&mut Vec<Value>> {
    let key = LIST_ITEM_KEYS
        .iter()
        .find(|k| value.get(**k).is_some_and(Value::is_array))?;
    value.get_mut(*key)?.as_array_mut()
}

/// Removes one row from a cached list response and keeps `total` and
/// `totalPages` consistent with the removal.
pub fn remove_list_row(value: &mut Value, index: usize) {
    let Some(items) = list_items_mut(value) else {
        return;
    };
    if index >= items.len() {
        return;
    }
    items.remove(index);

    let Some(pagination) = value.get_mut("pagination").and_then(Value::as_object_mut) else {
        return;
    };
    let total = pagination
        .get("total")
        .and_then(Value::as_u64)
        .unwrap_or(0)
        .saturating_sub(1);
    let limit = pagination
        .get("limit")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    pagination.insert("total".to_string(), Value::from(total));
    let pages_key = if pagination.contains_key("pages") {
        "pages"
    } else {
        "totalPages"
    };
    pagination.insert(pages_key.to_string(), Value::from(total_pages(total, limit)));
}
