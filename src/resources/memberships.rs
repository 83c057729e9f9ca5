use super::ListResource;

pub const RESOURCE: &str = "memberships";

pub const LIST: ListResource = ListResource {
    resource: RESOURCE,
    path: "/admin/memberships",
};
