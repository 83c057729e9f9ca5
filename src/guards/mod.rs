pub mod auth;

pub use auth::{AdminGuard, Operator, Role, TrainerGuard};
