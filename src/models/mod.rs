pub mod dashboard;
pub mod membership;
pub mod pagination;
pub mod session;
pub mod slot;
pub mod subscription;
pub mod trainer;
pub mod user;
pub mod verification;
pub mod wallet;

pub use dashboard::*;
pub use membership::*;
pub use pagination::*;
pub use session::*;
pub use slot::*;
pub use subscription::*;
pub use trainer::*;
pub use user::*;
pub use verification::*;
pub use wallet::*;

/// Status enums that double as list filters.
pub trait StatusFilter: Sized + Copy + 'static {
    const ALL: &'static [Self];

    /// Wire value used in payloads and query strings.
    fn as_str(&self) -> &'static str;

    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}
