use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::StatusFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
}

impl StatusFilter for MembershipStatus {
    const ALL: &'static [Self] = &[
        MembershipStatus::Active,
        MembershipStatus::Trialing,
        MembershipStatus::PastDue,
        MembershipStatus::Canceled,
        MembershipStatus::Incomplete,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Trialing => "trialing",
            MembershipStatus::PastDue => "past_due",
            MembershipStatus::Canceled => "canceled",
            MembershipStatus::Incomplete => "incomplete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub plan_name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub duration_months: Option<u32>,
    pub status: MembershipStatus,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn past_due_parses_from_snake_case() {
        let m: Membership = serde_json::from_value(json!({
            "id": "m1",
            "userName": "Ravi",
            "planName": "Pro Monthly",
            "price": 49.0,
            "durationMonths": 1,
            "status": "past_due",
            "currentPeriodEnd": "2026-03-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(m.status, MembershipStatus::PastDue);
        assert_eq!(MembershipStatus::parse("PAST_DUE"), Some(MembershipStatus::PastDue));
    }
}
