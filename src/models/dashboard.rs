use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::StatusFilter;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_trainers: u64,
    pub active_memberships: u64,
    pub pending_verifications: u64,
    pub total_sessions: u64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChartPeriod {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl StatusFilter for ChartPeriod {
    const ALL: &'static [Self] = &[
        ChartPeriod::Daily,
        ChartPeriod::Weekly,
        ChartPeriod::Monthly,
        ChartPeriod::Yearly,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ChartPeriod::Daily => "daily",
            ChartPeriod::Weekly => "weekly",
            ChartPeriod::Monthly => "monthly",
            ChartPeriod::Yearly => "yearly",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartPoint {
    pub label: String,
    pub users: u64,
    pub trainers: u64,
    pub sessions: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardCharts {
    pub period: ChartPeriod,
    #[serde(alias = "data")]
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainerStats {
    pub total_sessions: u64,
    pub upcoming_sessions: u64,
    pub completed_sessions: u64,
    pub average_rating: Option<f32>,
    pub total_earnings: f64,
}
