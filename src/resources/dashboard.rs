use crate::cache::CacheKey;
use crate::client::ApiRequest;
use crate::models::{ChartPeriod, DashboardCharts, DashboardStats, StatusFilter, TrainerStats};
use crate::query::{Query, QueryClient, QueryOptions};

pub const RESOURCE: &str = "dashboard";
pub const TRAINER_RESOURCE: &str = "trainer-dashboard";

pub fn mount_stats(client: &QueryClient) -> Query<DashboardStats> {
    Query::mount(
        client,
        CacheKey::new("dashboard/stats"),
        ApiRequest::get("/admin/dashboard/stats"),
        &QueryOptions::default(),
        None,
    )
}

pub fn charts_key(period: ChartPeriod) -> CacheKey {
    CacheKey::new("dashboard/charts").param("period", period.as_str())
}

pub fn mount_charts(
    client: &QueryClient,
    period: ChartPeriod,
    previous: Option<&Query<DashboardCharts>>,
) -> Query<DashboardCharts> {
    Query::mount(
        client,
        charts_key(period),
        ApiRequest::get("/admin/dashboard/charts").query("period", period.as_str()),
        &QueryOptions::paginated(),
        previous,
    )
}

pub fn mount_trainer_stats(client: &QueryClient) -> Query<TrainerStats> {
    Query::mount(
        client,
        CacheKey::new(TRAINER_RESOURCE),
        ApiRequest::get("/trainer/dashboard/stats"),
        &QueryOptions::default(),
        None,
    )
}
