use log::{error, info};
use rocket::fairing::AdHoc;
use std::time::Duration;

use super::session::{SessionRegistry, run_sweeper};
use crate::config::Config;

const SWEEP_EVERY: Duration = Duration::from_secs(60);

/// Manages the session registry built from the active profile.
pub fn init() -> AdHoc {
    AdHoc::on_ignite("Console sessions", |rocket| async {
        let settings = Config::console_settings();
        info!(
            "✓ Console backed by {} (timeout {:?}, page size {})",
            settings.api_base_url, settings.request_timeout, settings.page_limit
        );
        rocket.manage(SessionRegistry::new(settings, Config::session_idle()))
    })
}

/// Starts the idle-session sweeper once the server is up.
pub fn sweeper() -> AdHoc {
    AdHoc::on_liftoff("Session sweeper", |rocket| {
        Box::pin(async move {
            match rocket.state::<SessionRegistry>() {
                Some(registry) => {
                    tokio::spawn(run_sweeper(registry.clone(), SWEEP_EVERY));
                }
                None => error!("✗ Session registry missing, sweeper not started"),
            }
        })
    })
}
