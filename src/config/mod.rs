use rocket::Config as RocketConfig;
use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use std::env;
use std::time::Duration;

pub struct Config;

impl Config {
    fn figment() -> Figment {
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());

        Figment::from(RocketConfig::default())
            .merge(Toml::file("Rocket.toml").nested())
            .select(&profile)
            .merge(Env::prefixed("ROCKET_").split("_"))
    }

    /// Backend REST root, without a trailing slash.
    pub fn api_base_url() -> String {
        Self::figment()
            .extract_inner::<String>("api_base_url")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://localhost:5000/api/v1".to_string())
    }

    pub fn request_timeout() -> Duration {
        let secs: u64 = Self::figment()
            .extract_inner("request_timeout_secs")
            .unwrap_or(30);
        Duration::from_secs(secs.max(1))
    }

    pub fn page_limit() -> u32 {
        Self::figment()
            .extract_inner::<u32>("page_limit")
            .map(|limit| limit.clamp(1, 100))
            .unwrap_or(10)
    }

    pub fn verification_poll() -> Duration {
        Duration::from_millis(
            Self::figment()
                .extract_inner("verification_poll_ms")
                .unwrap_or(10_000),
        )
    }

    pub fn profile_poll() -> Duration {
        Duration::from_millis(
            Self::figment()
                .extract_inner("profile_poll_ms")
                .unwrap_or(15_000),
        )
    }

    pub fn session_idle() -> Duration {
        Duration::from_secs(
            Self::figment()
                .extract_inner("session_idle_secs")
                .unwrap_or(1800),
        )
    }

    pub fn max_notifications() -> usize {
        Self::figment()
            .extract_inner("max_notifications")
            .unwrap_or(20)
    }

    pub fn is_development() -> bool {
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());
        profile == "development"
    }

    /// Snapshot of the values a console session needs, read once per session.
    pub fn console_settings() -> ConsoleSettings {
        ConsoleSettings {
            api_base_url: Self::api_base_url(),
            request_timeout: Self::request_timeout(),
            page_limit: Self::page_limit(),
            verification_poll: Self::verification_poll(),
            profile_poll: Self::profile_poll(),
            max_notifications: Self::max_notifications(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleSettings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub page_limit: u32,
    pub verification_poll: Duration,
    pub profile_poll: Duration,
    pub max_notifications: usize,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        ConsoleSettings {
            api_base_url: "http://localhost:5000/api/v1".to_string(),
            request_timeout: Duration::from_secs(30),
            page_limit: 10,
            verification_poll: Duration::from_secs(10),
            profile_poll: Duration::from_secs(15),
            max_notifications: 20,
        }
    }
}
