use std::{env, path::PathBuf, time::Duration};

use crate::listing::SearchMode;

/// Public address of the chamber's REST backend, used when nothing else is configured locally.
pub const DEFAULT_API_URL: &str = "http://bisha.runasp.net";

/// AppConfig
///
/// Holds the portal's configuration. Loaded once at startup and cloned into every
/// component that needs it (backend client, listing controllers, the shell router).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Base URL of the remote REST backend, without a trailing slash.
    pub api_base_url: String,
    // Upper bound on every backend request. A timeout is a retryable failure.
    pub request_timeout: Duration,
    // Whether search/category filters narrow the loaded page or re-query the backend.
    pub search_mode: SearchMode,
    // Page size for the legacy static (no backend) listing mode.
    pub items_per_page: usize,
    // Carousel auto-advance period.
    pub carousel_interval: Duration,
    // JSON file backing the durable session store.
    pub session_file: PathBuf,
    // Address the portal shell listens on.
    pub bind_addr: String,
    // Runtime environment marker. Controls log format and fail-fast checks.
    pub env: Env,
}

/// Env
///
/// Local development or a production deployment.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Non-panicking values for tests and scaffolding.
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_millis(10_000),
            search_mode: SearchMode::LocalPage,
            items_per_page: 6,
            carousel_interval: Duration::from_millis(7_000),
            session_file: PathBuf::from("portal-session.json"),
            bind_addr: "127.0.0.1:3000".to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `PORTAL_API_URL` is not set, so a deployment never
    /// silently talks to the fallback backend.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();

        let api_base_url = match env {
            Env::Production => env::var("PORTAL_API_URL")
                .expect("FATAL: PORTAL_API_URL must be set in production."),
            // The front end historically read NEXT_PUBLIC_API_URL; honour it locally.
            Env::Local => env::var("PORTAL_API_URL")
                .or_else(|_| env::var("NEXT_PUBLIC_API_URL"))
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        };

        let search_mode = match env::var("PORTAL_SEARCH_MODE").as_deref() {
            Ok("server") => SearchMode::ServerQuery,
            _ => SearchMode::LocalPage,
        };

        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            request_timeout: millis_var("PORTAL_REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout),
            search_mode,
            items_per_page: env::var("PORTAL_ITEMS_PER_PAGE")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.items_per_page),
            carousel_interval: millis_var("PORTAL_CAROUSEL_INTERVAL_MS")
                .unwrap_or(defaults.carousel_interval),
            session_file: env::var("PORTAL_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            bind_addr: env::var("PORTAL_BIND_ADDR").unwrap_or(defaults.bind_addr),
            env,
        }
    }
}

// Unparseable or zero values fall back to the default rather than aborting startup.
fn millis_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}
