use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backend root without the `/api` suffix.
    pub api_url: String,
    pub request_timeout: Duration,
    pub fetch_parallelism: usize,
    pub feed_refresh: Duration,
    pub session_file: Option<PathBuf>,
}

impl AppConfig {
    /// Reads the environment; call `load_dotenv` first to pick up `.env` files.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, applying defaults and clamps.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("WKB_API_URL")
            .map(|val| normalize_base_url(&val))
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let request_timeout =
            Duration::from_secs(parse_or(lookup("HTTP_TIMEOUT_SECS"), 10u64).max(1));
        let fetch_parallelism = parse_or(lookup("FETCH_PARALLELISM"), 6usize).clamp(2, 32);
        let feed_refresh =
            Duration::from_secs(parse_or(lookup("FEED_POLL_SECS"), 60u64).max(15));
        let session_file = lookup("WKB_SESSION_FILE")
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from);

        Self {
            api_url,
            request_timeout,
            fetch_parallelism,
            feed_refresh,
            session_file,
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|val| val.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/api")
        .unwrap_or(trimmed)
        .to_string()
}
