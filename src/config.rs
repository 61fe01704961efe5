use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BACKGROUND: &str = "https://i.imgur.com/T7AMnkD.png";

// The participant API is picked per build profile, like the web client did.
#[cfg(debug_assertions)]
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
#[cfg(not(debug_assertions))]
const DEFAULT_API_BASE_URL: &str = "https://marathon-16-website.vercel.app";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub background: String,
    pub font_path: Option<PathBuf>,
    pub lookup_timeout: Duration,
    pub lookup_cache_ttl: Duration,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();

        let api_base_url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if api_base_url.is_empty() {
            return Err("API_BASE_URL must not be empty".into());
        }

        let background =
            std::env::var("CERTIFICATE_BACKGROUND").unwrap_or_else(|_| DEFAULT_BACKGROUND.to_string());
        let font_path = std::env::var("CERTIFICATE_FONT").ok().map(PathBuf::from);

        let lookup_timeout = Duration::from_secs(parse_var("LOOKUP_TIMEOUT_SECS", 15)?);
        let lookup_cache_ttl = Duration::from_secs(parse_var("LOOKUP_CACHE_TTL_SECS", 300)?);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("PORT", 3001)?;

        Ok(Self {
            api_base_url,
            background,
            font_path,
            lookup_timeout,
            lookup_cache_ttl,
            host,
            port,
        })
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error + Send + Sync>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(e) => Err(format!("invalid {key} value {raw:?}: {e}").into()),
        },
        Err(_) => Ok(default),
    }
}
