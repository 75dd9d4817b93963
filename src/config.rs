use std::fmt;

use anyhow::Context;
use chrono::Duration;
use zeroize::Zeroizing;

/// Upper bounds keep `now + ttl` far from the edge of the representable range.
pub const MAX_ACCESS_TTL_SECS: i64 = 24 * 60 * 60;
pub const MAX_REFRESH_TTL_DAYS: i64 = 365;

/// Deployment flavour. Destructive admin endpoints only exist on `Dev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Dev,
    Prod,
}

impl Platform {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "dev" | "development" => Platform::Dev,
            _ => Platform::Prod,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub platform: Platform,
    /// HMAC key for access tokens.
    pub jwt_secret: Zeroizing<String>,
    /// Preshared key the billing provider presents as `ApiKey <key>`.
    pub webhook_key: Zeroizing<String>,
    pub access_ttl_secs: i64,
    pub refresh_ttl_days: i64,
    pub request_timeout_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_url", &"<redacted>")
            .field("platform", &self.platform)
            .field("jwt_secret", &"<redacted>")
            .field("webhook_key", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Config {
    /// The slice of configuration the session core needs.
    pub fn auth(&self) -> anyhow::Result<AuthConfig> {
        Ok(AuthConfig {
            signing_secret: Zeroizing::new(self.jwt_secret.as_bytes().to_vec()),
            access_ttl: Duration::try_seconds(self.access_ttl_secs)
                .context("access token TTL out of range")?,
            refresh_ttl: Duration::try_days(self.refresh_ttl_days)
                .context("refresh token TTL out of range")?,
        })
    }
}

/// Parameters threaded into `SessionManager` at construction.
#[derive(Clone)]
pub struct AuthConfig {
    pub signing_secret: Zeroizing<Vec<u8>>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl AuthConfig {
    pub fn new(signing_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            signing_secret: Zeroizing::new(signing_secret.into()),
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::days(60),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Parse an optional TTL setting. Unset means `default`; anything outside
/// `1..=max` is a startup error.
fn bounded_ttl(name: &str, raw: Option<String>, default: i64, max: i64) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{} must be an integer, got {:?}", name, raw))?;
    if !(1..=max).contains(&value) {
        anyhow::bail!("{} must be between 1 and {}, got {}", name, max, value);
    }
    Ok(value)
}

fn required(name: &str) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => anyhow::bail!("{} is not set", name),
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let jwt_secret = required("MURMUR_JWT_SECRET")?;
    let webhook_key = required("MURMUR_WEBHOOK_KEY")?;

    Ok(Config {
        port: std::env::var("MURMUR_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/murmur".into()),
        platform: Platform::parse(&std::env::var("MURMUR_PLATFORM").unwrap_or_default()),
        jwt_secret: Zeroizing::new(jwt_secret),
        webhook_key: Zeroizing::new(webhook_key),
        access_ttl_secs: bounded_ttl(
            "MURMUR_ACCESS_TTL_SECS",
            std::env::var("MURMUR_ACCESS_TTL_SECS").ok(),
            3600,
            MAX_ACCESS_TTL_SECS,
        )?,
        refresh_ttl_days: bounded_ttl(
            "MURMUR_REFRESH_TTL_DAYS",
            std::env::var("MURMUR_REFRESH_TTL_DAYS").ok(),
            60,
            MAX_REFRESH_TTL_DAYS,
        )?,
        request_timeout_secs: std::env::var("MURMUR_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
    })
}
