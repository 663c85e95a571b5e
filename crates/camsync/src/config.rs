//! Process configuration.
//!
//! Everything is read once at startup into an immutable [`Config`] and handed
//! to component constructors. Nothing below this module touches the
//! environment.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Empty values count as unset.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use camsync_core::{CameraMap, NamingMode, StreamScheme};
use camsync_sync::{RetryPolicy, SendConfig};

use crate::error::{CamsyncError, Result};

/// Settings without which the daemon cannot start.
pub const REQUIRED: [&str; 5] = [
    "IP_DEVICES",
    "USERNAME",
    "PASSWORD",
    "ENDPOINT_URL",
    "CAMERA_MAP_PATH",
];

/// A value that must never appear in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Connection settings for the CMSV8 platform and its media gateway.
#[derive(Debug, Clone)]
pub struct CmsConfig {
    /// Platform host (and media gateway host).
    pub host: String,
    /// Media gateway port used in stream URLs.
    pub port: u16,
    pub scheme: StreamScheme,
    /// Stream index placed in URLs (main/sub stream).
    pub stream: u32,
    pub account: String,
    pub password: Secret,
    /// Timeout for login and directory queries.
    pub request_timeout: Duration,
}

impl CmsConfig {
    /// Base URL of the platform's HTTP API.
    pub fn api_base(&self) -> String {
        format!("http://{}/808gps", self.host)
    }
}

/// Complete daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub cms: CmsConfig,
    /// Sink receiving `{"set_urls": [...]}`.
    pub endpoint_url: String,
    /// Per-request timeout for sink POSTs.
    pub post_timeout: Duration,
    pub camera_map_path: PathBuf,
    pub cache_path: PathBuf,
    pub naming: NamingMode,
    /// Directory queries in flight at once.
    pub collect_concurrency: usize,
    pub send: SendConfig,
    /// Sleep between cycles, and after a failed login or collection.
    pub scan_interval: Duration,
    pub session_max_age: Duration,
    /// Delay before the first cycle.
    pub startup_grace: Duration,
    /// Log in on every cycle regardless of session age.
    pub always_login: bool,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup: &lookup };

        let missing: Vec<String> = REQUIRED
            .iter()
            .filter(|key| env.get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CamsyncError::MissingConfig(missing));
        }

        let batch_size: usize = env.parse("CLIENT_BATCH_SIZE", 3)?;
        if batch_size == 0 {
            return Err(invalid("CLIENT_BATCH_SIZE", "0", "must be at least 1"));
        }

        let post_timeout = env.secs("POST_TIMEOUT", 20.0)?;
        let retry = RetryPolicy {
            max_retry: env.parse("POST_MAX_RETRY", 1)?,
            initial_backoff: env.secs("INITIAL_BACKOFF", 0.8)?,
            backoff_cap: env.secs("BACKOFF_CAP", 5.0)?,
            fallback_split: env.parse::<u32>("MAX_FALLBACK_SPLIT", 1)? >= 1,
        };

        Ok(Self {
            cms: CmsConfig {
                host: env.required("IP_DEVICES"),
                port: env.parse("RTSP_PORT", 6604)?,
                scheme: env.parse("STREAM_SCHEME", StreamScheme::Rtmp)?,
                stream: env.parse("DEFAULT_STREAM", 1)?,
                account: env.required("USERNAME"),
                password: Secret::new(env.required("PASSWORD")),
                request_timeout: env.secs("CMS_TIMEOUT", 8.0)?,
            },
            endpoint_url: env.required("ENDPOINT_URL"),
            post_timeout,
            camera_map_path: PathBuf::from(env.required("CAMERA_MAP_PATH")),
            cache_path: PathBuf::from(
                env.get("PERSIST_CACHE_PATH")
                    .unwrap_or_else(|| "last_sent.json".to_string()),
            ),
            naming: env.parse("NAME_MODE", NamingMode::Simple)?,
            collect_concurrency: env.parse::<usize>("COLLECT_CONCURRENCY", 1)?.max(1),
            send: SendConfig {
                batch_size,
                retry,
                dry_run: env.flag("DRY_RUN"),
                batch_pause: env.secs("SLEEP_BETWEEN_BATCH", 0.5)?,
                item_pause: Duration::from_millis(250),
            },
            scan_interval: Duration::from_secs(env.parse("RESCAN_INTERVAL_SECONDS", 20)?),
            session_max_age: Duration::from_secs(env.parse("SESSION_MAX_AGE_SECONDS", 1200)?),
            startup_grace: Duration::from_secs(env.parse("STARTUP_GRACE_SECONDS", 0)?),
            always_login: env.flag("ALWAYS_LOGIN_EACH_LOOP"),
        })
    }

    /// Read and parse the camera map file.
    pub fn load_camera_map(&self) -> Result<CameraMap> {
        let text = std::fs::read_to_string(&self.camera_map_path).map_err(|source| {
            CamsyncError::CameraMapIo {
                path: self.camera_map_path.display().to_string(),
                source,
            }
        })?;
        Ok(CameraMap::from_json_str(&text)?)
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Presence is checked up front; absent here only if the lookup changed.
    fn required(&self, key: &str) -> String {
        self.get(key).unwrap_or_default()
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
        }
    }

    fn secs(&self, key: &str, default: f64) -> Result<Duration> {
        let secs: f64 = self.parse(key, default)?;
        Duration::try_from_secs_f64(secs).map_err(|e| invalid(key, &secs.to_string(), &e.to_string()))
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> CamsyncError {
    CamsyncError::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
