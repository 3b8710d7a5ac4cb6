use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Shared secret expected in the `X-API-Key` header. Unset disables the check.
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Process-wide dry-run switch (DISPATCH_DRY_RUN). Forces every send into dry-run.
    #[serde(default)]
    pub dry_run: bool,
    /// Delivery channel backend: "noop" (default) or "http"
    #[serde(default = "default_channel_backend")]
    pub channel_backend: String,
    /// Base URL of the push gateway when `channel_backend = "http"`
    #[serde(default)]
    pub gateway_url: Option<String>,
    /// Request timeout for push gateway calls in seconds
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the background poller runs
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Maximum number of due items dispatched concurrently within one batch
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Template and schedule store backend: "memory" (default) or "postgres"
    #[serde(default = "default_storage_backend")]
    pub backend: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Whether the pub/sub trigger is started
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default)]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_true() -> bool {
    true
}

fn default_channel_backend() -> String {
    "noop".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    60 // 1 minute
}

fn default_max_concurrency() -> usize {
    4
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/push_dispatch".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    600
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "push-dispatch-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8082)?
            .set_default("dispatch.dry_run", false)?
            .set_default("scheduler.poll_interval_seconds", 60)?
            .set_default("storage.backend", "memory")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, SCHEDULER__POLL_INTERVAL_SECONDS, REDIS__CHANNELS=a,b ...
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("redis.channels")
                    .with_list_parse_key("server.cors_origins"),
            )
            // The flat switch operators already use in every non-production deploy
            .set_override_option("dispatch.dry_run", dry_run_env_override())?;

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// `DISPATCH_DRY_RUN=true` (or the legacy `PUSH_DISPATCH_DRY_RUN=true`) forces dry-run.
/// Any other value leaves the layered configuration untouched.
fn dry_run_env_override() -> Option<bool> {
    ["DISPATCH_DRY_RUN", "PUSH_DISPATCH_DRY_RUN"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .any(|value| value.trim().eq_ignore_ascii_case("true"))
        .then_some(true)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            channel_backend: default_channel_backend(),
            gateway_url: None,
            gateway_timeout_seconds: default_gateway_timeout(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: default_poll_interval(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            channels: vec![],
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}
