use bbdata_common::{DateConfig, DateError};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Skip apikey checks and act as `unsecured_user` on every request.
    pub unsecured: bool,
    pub unsecured_user: i32,
    /// Lifetime of the apikeys handed out by `/login`.
    pub login_validity_hours: i64,
    /// When set, an `admin` user with this password is created on start-up.
    pub bootstrap_admin_password: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatsBackend {
    /// Server-side atomic increments, no row locks.
    Counters,
    /// Read-modify-write under `SELECT ... FOR UPDATE`.
    Locking,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    pub backend: StatsBackend,
    pub async_enabled: bool,
    pub pool_size: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatesConfig {
    pub min: Option<String>,
    pub max: Option<String>,
}

impl DatesConfig {
    pub fn to_date_config(&self) -> Result<DateConfig, DateError> {
        DateConfig::from_bounds(self.min.as_deref(), self.max.as_deref())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub cache_enabled: bool,
    /// Secret expected by `/cache-evict`. The endpoint is disabled when unset.
    pub admin_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    /// How many month partitions a latest-value lookup may scan.
    pub max_latest_months: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub stats: StatsConfig,
    pub dates: DatesConfig,
    pub input: InputConfig,
    pub query: QueryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("auth.unsecured", false)?
            .set_default("auth.unsecured_user", 1)?
            .set_default("auth.login_validity_hours", 13)?
            .set_default("stats.backend", "counters")?
            .set_default("stats.async_enabled", true)?
            .set_default("stats.pool_size", 4)?
            .set_default("stats.queue_capacity", 1000)?
            .set_default("dates.min", "2016-01-01T00:00:00.000Z")?
            .set_default("input.cache_enabled", false)?
            .set_default("query.max_latest_months", 12)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., BBDATA__DATABASE__URL)
            .add_source(Environment::with_prefix("BBDATA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
