use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub geocoder_timeout_secs: u64,
    pub geocoder_max_retries: u32,
    pub geocoder_backoff_base_ms: u64,
    pub suggest_min_len: usize,
    pub suggest_limit: usize,
    /// Optional YAML seed for the place index; the database is used when unset.
    pub places_path: Option<PathBuf>,
    pub places_refresh_cron: String,
    /// Bearer tokens accepted on the admin routes; empty disables the check.
    pub admin_api_keys: Vec<String>,
    /// Admin requests allowed per caller within one window.
    pub admin_rate_limit: u32,
    pub admin_rate_limit_window_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("geocoder_url", &self.geocoder_url)
            .field("geocoder_user_agent", &self.geocoder_user_agent)
            .field("geocoder_timeout_secs", &self.geocoder_timeout_secs)
            .field("geocoder_max_retries", &self.geocoder_max_retries)
            .field("geocoder_backoff_base_ms", &self.geocoder_backoff_base_ms)
            .field("suggest_min_len", &self.suggest_min_len)
            .field("suggest_limit", &self.suggest_limit)
            .field("places_path", &self.places_path)
            .field("places_refresh_cron", &self.places_refresh_cron)
            .field("admin_api_keys", &format_args!("[{} redacted]", self.admin_api_keys.len()))
            .field("admin_rate_limit", &self.admin_rate_limit)
            .field(
                "admin_rate_limit_window_secs",
                &self.admin_rate_limit_window_secs,
            )
            .finish()
    }
}
