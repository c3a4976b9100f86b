use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the real environment so tests can
/// drive them with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_num = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let narrow = |var: &str, value: u64| -> Result<u32, ConfigError> {
        u32::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("KOMPAS_ENV", "development"))?;

    let raw_bind = or_default("KOMPAS_BIND_ADDR", "0.0.0.0:3000");
    let bind_addr = raw_bind
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "KOMPAS_BIND_ADDR".to_string(),
            reason: e.to_string(),
        })?;
    let log_level = or_default("KOMPAS_LOG_LEVEL", "info");

    let db_max_connections = narrow(
        "KOMPAS_DB_MAX_CONNECTIONS",
        parse_num("KOMPAS_DB_MAX_CONNECTIONS", "10")?,
    )?;
    let db_min_connections = narrow(
        "KOMPAS_DB_MIN_CONNECTIONS",
        parse_num("KOMPAS_DB_MIN_CONNECTIONS", "1")?,
    )?;
    let db_acquire_timeout_secs = parse_num("KOMPAS_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let geocoder_url = or_default("KOMPAS_GEOCODER_URL", "https://nominatim.openstreetmap.org/");
    let geocoder_user_agent = or_default(
        "KOMPAS_GEOCODER_USER_AGENT",
        "kompas/0.1 (facility-directory)",
    );
    let geocoder_timeout_secs = parse_num("KOMPAS_GEOCODER_TIMEOUT_SECS", "10")?;
    let geocoder_max_retries = narrow(
        "KOMPAS_GEOCODER_MAX_RETRIES",
        parse_num("KOMPAS_GEOCODER_MAX_RETRIES", "2")?,
    )?;
    let geocoder_backoff_base_ms = parse_num("KOMPAS_GEOCODER_BACKOFF_BASE_MS", "500")?;

    let suggest_min_len = to_usize(
        "KOMPAS_SUGGEST_MIN_LEN",
        parse_num("KOMPAS_SUGGEST_MIN_LEN", "2")?,
    )?;
    let suggest_limit = to_usize(
        "KOMPAS_SUGGEST_LIMIT",
        parse_num("KOMPAS_SUGGEST_LIMIT", "5")?,
    )?;
    if suggest_limit == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "KOMPAS_SUGGEST_LIMIT".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let places_path = lookup("KOMPAS_PLACES_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let places_refresh_cron = or_default("KOMPAS_PLACES_REFRESH_CRON", "0 */15 * * * *");

    let admin_api_keys: Vec<String> = or_default("KOMPAS_API_KEYS", "")
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    if admin_api_keys.is_empty() && env != Environment::Development {
        return Err(ConfigError::MissingEnvVar("KOMPAS_API_KEYS".to_string()));
    }
    let admin_rate_limit = narrow(
        "KOMPAS_ADMIN_RATE_LIMIT",
        parse_num("KOMPAS_ADMIN_RATE_LIMIT", "120")?,
    )?;
    let admin_rate_limit_window_secs = parse_num("KOMPAS_ADMIN_RATE_LIMIT_WINDOW_SECS", "60")?;
    for (var, value) in [
        ("KOMPAS_ADMIN_RATE_LIMIT", u64::from(admin_rate_limit)),
        ("KOMPAS_ADMIN_RATE_LIMIT_WINDOW_SECS", admin_rate_limit_window_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        geocoder_url,
        geocoder_user_agent,
        geocoder_timeout_secs,
        geocoder_max_retries,
        geocoder_backoff_base_ms,
        suggest_min_len,
        suggest_limit,
        places_path,
        places_refresh_cron,
        admin_api_keys,
        admin_rate_limit,
        admin_rate_limit_window_secs,
    })
}

fn to_usize(var: &str, value: u64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "KOMPAS_ENV".to_string(),
            reason: format!("expected development, test or production, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
