//! Configuration loader for the `veridian-server` plant monitoring API.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::notify::{NotifyConfig, QuietHours};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional boolean environment variable (`1|true|yes` / `0|false|no`).
macro_rules! parse_env_bool {
    ($var_name:expr, $default:expr) => {
        match env::var($var_name).ok().as_deref() {
            None => $default,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => return Err(anyhow!("Invalid {}: {}", $var_name, other)),
        }
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// SQLite connection string (file is created if missing).
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Maximum number of active alerts kept after an ingestion.
    pub alert_active_cap: u32,

    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,

    /// Run the in-process mock Arduino generator.
    pub mock_sensors: bool,

    /// Seconds between mock readings.
    pub mock_interval_secs: u32,

    /// Serial device the Arduino is attached to, if any.
    pub serial_port: Option<String>,

    /// Serial baud rate; must match the Arduino sketch.
    pub serial_baud: u32,

    /// Outbound alert notifications.
    pub notify: NotifyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: "sqlite://plant_data.db".to_string(),
            db_pool_max: 5,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            alert_active_cap: 3,
            cors_origins: vec!["http://localhost:3000".to_string()],
            mock_sensors: false,
            mock_interval_secs: 5,
            serial_port: None,
            serial_baud: 9600,
            notify: NotifyConfig::default(),
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `DATABASE_URL` – SQLite connection string (default: `sqlite://plant_data.db`)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `BIND_ADDR` – listen address (default: `0.0.0.0:3001`)
/// - `ALERT_ACTIVE_CAP` – active alerts kept after ingestion (default: 3)
/// - `CORS_ORIGINS` – comma separated allowed origins (default: `http://localhost:3000`)
/// - `MOCK_SENSORS` – enable the mock Arduino generator (default: false)
/// - `MOCK_INTERVAL_SECS` – mock reading interval (default: 5)
/// - `SERIAL_PORT` – serial device to read Arduino JSON lines from (default: unset)
/// - `SERIAL_BAUD` – serial baud rate (default: 9600)
/// - `NOTIFY_WEBHOOK_URL` – POST new alerts to this URL (default: unset)
/// - `NOTIFY_QUIET_HOURS_START` / `NOTIFY_QUIET_HOURS_END` – `HH:MM` window with no notifications (default: unset)
/// - `NOTIFY_MAX_RETRIES` – delivery attempts per channel (default: 3)
/// - `NOTIFY_RETRY_DELAY_MS` – pause between attempts (default: 1000)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();

    let db_url = env::var("DATABASE_URL").unwrap_or(defaults.db_url);
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", defaults.db_pool_max);
    let bind_addr = match env::var("BIND_ADDR") {
        Ok(v) => v
            .parse::<SocketAddr>()
            .map_err(|e| anyhow!("Invalid BIND_ADDR: {}", e))?,
        Err(_) => defaults.bind_addr,
    };
    let alert_active_cap = parse_env_u32!("ALERT_ACTIVE_CAP", defaults.alert_active_cap);
    let cors_origins = env::var("CORS_ORIGINS")
        .map(|v| parse_origins(&v))
        .unwrap_or(defaults.cors_origins);
    let mock_sensors = parse_env_bool!("MOCK_SENSORS", defaults.mock_sensors);
    let mock_interval_secs = parse_env_u32!("MOCK_INTERVAL_SECS", defaults.mock_interval_secs);
    let serial_port = env::var("SERIAL_PORT").ok().filter(|p| !p.trim().is_empty());
    let serial_baud = parse_env_u32!("SERIAL_BAUD", defaults.serial_baud);
    let notify = load_notify(defaults.notify)?;

    let cfg = Config {
        db_url,
        db_pool_max,
        bind_addr,
        alert_active_cap,
        cors_origins,
        mock_sensors,
        mock_interval_secs,
        serial_port,
        serial_baud,
        notify,
    };
    validate(&cfg)?;
    Ok(cfg)
}

fn load_notify(defaults: NotifyConfig) -> Result<NotifyConfig> {
    // ---
    let webhook_url = env::var("NOTIFY_WEBHOOK_URL")
        .ok()
        .filter(|u| !u.trim().is_empty());
    let quiet_hours = match (
        env::var("NOTIFY_QUIET_HOURS_START").ok(),
        env::var("NOTIFY_QUIET_HOURS_END").ok(),
    ) {
        (Some(start), Some(end)) => Some(QuietHours::parse(&start, &end).ok_or_else(|| {
            anyhow!("Invalid NOTIFY_QUIET_HOURS_START/END: expected HH:MM, got {start}/{end}")
        })?),
        (None, None) => None,
        _ => {
            return Err(anyhow!(
                "NOTIFY_QUIET_HOURS_START and NOTIFY_QUIET_HOURS_END must be set together"
            ))
        }
    };
    let max_retries = parse_env_u32!("NOTIFY_MAX_RETRIES", defaults.max_retries);
    let retry_delay_ms = parse_env_u32!(
        "NOTIFY_RETRY_DELAY_MS",
        u32::try_from(defaults.retry_delay.as_millis()).unwrap_or(u32::MAX)
    );

    Ok(NotifyConfig {
        webhook_url,
        quiet_hours,
        max_retries,
        retry_delay: Duration::from_millis(u64::from(retry_delay_ms)),
    })
}

/// Reject values that parse but cannot work.
pub fn validate(cfg: &Config) -> Result<()> {
    // ---
    if cfg.alert_active_cap == 0 {
        return Err(anyhow!("Invalid ALERT_ACTIVE_CAP: must be at least 1"));
    }
    if cfg.mock_interval_secs == 0 {
        return Err(anyhow!("Invalid MOCK_INTERVAL_SECS: must be at least 1"));
    }
    if cfg.notify.max_retries == 0 {
        return Err(anyhow!("Invalid NOTIFY_MAX_RETRIES: must be at least 1"));
    }
    Ok(())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL       : {}", self.db_url);
        tracing::info!("  DB_POOL_MAX        : {}", self.db_pool_max);
        tracing::info!("  BIND_ADDR          : {}", self.bind_addr);
        tracing::info!("  ALERT_ACTIVE_CAP   : {}", self.alert_active_cap);
        tracing::info!("  CORS_ORIGINS       : {}", self.cors_origins.join(","));
        tracing::info!("  MOCK_SENSORS       : {}", self.mock_sensors);
        tracing::info!("  MOCK_INTERVAL_SECS : {}", self.mock_interval_secs);
        tracing::info!(
            "  SERIAL_PORT        : {}",
            self.serial_port.as_deref().unwrap_or("(disabled)")
        );
        tracing::info!("  SERIAL_BAUD        : {}", self.serial_baud);
        tracing::info!(
            "  NOTIFY_WEBHOOK_URL : {}",
            self.notify.webhook_url.as_deref().unwrap_or("(disabled)")
        );
        match &self.notify.quiet_hours {
            Some(q) => tracing::info!("  NOTIFY_QUIET_HOURS : {}-{}", q.start, q.end),
            None => tracing::info!("  NOTIFY_QUIET_HOURS : (none)"),
        }
        tracing::info!("  NOTIFY_MAX_RETRIES : {}", self.notify.max_retries);
        tracing::info!("  NOTIFY_RETRY_DELAY : {:?}", self.notify.retry_delay);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_defaults() {
        // ---
        let cfg = Config::default();
        assert_eq!(cfg.alert_active_cap, 3);
        assert_eq!(cfg.bind_addr.port(), 3001);
        assert_eq!(cfg.serial_baud, 9600);
        assert!(!cfg.mock_sensors);
        assert!(cfg.serial_port.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        // ---
        assert!(validate(&Config::default()).is_ok());

        let zero_cap = Config {
            alert_active_cap: 0,
            ..Config::default()
        };
        let err = validate(&zero_cap).unwrap_err();
        assert!(err.to_string().contains("ALERT_ACTIVE_CAP"));

        let zero_interval = Config {
            mock_interval_secs: 0,
            ..Config::default()
        };
        assert!(validate(&zero_interval).is_err());

        let zero_retries = Config {
            notify: NotifyConfig {
                max_retries: 0,
                ..NotifyConfig::default()
            },
            ..Config::default()
        };
        assert!(validate(&zero_retries).is_err());
    }

    #[test]
    fn test_parse_origins() {
        // ---
        let origins = parse_origins(" http://localhost:3000 , ,http://192.168.1.20:3000");
        assert_eq!(
            origins,
            vec!["http://localhost:3000", "http://192.168.1.20:3000"]
        );
    }
}
