use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::engine::orchestrator::MAX_TIME_UP_COUNTDOWN;

/// Upper bound for the post-time-up countdown, in seconds.
pub const MAX_TIME_UP_COUNTDOWN_SECONDS: u64 = MAX_TIME_UP_COUNTDOWN.as_secs();

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub session: SessionSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// How often live sessions are ticked. Expiry is wall-clock based, so a
    /// coarser interval only delays events, it never stretches a section.
    pub tick_interval_ms: u64,
    pub time_up_countdown_seconds: u64,
    pub enforce_availability_window: bool,
    /// How long a submitted session keeps its report before it is evicted.
    pub report_retention_seconds: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            time_up_countdown_seconds: 5,
            enforce_availability_window: true,
            report_retention_seconds: 600,
        }
    }
}

impl SessionSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn time_up_countdown(&self) -> Duration {
        Duration::from_secs(self.time_up_countdown_seconds)
    }

    pub fn report_retention(&self) -> Duration {
        Duration::from_secs(self.report_retention_seconds)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetrySettings {
    /// OTLP/HTTP endpoint; export is off when unset.
    pub otlp_endpoint: Option<String>,
    pub json_logs: bool,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load environment variables from root .env file (two levels up)
        // Try root .env first, then fallback to local .env
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string());

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "test-window".to_string());

        let defaults = SessionSettings::default();
        let session = SessionSettings {
            tick_interval_ms: settings
                .get_int("session.tick_interval_ms")
                .ok()
                .and_then(|value| u64::try_from(value).ok())
                .filter(|value| *value > 0)
                .unwrap_or(defaults.tick_interval_ms),
            time_up_countdown_seconds: settings
                .get_int("session.time_up_countdown_seconds")
                .ok()
                .and_then(|value| u64::try_from(value).ok())
                .map(|value| value.min(MAX_TIME_UP_COUNTDOWN_SECONDS))
                .unwrap_or(defaults.time_up_countdown_seconds),
            enforce_availability_window: settings
                .get_bool("session.enforce_availability_window")
                .unwrap_or(defaults.enforce_availability_window),
            report_retention_seconds: settings
                .get_int("session.report_retention_seconds")
                .ok()
                .and_then(|value| u64::try_from(value).ok())
                .unwrap_or(defaults.report_retention_seconds),
        };

        let telemetry = TelemetrySettings {
            otlp_endpoint: settings
                .get_string("telemetry.otlp_endpoint")
                .or_else(|_| env::var("OTEL_EXPORTER_OTLP_ENDPOINT"))
                .ok()
                .filter(|endpoint| !endpoint.trim().is_empty()),
            json_logs: settings.get_bool("telemetry.json_logs").unwrap_or(false),
        };

        Ok(Config {
            bind_addr,
            mongo_uri,
            mongo_database,
            session,
            telemetry,
        })
    }
}
