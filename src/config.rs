//! Layered configuration: compiled-in defaults, an optional TOML file, then
//! `PNRAGG_`-prefixed environment variables, in that order. Built once in
//! `main` and threaded through constructors — never a global/static.
//!
//! Keys are snake_case throughout, including in `set_default`. `config`'s
//! `Environment` source lowercases every key it collects from the process
//! environment, so a camelCase key (e.g. `tripService`) can never be reached
//! by an env var — only snake_case keys round-trip through all three
//! sources identically.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub connect_timeout_ms: u64,
    pub socket_timeout_ms: u64,
    pub server_selection_timeout_ms: u64,
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    pub ttl_ms: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerSettings {
    pub sliding_window_size: u32,
    pub minimum_number_of_calls: u32,
    pub failure_rate_threshold: f64,
    pub wait_duration_ms: u64,
    pub half_open_permitted: u32,
}

impl CircuitBreakerSettings {
    pub fn to_breaker_config(&self) -> crate::circuit_breaker::CircuitBreakerConfig {
        crate::circuit_breaker::CircuitBreakerConfig {
            sliding_window_size: self.sliding_window_size,
            minimum_number_of_calls: self.minimum_number_of_calls,
            failure_rate_threshold: self.failure_rate_threshold,
            wait_duration_in_open_state: Duration::from_millis(self.wait_duration_ms),
            permitted_number_of_calls_in_half_open_state: self.half_open_permitted,
            slow_call_duration_threshold: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakersConfig {
    pub trip_service: CircuitBreakerSettings,
    pub baggage_service: CircuitBreakerSettings,
    pub ticket_service: CircuitBreakerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub cb: CircuitBreakersConfig,
    pub worker_pool_size: usize,
    pub event_loop_pool_size: usize,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Build config from compiled-in defaults, optionally overlaid by a TOML
    /// file at `config_path` (if it exists), then by `PNRAGG_`-prefixed env
    /// vars with `__` nesting (e.g. `PNRAGG_CB__TRIP_SERVICE__FAILURE_RATE_THRESHOLD`).
    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("store.host", "localhost")?
            .set_default("store.port", 27017)?
            .set_default("store.database", "pnr_agg")?
            .set_default("store.connect_timeout_ms", 5000)?
            .set_default("store.socket_timeout_ms", 5000)?
            .set_default("store.server_selection_timeout_ms", 5000)?
            .set_default("cache.host", "localhost")?
            .set_default("cache.port", 0)?
            .set_default("cache.ttl_ms", 600_000)?
            .set_default("cb.trip_service.sliding_window_size", 100)?
            .set_default("cb.trip_service.minimum_number_of_calls", 10)?
            .set_default("cb.trip_service.failure_rate_threshold", 10.0)?
            .set_default("cb.trip_service.wait_duration_ms", 10_000)?
            .set_default("cb.trip_service.half_open_permitted", 3)?
            .set_default("cb.baggage_service.sliding_window_size", 100)?
            .set_default("cb.baggage_service.minimum_number_of_calls", 10)?
            .set_default("cb.baggage_service.failure_rate_threshold", 10.0)?
            .set_default("cb.baggage_service.wait_duration_ms", 10_000)?
            .set_default("cb.baggage_service.half_open_permitted", 3)?
            .set_default("cb.ticket_service.sliding_window_size", 100)?
            .set_default("cb.ticket_service.minimum_number_of_calls", 10)?
            .set_default("cb.ticket_service.failure_rate_threshold", 10.0)?
            .set_default("cb.ticket_service.wait_duration_ms", 10_000)?
            .set_default("cb.ticket_service.half_open_permitted", 3)?
            .set_default("worker_pool_size", 4)?
            .set_default("event_loop_pool_size", 4)?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", true)?;

        if let Some(path) = config_path {
            if std::path::Path::new(path).exists() {
                builder = builder.add_source(config::File::with_name(path));
            }
        }

        builder = builder.add_source(config::Environment::with_prefix("PNRAGG").separator("__"));

        builder.build()?.try_deserialize()
    }
}
