//! VitalGuard core library
//!
//! ICU monitoring and triage: synthetic bedside vitals, a global deterioration
//! risk score with explanations and short-horizon forecasts, five per-vital
//! clinical reasoning pipelines, and a confidence-gated alert engine with a
//! suppression audit trail. [`ward::IcuWard`] ties the pieces together.

pub mod alerts;
pub mod core;
pub mod db;
pub mod engines;
pub mod error;
pub mod models;
pub mod utils;
pub mod ward;

pub use error::{ModelError, WardError};
pub use ward::IcuWard;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application configuration
pub mod config {
    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Settings {
        #[serde(default)]
        pub monitor: MonitorSettings,
        #[serde(default)]
        pub model: ModelSettings,
        #[serde(default)]
        pub logging: LoggingSettings,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct MonitorSettings {
        /// Seconds between bedside polls.
        pub poll_interval_secs: f64,
        /// Polls per monitoring run.
        pub ticks: u32,
        /// Fixed RNG seed for reproducible runs.
        pub seed: Option<u64>,
        /// Concurrent patient workers for ward monitoring.
        pub worker_count: usize,
    }

    impl Default for MonitorSettings {
        fn default() -> Self {
            Self {
                poll_interval_secs: crate::ward::DEFAULT_POLL_INTERVAL_SECS,
                ticks: 10,
                seed: None,
                worker_count: 4,
            }
        }
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct ModelSettings {
        /// JSON logistic artifact. The heuristic predictor runs without one.
        pub path: Option<String>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct LoggingSettings {
        pub json: bool,
    }

    /// Load configuration from `config/default`, the `VITALGUARD_ENV` overlay and
    /// `VITALGUARD__*` environment variables, in that order.
    pub fn load_config() -> Result<Settings, config::ConfigError> {
        let env = std::env::var("VITALGUARD_ENV").unwrap_or_else(|_| "development".into());

        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("VITALGUARD").separator("__"))
            .build()?
            .try_deserialize()
    }

}
