use std::env;
use std::path::PathBuf;

/// Service configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Model bundle file
    pub model_path: PathBuf,

    /// Listen port on 0.0.0.0
    pub port: u16,

    /// Version reported by `GET /` when the bundle carries none
    pub model_version: f64,

    /// Log every encoded feature row (`LOG_PRED=1`)
    pub log_predictions: bool,
}

pub const DEFAULT_MODEL_PATH: &str = "/app/flight_delays_lgb_model.json";

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            model_path: get("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),

            port: get("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),

            model_version: get("MODEL_VERSION")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(0.1),

            log_predictions: get("LOG_PRED").as_deref() == Some("1"),
        }
    }
}
