use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::bundle::ModelBundle;
use crate::config::Config;
use crate::encoding::FEATURE_NAMES;
use crate::error::AppResult;
use crate::types::{FlightInformation, HomeOut, PredictionOut};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    bundle: Arc<ModelBundle>,
    model_version: f64,
    log_predictions: bool,
}

impl AppState {
    pub fn new(bundle: ModelBundle, config: &Config) -> Self {
        let model_version = bundle.version().unwrap_or(config.model_version);
        Self {
            bundle: Arc::new(bundle),
            model_version,
            log_predictions: config.log_predictions,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------- Handlers ----------

async fn home(State(state): State<AppState>) -> Json<HomeOut> {
    Json(HomeOut {
        message: "Flight Delays API".to_string(),
        model_version: state.model_version,
    })
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<FlightInformation>, JsonRejection>,
) -> AppResult<Json<PredictionOut>> {
    let Json(flight) = payload?;

    let prediction = state.bundle.predict(&flight)?;
    let row = &prediction.row;

    if !row.unknown.is_empty() {
        tracing::debug!(fields = ?row.unknown, "categories outside training vocabulary, encoded as missing");
    }

    // Debug signal so we can see exactly what reaches the trees
    if state.log_predictions {
        let cols: Vec<String> = FEATURE_NAMES
            .iter()
            .zip(row.values.iter())
            .map(|(name, v)| format!("{}={}", name, v))
            .collect();
        tracing::info!(
            "encoded [{}] missing={} delay_proba={:.4}",
            cols.join(", "),
            row.missing_count(),
            prediction.delay_proba
        );
    }

    Ok(Json(PredictionOut { delay_proba: prediction.delay_proba }))
}
