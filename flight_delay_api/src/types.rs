use serde::{Deserialize, Serialize};

/// One flight, with the column names the model was trained on.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct FlightInformation {
    pub dia: i64,
    pub mes: i64,
    pub dianom: String,
    pub tipovuelo: String,
    pub opera: String,
    pub siglades: String,
    pub temporadaalta: i64,
    pub periododia: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOut {
    pub delay_proba: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeOut {
    pub message: String,
    pub model_version: f64,
}
