//! Flight delay probability service.
//!
//! Loads a gradient-boosted classifier together with the category lists it
//! was trained on, and serves `POST /predict` over axum.

pub mod bundle;
pub mod config;
pub mod encoding;
pub mod error;
pub mod model;
pub mod routes;
pub mod types;

pub use bundle::{BundleError, ModelBundle, Prediction};
pub use error::{AppError, AppResult};
