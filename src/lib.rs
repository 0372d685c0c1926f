//! Cross-sell propensity service: trains binary classifiers over uploaded
//! customer CSVs with a bounded model search, logs every run to an
//! MLflow-compatible tracking server, and serves predictions from the best
//! production model.

pub mod api;
pub mod automl;
pub mod config;
pub mod data;
pub mod error;
pub mod tracking;

pub use config::Config;
pub use error::{AppError, Result};
