//! MLflow-compatible tracking service integration.
//!
//! The tracking server owns every experiment, run and artifact; this module
//! only marshals REST calls and holds the opaque identifiers needed to find
//! and reload the best production model.

pub mod client;
pub mod registry;
pub mod types;

pub use client::MlflowClient;
pub use registry::{LoadedModel, ModelRegistry, ModelSlot, MODEL_ARTIFACT_PATH};
pub use types::{Experiment, Run, RunStatus};
