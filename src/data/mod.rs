//! Tabular upload handling: CSV parsing and model-schema preprocessing.

pub mod frame;
pub mod preprocess;

pub use frame::RawFrame;
pub use preprocess::{preprocess_for_model, ModelFrame};
