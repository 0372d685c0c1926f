pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::config::Config;
use crate::tracking::{ModelRegistry, ModelSlot};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ModelRegistry>,
    pub model: ModelSlot,
    /// Serializes training: a second /train waits for the running search
    pub train_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, registry: Arc<ModelRegistry>) -> Self {
        Self {
            config,
            registry,
            model: ModelSlot::empty(),
            train_lock: Arc::new(Mutex::new(())),
        }
    }
}
