use crate::automl::ModelArtifact;
use crate::config::TrackingConfig;
use crate::error::Result;
use crate::tracking::client::MlflowClient;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Relative artifact path of the serialized model inside a run.
pub const MODEL_ARTIFACT_PATH: &str = "model/model.json";

/// A model pulled from the tracking server, ready to serve predictions.
pub struct LoadedModel {
    pub model_id: String,
    pub run_id: String,
    pub model_uri: String,
    pub artifact: ModelArtifact,
}

/// Shared handle to the currently-served model.
///
/// The slot holds an `Arc` so readers clone the handle and run inference on
/// their copy; a reload swaps the whole handle in one write without blocking
/// in-flight predictions.
#[derive(Clone)]
pub struct ModelSlot {
    inner: Arc<RwLock<Option<Arc<LoadedModel>>>>,
}

impl ModelSlot {
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn current(&self) -> Option<Arc<LoadedModel>> {
        self.inner.read().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.is_some()
    }

    pub async fn replace(&self, model: Option<Arc<LoadedModel>>) {
        *self.inner.write().await = model;
    }
}

/// Accessor over the tracking server: experiment lifecycle plus lookup of
/// the best production model.
pub struct ModelRegistry {
    client: MlflowClient,
    config: TrackingConfig,
}

impl ModelRegistry {
    pub fn new(client: MlflowClient, config: TrackingConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &MlflowClient {
        &self.client
    }

    pub fn experiment_name(&self) -> &str {
        &self.config.experiment_name
    }

    pub fn tracking_uri(&self) -> &str {
        self.client.base_url()
    }

    /// Make sure the configured experiment exists and is active.
    ///
    /// A soft-deleted experiment is restored rather than recreated, so run
    /// history survives. Returns the experiment id either way.
    pub async fn ensure_experiment(&self) -> Result<String> {
        let name = &self.config.experiment_name;
        match self.client.get_experiment_by_name(name).await? {
            Some(experiment) if experiment.is_deleted() => {
                info!(experiment = %name, "Restoring deleted experiment");
                self.client
                    .restore_experiment(&experiment.experiment_id)
                    .await?;
                Ok(experiment.experiment_id)
            }
            Some(experiment) => Ok(experiment.experiment_id),
            None => {
                info!(experiment = %name, "Creating experiment");
                let id = self
                    .client
                    .create_experiment(name, &self.config.artifact_location)
                    .await?;
                Ok(id)
            }
        }
    }

    /// Load the production model with the lowest log-loss.
    ///
    /// Any failure along the way - unreachable server, no matching runs, a
    /// corrupt artifact - is logged and surfaced as `None` so the service
    /// can start and report `no_model` instead of crashing.
    pub async fn load_best_model(&self) -> Option<Arc<LoadedModel>> {
        match self.try_load_best_model().await {
            Ok(Some(model)) => {
                info!(
                    model_id = %model.model_id,
                    run_id = %model.run_id,
                    "Loaded best production model"
                );
                Some(model)
            }
            Ok(None) => {
                info!("No production model found in tracking server");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to load model from tracking server");
                None
            }
        }
    }

    async fn try_load_best_model(&self) -> Result<Option<Arc<LoadedModel>>> {
        let experiments = self.client.search_experiments().await?;
        let experiment_ids: Vec<String> = experiments
            .iter()
            .filter(|e| !e.is_deleted())
            .map(|e| e.experiment_id.clone())
            .collect();
        if experiment_ids.is_empty() {
            return Ok(None);
        }

        let runs = self
            .client
            .search_runs(&experiment_ids, "tags.environment = 'production'")
            .await?;

        let best = runs
            .iter()
            .filter_map(|run| run.metric("log_loss").map(|loss| (run, loss)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        let Some((run, log_loss)) = best else {
            return Ok(None);
        };

        info!(
            run_id = %run.info.run_id,
            log_loss,
            "Selected best production run"
        );

        let bytes = self
            .client
            .download_artifact(
                &run.info.experiment_id,
                &run.info.run_id,
                MODEL_ARTIFACT_PATH,
            )
            .await?;
        let artifact: ModelArtifact = serde_json::from_slice(&bytes)?;

        Ok(Some(Arc::new(LoadedModel {
            model_id: artifact.model_id.clone(),
            run_id: run.info.run_id.clone(),
            model_uri: format!("runs:/{}/model", run.info.run_id),
            artifact,
        })))
    }
}
