use crate::config::TrackingConfig;
use crate::error::{AppError, Result};
use crate::tracking::types::{
    ApiErrorBody, CreateExperimentResponse, CreateRunResponse, Experiment, GetExperimentResponse,
    Run, RunStatus, SearchExperimentsResponse, SearchRunsResponse,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Typed client for the tracking server's 2.0 REST API.
///
/// Artifact bytes go through the server's proxied artifact endpoints, so the
/// tracking server is expected to run with artifact serving enabled.
#[derive(Debug, Clone)]
pub struct MlflowClient {
    base_url: String,
    http: reqwest::Client,
}

impl MlflowClient {
    pub fn new(config: &TrackingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.uri.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, path)
    }

    /// Map a non-success response to a tracking error with the server's
    /// message attached.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(body);
        Err(AppError::Tracking(format!(
            "Tracking API returned {}: {}",
            status, message
        )))
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let response = self.http.post(self.api(path)).json(&body).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn post_unit(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let response = self.http.post(self.api(path)).json(&body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Look up an experiment by name; `None` when it does not exist.
    pub async fn get_experiment_by_name(&self, name: &str) -> Result<Option<Experiment>> {
        let response = self
            .http
            .get(self.api("experiments/get-by-name"))
            .query(&[("experiment_name", name)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let body: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody {
                error_code: None,
                message: None,
            });
            debug!(
                experiment = name,
                error_code = ?body.error_code,
                "Experiment not found"
            );
            return Ok(None);
        }

        let response = Self::check(response).await?;
        let body: GetExperimentResponse = response.json().await?;
        Ok(Some(body.experiment))
    }

    pub async fn create_experiment(&self, name: &str, artifact_location: &str) -> Result<String> {
        let body: CreateExperimentResponse = self
            .post_json(
                "experiments/create",
                json!({ "name": name, "artifact_location": artifact_location }),
            )
            .await?;
        Ok(body.experiment_id)
    }

    pub async fn restore_experiment(&self, experiment_id: &str) -> Result<()> {
        self.post_unit(
            "experiments/restore",
            json!({ "experiment_id": experiment_id }),
        )
        .await
    }

    pub async fn search_experiments(&self) -> Result<Vec<Experiment>> {
        let body: SearchExperimentsResponse = self
            .post_json("experiments/search", json!({ "max_results": 1000 }))
            .await?;
        Ok(body.experiments)
    }

    /// Create a run with the given name and tags; the run starts RUNNING.
    pub async fn create_run(
        &self,
        experiment_id: &str,
        run_name: &str,
        tags: &[(&str, &str)],
    ) -> Result<Run> {
        let tags: Vec<serde_json::Value> = tags
            .iter()
            .map(|(k, v)| json!({ "key": k, "value": v }))
            .collect();

        let body: CreateRunResponse = self
            .post_json(
                "runs/create",
                json!({
                    "experiment_id": experiment_id,
                    "run_name": run_name,
                    "start_time": chrono::Utc::now().timestamp_millis(),
                    "tags": tags,
                }),
            )
            .await?;
        Ok(body.run)
    }

    pub async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post_unit(
            "runs/log-parameter",
            json!({ "run_id": run_id, "key": key, "value": value }),
        )
        .await
    }

    pub async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.post_unit(
            "runs/log-metric",
            json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": chrono::Utc::now().timestamp_millis(),
                "step": 0,
            }),
        )
        .await
    }

    pub async fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post_unit(
            "runs/set-tag",
            json!({ "run_id": run_id, "key": key, "value": value }),
        )
        .await
    }

    /// Move a run to a terminal status.
    pub async fn update_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.post_unit(
            "runs/update",
            json!({
                "run_id": run_id,
                "status": status.as_str(),
                "end_time": chrono::Utc::now().timestamp_millis(),
            }),
        )
        .await
    }

    /// Search runs across experiments with a filter string.
    pub async fn search_runs(&self, experiment_ids: &[String], filter: &str) -> Result<Vec<Run>> {
        let body: SearchRunsResponse = self
            .post_json(
                "runs/search",
                json!({
                    "experiment_ids": experiment_ids,
                    "filter": filter,
                    "run_view_type": "ACTIVE_ONLY",
                    "max_results": 1000,
                }),
            )
            .await?;
        Ok(body.runs)
    }

    fn artifact_url(&self, experiment_id: &str, run_id: &str, path: &str) -> String {
        format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}/artifacts/{}",
            self.base_url, experiment_id, run_id, path
        )
    }

    /// Upload artifact bytes through the proxied artifact API.
    pub async fn upload_artifact(
        &self,
        experiment_id: &str,
        run_id: &str,
        path: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let response = self
            .http
            .put(self.artifact_url(experiment_id, run_id, path))
            .body(bytes)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Download artifact bytes through the proxied artifact API.
    pub async fn download_artifact(
        &self,
        experiment_id: &str,
        run_id: &str,
        path: &str,
    ) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(self.artifact_url(experiment_id, run_id, path))
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
