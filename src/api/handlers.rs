use crate::api::AppState;
use crate::automl::{parse_exclude_list, run_search, SearchOptions, SearchOutcome};
use crate::data::{preprocess_for_model, ModelFrame, RawFrame};
use crate::error::{AppError, Result};
use crate::tracking::{RunStatus, MODEL_ARTIFACT_PATH};
use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.model.is_loaded().await {
        "healthy"
    } else {
        "no_model"
    };

    Json(HealthResponse {
        status: status.to_string(),
        mlflow_uri: state.registry.tracking_uri().to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub mlflow_uri: String,
}

#[derive(Debug, Validate)]
struct TrainRequest {
    csv: Vec<u8>,
    #[validate(length(min = 1, message = "target column name must not be empty"))]
    target: String,
    #[validate(range(min = 1, max = 50, message = "max_models must be between 1 and 50"))]
    max_models: usize,
    exclude_algos: String,
}

/// Train models on an uploaded CSV and promote the winner.
///
/// Runs are serialized: a second training request waits for the one in
/// flight rather than racing it for the production tag.
pub async fn train(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TrainResponse>> {
    let _guard = state.train_lock.lock().await;

    let request = parse_train_request(multipart, &state).await?;
    request.validate()?;

    let exclude_algos = parse_exclude_list(&request.exclude_algos)?;

    let raw = RawFrame::from_csv(&request.csv)?;
    let frame = preprocess_for_model(&raw, Some(&request.target))?;
    if frame.target.is_none() {
        return Err(AppError::Validation(format!(
            "Target column '{}' not found in upload",
            request.target
        )));
    }

    let opts = SearchOptions {
        target: request.target.clone(),
        max_models: request.max_models,
        exclude_algos,
        seed: state.config.automl.seed,
        validation_split: state.config.automl.validation_split,
    };

    let experiment_id = state.registry.ensure_experiment().await?;

    let client = state.registry.client();
    let run = client
        .create_run(
            &experiment_id,
            "automl-train",
            &[("environment", "production")],
        )
        .await?;
    let run_id = run.info.run_id.clone();

    info!(
        run_id = %run_id,
        target = %request.target,
        max_models = request.max_models,
        "Starting training run"
    );

    let outcome = match execute_training(&state, &experiment_id, &run_id, frame, opts, &request)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            // Best-effort failure marker; the original error wins
            if let Err(update_err) = client.update_run(&run_id, RunStatus::Failed).await {
                warn!(run_id = %run_id, error = %update_err, "Failed to mark run as failed");
            }
            return Err(e);
        }
    };

    client.update_run(&run_id, RunStatus::Finished).await?;

    // Promote whatever is now the best production model
    let reloaded = state.registry.load_best_model().await;
    state.model.replace(reloaded).await;

    Ok(Json(TrainResponse {
        status: "success".to_string(),
        model_uri: format!("runs:/{}/model", run_id),
        leaderboard: outcome.leaderboard.to_nested_map(),
    }))
}

/// The search plus all tracking calls tied to an open run.
async fn execute_training(
    state: &AppState,
    experiment_id: &str,
    run_id: &str,
    frame: ModelFrame,
    opts: SearchOptions,
    request: &TrainRequest,
) -> Result<SearchOutcome> {
    let outcome = tokio::task::spawn_blocking(move || run_search(&frame, &opts))
        .await
        .map_err(|e| AppError::Internal(format!("Training task panicked: {}", e)))??;

    let client = state.registry.client();
    client
        .log_param(run_id, "max_models", &request.max_models.to_string())
        .await?;
    client.log_param(run_id, "target", &request.target).await?;
    client
        .log_param(run_id, "excluded_algos", &request.exclude_algos)
        .await?;
    client
        .log_metric(run_id, "log_loss", outcome.leader_log_loss)
        .await?;
    client.log_metric(run_id, "auc", outcome.leader_auc).await?;
    client
        .set_tag(run_id, "model_id", &outcome.leader.model_id)
        .await?;

    let bytes = serde_json::to_vec(&outcome.leader)?;
    client
        .upload_artifact(experiment_id, run_id, MODEL_ARTIFACT_PATH, bytes)
        .await?;

    Ok(outcome)
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub status: String,
    pub model_uri: String,
    pub leaderboard: serde_json::Value,
}

/// Score an uploaded CSV through the current production model.
pub async fn predict(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PredictResponse>> {
    let Some(model) = state.model.current().await else {
        return Err(AppError::ModelUnavailable);
    };

    let csv = parse_file_upload(multipart).await?;
    let raw = RawFrame::from_csv(&csv)?;
    // Uploads may carry the target column; it must not leak into features
    let frame = preprocess_for_model(&raw, Some(&model.artifact.target))?;

    let scored = {
        let model = model.clone();
        tokio::task::spawn_blocking(move || model.artifact.score(&frame))
            .await
            .map_err(|e| AppError::Internal(format!("Scoring task panicked: {}", e)))??
    };

    info!(
        model_id = %model.model_id,
        rows = scored.p1.len(),
        targeted = scored.targeted_customers(),
        "Scored upload"
    );

    Ok(Json(PredictResponse {
        predictions: scored.to_nested_map(),
        model_version: model.model_id.clone(),
        average_probability: scored.average_probability(),
        targeted_customers: scored.targeted_customers(),
    }))
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predictions: serde_json::Value,
    pub model_version: String,
    pub average_probability: f64,
    pub targeted_customers: usize,
}

async fn parse_train_request(mut multipart: Multipart, state: &AppState) -> Result<TrainRequest> {
    let defaults = &state.config.automl;
    let mut csv: Option<Vec<u8>> = None;
    let mut target = defaults.default_target.clone();
    let mut max_models = defaults.default_max_models;
    let mut exclude_algos = defaults.default_exclude_algos.clone();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
                csv = Some(bytes.to_vec());
            }
            Some("target") => target = read_text_field(field, "target").await?,
            Some("max_models") => {
                let text = read_text_field(field, "max_models").await?;
                max_models = text.trim().parse().map_err(|_| {
                    AppError::Validation(format!("max_models must be an integer, got '{}'", text))
                })?;
            }
            Some("exclude_algos") => exclude_algos = read_text_field(field, "exclude_algos").await?,
            _ => {}
        }
    }

    let csv = csv.ok_or_else(|| {
        AppError::Validation("Missing 'file' part in multipart upload".to_string())
    })?;

    Ok(TrainRequest {
        csv,
        target,
        max_models,
        exclude_algos,
    })
}

/// Pull the single `file` part out of a multipart upload.
async fn parse_file_upload(mut multipart: Multipart) -> Result<Vec<u8>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
            return Ok(bytes.to_vec());
        }
    }

    Err(AppError::Validation(
        "Missing 'file' part in multipart upload".to_string(),
    ))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read '{}' field: {}", name, e)))
}
