//! Integration tests for the tracking client and model registry against a
//! mocked MLflow-compatible server.

use crosssell_mlops::automl::{run_search, SearchOptions};
use crosssell_mlops::config::TrackingConfig;
use crosssell_mlops::data::{preprocess_for_model, RawFrame};
use crosssell_mlops::tracking::{MlflowClient, ModelRegistry};
use mockito::Matcher;

fn tracking_config(uri: &str) -> TrackingConfig {
    TrackingConfig {
        uri: uri.to_string(),
        experiment_name: "demomlops3-insurance-cross-sell".to_string(),
        artifact_location: "mlflow-artifacts:/".to_string(),
        request_timeout_secs: 5,
    }
}

fn registry_for(uri: &str) -> ModelRegistry {
    let config = tracking_config(uri);
    let client = MlflowClient::new(&config).unwrap();
    ModelRegistry::new(client, config)
}

/// Train a small model and return its serialized artifact bytes.
fn trained_artifact_bytes() -> Vec<u8> {
    let mut csv = String::from("Age,Annual_Premium,Response\n");
    for i in 0..40 {
        if i % 2 == 0 {
            csv.push_str(&format!("{},{},1\n", 50 + i % 10, 40000 + i));
        } else {
            csv.push_str(&format!("{},{},0\n", 20 + i % 10, 10000 + i));
        }
    }
    let raw = RawFrame::from_csv(csv.as_bytes()).unwrap();
    let frame = preprocess_for_model(&raw, Some("Response")).unwrap();
    let opts = SearchOptions {
        target: "Response".to_string(),
        max_models: 3,
        exclude_algos: vec![],
        seed: 42,
        validation_split: 0.2,
    };
    let outcome = run_search(&frame, &opts).unwrap();
    serde_json::to_vec(&outcome.leader).unwrap()
}

#[tokio::test]
async fn test_ensure_experiment_creates_when_absent() {
    let mut server = mockito::Server::new_async().await;

    let get = server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::UrlEncoded(
            "experiment_name".into(),
            "demomlops3-insurance-cross-sell".into(),
        ))
        .with_status(404)
        .with_body(r#"{"error_code": "RESOURCE_DOES_NOT_EXIST", "message": "not found"}"#)
        .create_async()
        .await;

    let create = server
        .mock("POST", "/api/2.0/mlflow/experiments/create")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "name": "demomlops3-insurance-cross-sell"
        })))
        .with_status(200)
        .with_body(r#"{"experiment_id": "42"}"#)
        .create_async()
        .await;

    let registry = registry_for(&server.url());
    let experiment_id = registry.ensure_experiment().await.unwrap();

    assert_eq!(experiment_id, "42");
    get.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn test_ensure_experiment_restores_deleted() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"experiment": {"experiment_id": "7", "name": "demomlops3-insurance-cross-sell", "lifecycle_stage": "deleted"}}"#,
        )
        .create_async()
        .await;

    let restore = server
        .mock("POST", "/api/2.0/mlflow/experiments/restore")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "experiment_id": "7"
        })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let registry = registry_for(&server.url());
    let experiment_id = registry.ensure_experiment().await.unwrap();

    assert_eq!(experiment_id, "7");
    restore.assert_async().await;
}

#[tokio::test]
async fn test_ensure_experiment_is_idempotent_for_active_experiment() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("GET", "/api/2.0/mlflow/experiments/get-by-name")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"experiment": {"experiment_id": "3", "name": "demomlops3-insurance-cross-sell", "lifecycle_stage": "active"}}"#,
        )
        .expect(2)
        .create_async()
        .await;

    let registry = registry_for(&server.url());
    assert_eq!(registry.ensure_experiment().await.unwrap(), "3");
    assert_eq!(registry.ensure_experiment().await.unwrap(), "3");
}

#[tokio::test]
async fn test_load_best_model_picks_lowest_log_loss() {
    let mut server = mockito::Server::new_async().await;
    let artifact = trained_artifact_bytes();

    server
        .mock("POST", "/api/2.0/mlflow/experiments/search")
        .with_status(200)
        .with_body(
            r#"{"experiments": [{"experiment_id": "1", "name": "demomlops3-insurance-cross-sell", "lifecycle_stage": "active"}]}"#,
        )
        .create_async()
        .await;

    server
        .mock("POST", "/api/2.0/mlflow/runs/search")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "filter": "tags.environment = 'production'"
        })))
        .with_status(200)
        .with_body(
            r#"{
                "runs": [
                    {
                        "info": {"run_id": "worse", "experiment_id": "1"},
                        "data": {"metrics": [{"key": "log_loss", "value": 0.61, "timestamp": 0, "step": 0}]}
                    },
                    {
                        "info": {"run_id": "better", "experiment_id": "1"},
                        "data": {"metrics": [{"key": "log_loss", "value": 0.22, "timestamp": 0, "step": 0}]}
                    }
                ]
            }"#,
        )
        .create_async()
        .await;

    let download = server
        .mock(
            "GET",
            "/api/2.0/mlflow-artifacts/artifacts/1/better/artifacts/model/model.json",
        )
        .with_status(200)
        .with_body(artifact)
        .create_async()
        .await;

    let registry = registry_for(&server.url());
    let model = registry.load_best_model().await.unwrap();

    assert_eq!(model.run_id, "better");
    assert_eq!(model.model_uri, "runs:/better/model");
    assert!(!model.model_id.is_empty());
    download.assert_async().await;
}

#[tokio::test]
async fn test_load_best_model_none_when_no_production_runs() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/api/2.0/mlflow/experiments/search")
        .with_status(200)
        .with_body(
            r#"{"experiments": [{"experiment_id": "1", "name": "demomlops3-insurance-cross-sell", "lifecycle_stage": "active"}]}"#,
        )
        .create_async()
        .await;

    server
        .mock("POST", "/api/2.0/mlflow/runs/search")
        .with_status(200)
        .with_body(r#"{"runs": []}"#)
        .create_async()
        .await;

    let registry = registry_for(&server.url());
    assert!(registry.load_best_model().await.is_none());
}

#[tokio::test]
async fn test_load_best_model_none_when_no_experiments() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/api/2.0/mlflow/experiments/search")
        .with_status(200)
        .with_body(r#"{"experiments": []}"#)
        .create_async()
        .await;

    let registry = registry_for(&server.url());
    assert!(registry.load_best_model().await.is_none());
}

#[tokio::test]
async fn test_load_best_model_none_on_server_error() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/api/2.0/mlflow/experiments/search")
        .with_status(500)
        .with_body(r#"{"error_code": "INTERNAL_ERROR", "message": "boom"}"#)
        .create_async()
        .await;

    let registry = registry_for(&server.url());
    assert!(registry.load_best_model().await.is_none());
}

#[tokio::test]
async fn test_load_best_model_ignores_runs_without_log_loss() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/api/2.0/mlflow/experiments/search")
        .with_status(200)
        .with_body(
            r#"{"experiments": [{"experiment_id": "1", "name": "demomlops3-insurance-cross-sell", "lifecycle_stage": "active"}]}"#,
        )
        .create_async()
        .await;

    server
        .mock("POST", "/api/2.0/mlflow/runs/search")
        .with_status(200)
        .with_body(
            r#"{
                "runs": [
                    {
                        "info": {"run_id": "metricless", "experiment_id": "1"},
                        "data": {"metrics": [{"key": "auc", "value": 0.9, "timestamp": 0, "step": 0}]}
                    }
                ]
            }"#,
        )
        .create_async()
        .await;

    let registry = registry_for(&server.url());
    assert!(registry.load_best_model().await.is_none());
}

#[tokio::test]
async fn test_client_surfaces_api_error_message() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/api/2.0/mlflow/experiments/create")
        .with_status(400)
        .with_body(r#"{"error_code": "INVALID_PARAMETER_VALUE", "message": "bad name"}"#)
        .create_async()
        .await;

    let config = tracking_config(&server.url());
    let client = MlflowClient::new(&config).unwrap();
    let err = client
        .create_experiment("demo", "mlflow-artifacts:/")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("bad name"));
}
