use serde::{Deserialize, Serialize};

/// Experiment record as returned by the tracking API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    #[serde(default)]
    pub artifact_location: Option<String>,
    #[serde(default)]
    pub lifecycle_stage: Option<String>,
}

impl Experiment {
    pub fn is_deleted(&self) -> bool {
        self.lifecycle_stage.as_deref() == Some("deleted")
    }
}

/// Run record: identifiers plus logged metrics and tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub info: RunInfo,
    #[serde(default)]
    pub data: RunData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub artifact_uri: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunData {
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub tags: Vec<KeyValue>,
}

impl Run {
    /// Latest logged value for a metric, if present.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.data
            .metrics
            .iter()
            .find(|m| m.key == key)
            .map(|m| m.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: f64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub step: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Terminal run status reported back to the tracking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }
}

// Response envelopes

#[derive(Debug, Deserialize)]
pub(crate) struct GetExperimentResponse {
    pub experiment: Experiment,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateExperimentResponse {
    pub experiment_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchExperimentsResponse {
    #[serde(default)]
    pub experiments: Vec<Experiment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateRunResponse {
    pub run: Run,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchRunsResponse {
    #[serde(default)]
    pub runs: Vec<Run>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_metric_lookup() {
        let run: Run = serde_json::from_value(serde_json::json!({
            "info": {"run_id": "abc", "experiment_id": "1"},
            "data": {
                "metrics": [
                    {"key": "log_loss", "value": 0.31, "timestamp": 0, "step": 0},
                    {"key": "auc", "value": 0.88, "timestamp": 0, "step": 0}
                ],
                "tags": [{"key": "environment", "value": "production"}]
            }
        }))
        .unwrap();

        assert_eq!(run.metric("log_loss"), Some(0.31));
        assert_eq!(run.metric("missing"), None);
    }

    #[test]
    fn test_experiment_deleted_stage() {
        let exp: Experiment = serde_json::from_value(serde_json::json!({
            "experiment_id": "7",
            "name": "demo",
            "lifecycle_stage": "deleted"
        }))
        .unwrap();
        assert!(exp.is_deleted());
    }

    #[test]
    fn test_run_without_data_block() {
        let run: Run = serde_json::from_value(serde_json::json!({
            "info": {"run_id": "abc", "experiment_id": "1"}
        }))
        .unwrap();
        assert!(run.data.metrics.is_empty());
    }
}
