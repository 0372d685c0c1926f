use crate::automl::algo::{CandidateParams, CandidateSpec, ModelAlgo};
use crate::data::ModelFrame;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use linfa::Dataset;
use linfa::traits::Fit;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::naive_bayes::gaussian::GaussianNB;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters, SplitCriterion,
};

/// A fitted candidate model.
///
/// The GLM family produces calibrated probabilities; the tree and naive
/// Bayes families predict hard labels, surfaced as one-hot probabilities.
#[derive(Debug, Serialize, Deserialize)]
pub enum FittedModel {
    Glm(FittedLogisticRegression<f64, usize>),
    Drf(DecisionTreeClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>),
    NaiveBayes(GaussianNB<f64, usize, DenseMatrix<f64>, Vec<usize>>),
}

fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}

impl FittedModel {
    /// Train one candidate on the given feature matrix and binary labels.
    pub fn fit(spec: &CandidateSpec, x: &Array2<f64>, y: &Array1<usize>) -> Result<Self> {
        match spec.params {
            CandidateParams::Glm { alpha } => {
                let dataset = Dataset::new(x.clone(), y.clone());
                let model = LogisticRegression::default()
                    .alpha(alpha)
                    .max_iterations(200)
                    .fit(&dataset)
                    .map_err(|e| {
                        AppError::Training(format!("Failed to train GLM candidate: {}", e))
                    })?;
                Ok(FittedModel::Glm(model))
            }
            CandidateParams::Drf { max_depth } => {
                let dense = ndarray_to_densematrix(x);
                let labels: Vec<i32> = y.iter().map(|&v| v as i32).collect();
                let params = DecisionTreeClassifierParameters::default()
                    .with_max_depth(max_depth)
                    .with_criterion(SplitCriterion::Gini);
                let model = DecisionTreeClassifier::fit(&dense, &labels, params).map_err(|e| {
                    AppError::Training(format!("Failed to train DRF candidate: {}", e))
                })?;
                Ok(FittedModel::Drf(model))
            }
            CandidateParams::NaiveBayes => {
                let dense = ndarray_to_densematrix(x);
                let labels: Vec<usize> = y.to_vec();
                let model = GaussianNB::fit(&dense, &labels, Default::default()).map_err(|e| {
                    AppError::Training(format!("Failed to train NaiveBayes candidate: {}", e))
                })?;
                Ok(FittedModel::NaiveBayes(model))
            }
        }
    }

    /// Positive-class probability per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedModel::Glm(model) => Ok(model.predict_probabilities(x)),
            FittedModel::Drf(model) => {
                let dense = ndarray_to_densematrix(x);
                let labels = model
                    .predict(&dense)
                    .map_err(|e| AppError::Internal(format!("Prediction failed: {}", e)))?;
                Ok(labels.iter().map(|&l| l as f64).collect())
            }
            FittedModel::NaiveBayes(model) => {
                let dense = ndarray_to_densematrix(x);
                let labels = model
                    .predict(&dense)
                    .map_err(|e| AppError::Internal(format!("Prediction failed: {}", e)))?;
                Ok(labels.iter().map(|&l| l as f64).collect())
            }
        }
    }
}

/// The serializable training result: fitted model plus the metadata needed
/// to score future uploads. This is the logged artifact and the in-memory
/// predictor.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Model identifier, also reported as `model_version` by predictions
    pub model_id: String,

    /// Algorithm family of the winning candidate
    pub algo: ModelAlgo,

    /// Target column the model was trained against
    pub target: String,

    /// Feature columns, in the order the model was fitted on
    pub feature_names: Vec<String>,

    /// Training timestamp
    pub trained_at: DateTime<Utc>,

    /// The fitted model
    pub model: FittedModel,
}

impl ModelArtifact {
    /// Score a preprocessed upload through this model.
    ///
    /// The upload's columns are aligned to the artifact's feature order; a
    /// missing feature column is a validation error.
    pub fn score(&self, frame: &ModelFrame) -> Result<ScoredPredictions> {
        let x = frame.select(&self.feature_names)?;
        let p1 = self.model.predict_proba(&x)?;
        Ok(ScoredPredictions::from_probabilities(p1))
    }
}

/// Per-row predictions plus the summary statistics the API reports.
#[derive(Debug, Clone)]
pub struct ScoredPredictions {
    /// Predicted label per row (positive-class probability over 0.5)
    pub labels: Vec<usize>,

    /// Positive-class probability per row
    pub p1: Array1<f64>,
}

impl ScoredPredictions {
    pub fn from_probabilities(p1: Array1<f64>) -> Self {
        let labels = p1.iter().map(|&p| usize::from(p > 0.5)).collect();
        Self { labels, p1 }
    }

    /// Mean positive-class probability over all rows
    pub fn average_probability(&self) -> f64 {
        self.p1.mean().unwrap_or(0.0)
    }

    /// Count of rows whose positive-class probability exceeds 0.5
    pub fn targeted_customers(&self) -> usize {
        self.p1.iter().filter(|&&p| p > 0.5).count()
    }

    /// Column-oriented nested mapping (`predict`/`p0`/`p1`, keyed by row
    /// index), the shape a pandas `DataFrame.to_dict()` produces.
    pub fn to_nested_map(&self) -> serde_json::Value {
        let mut predict = serde_json::Map::new();
        let mut p0 = serde_json::Map::new();
        let mut p1 = serde_json::Map::new();

        for (i, (&label, &prob)) in self.labels.iter().zip(self.p1.iter()).enumerate() {
            let key = i.to_string();
            predict.insert(key.clone(), serde_json::json!(label));
            p0.insert(key.clone(), serde_json::json!(1.0 - prob));
            p1.insert(key, serde_json::json!(prob));
        }

        serde_json::json!({
            "predict": predict,
            "p0": p0,
            "p1": p1,
        })
    }
}
