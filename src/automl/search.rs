use crate::automl::algo::{CandidateSpec, ModelAlgo};
use crate::automl::metrics::{log_loss, roc_auc};
use crate::automl::model::{FittedModel, ModelArtifact};
use crate::data::ModelFrame;
use crate::error::{AppError, Result};
use chrono::Utc;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Parameters for one bounded search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Target column name (already separated in the frame)
    pub target: String,

    /// Upper bound on trained candidates
    pub max_models: usize,

    /// Families removed from the grid before truncation
    pub exclude_algos: Vec<ModelAlgo>,

    /// Seed for the train/validation shuffle
    pub seed: u64,

    /// Fraction of rows held out for scoring
    pub validation_split: f64,
}

/// One scored candidate on the leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub model_id: String,
    pub algo: String,
    pub params: String,
    pub log_loss: f64,
    pub auc: f64,
}

/// Candidates ranked ascending by validation log-loss.
#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Column-oriented nested mapping keyed by leaderboard rank, the shape
    /// a pandas `DataFrame.to_dict()` produces.
    pub fn to_nested_map(&self) -> serde_json::Value {
        let mut model_id = serde_json::Map::new();
        let mut algo = serde_json::Map::new();
        let mut params = serde_json::Map::new();
        let mut logloss = serde_json::Map::new();
        let mut auc = serde_json::Map::new();

        for (i, entry) in self.entries.iter().enumerate() {
            let key = i.to_string();
            model_id.insert(key.clone(), serde_json::json!(entry.model_id));
            algo.insert(key.clone(), serde_json::json!(entry.algo));
            params.insert(key.clone(), serde_json::json!(entry.params));
            logloss.insert(key.clone(), serde_json::json!(entry.log_loss));
            auc.insert(key, serde_json::json!(entry.auc));
        }

        serde_json::json!({
            "model_id": model_id,
            "algo": algo,
            "params": params,
            "log_loss": logloss,
            "auc": auc,
        })
    }
}

/// Result of a bounded search: the winning artifact plus the ranking.
#[derive(Debug)]
pub struct SearchOutcome {
    pub leader: ModelArtifact,
    pub leader_log_loss: f64,
    pub leader_auc: f64,
    pub leaderboard: Leaderboard,
}

const MIN_TRAINING_ROWS: usize = 5;

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Run a bounded model search over the candidate grid.
///
/// Candidates are trained in parallel on a seeded 80/20-style split and
/// ranked ascending by validation log-loss. Candidates that fail to train
/// are logged and skipped; the search fails only when nothing trains.
pub fn run_search(frame: &ModelFrame, opts: &SearchOptions) -> Result<SearchOutcome> {
    let labels = frame.target.as_ref().ok_or_else(|| {
        AppError::Validation(format!("Target column '{}' not found in upload", opts.target))
    })?;

    let n_rows = frame.n_rows();
    if n_rows < MIN_TRAINING_ROWS {
        return Err(AppError::Validation(format!(
            "Training requires at least {} rows, got {}",
            MIN_TRAINING_ROWS, n_rows
        )));
    }

    let n_pos = labels.iter().filter(|&&y| y == 1).count();
    if n_pos == 0 || n_pos == n_rows {
        return Err(AppError::Validation(
            "Target column has a single class; binary training needs both".to_string(),
        ));
    }

    let candidates: Vec<CandidateSpec> = CandidateSpec::grid()
        .into_iter()
        .filter(|c| !opts.exclude_algos.contains(&c.algo))
        .take(opts.max_models)
        .collect();

    if candidates.is_empty() {
        return Err(AppError::Validation(
            "All algorithm families are excluded; nothing to train".to_string(),
        ));
    }

    let (x_train, y_train, x_val, y_val) = split_frame(frame, labels, opts);

    info!(
        candidates = candidates.len(),
        train_rows = x_train.nrows(),
        validation_rows = x_val.nrows(),
        "Starting model search"
    );

    // Train and score candidates in parallel
    let scored: Vec<(CandidateSpec, Result<(FittedModel, f64, f64)>)> = candidates
        .into_par_iter()
        .map(|spec| {
            let outcome = FittedModel::fit(&spec, &x_train, &y_train).and_then(|model| {
                let p1 = model.predict_proba(&x_val)?;
                let ll = log_loss(&y_val, p1.view());
                let auc = roc_auc(&y_val, p1.view());
                Ok((model, ll, auc))
            });
            (spec, outcome)
        })
        .collect();

    let mut ranked: Vec<(CandidateSpec, FittedModel, f64, f64)> = Vec::new();
    for (spec, outcome) in scored {
        match outcome {
            Ok((model, ll, auc)) => ranked.push((spec, model, ll, auc)),
            Err(e) => warn!(
                algo = %spec.algo,
                params = %spec.params,
                error = %e,
                "Candidate failed, skipping"
            ),
        }
    }

    if ranked.is_empty() {
        return Err(AppError::Internal(
            "Every candidate failed to train".to_string(),
        ));
    }

    ranked.sort_by(|a, b| a.2.total_cmp(&b.2));

    let entries: Vec<LeaderboardEntry> = ranked
        .iter()
        .map(|(spec, _, ll, auc)| LeaderboardEntry {
            model_id: format!("{}_{}", spec.algo, short_id()),
            algo: spec.algo.to_string(),
            params: spec.params.to_string(),
            log_loss: *ll,
            auc: *auc,
        })
        .collect();

    let leader_entry = entries[0].clone();
    let (leader_spec, leader_model, leader_ll, leader_auc) = ranked.swap_remove(0);

    info!(
        model_id = %leader_entry.model_id,
        log_loss = leader_ll,
        auc = leader_auc,
        "Model search finished"
    );

    Ok(SearchOutcome {
        leader: ModelArtifact {
            model_id: leader_entry.model_id.clone(),
            algo: leader_spec.algo,
            target: opts.target.clone(),
            feature_names: frame.feature_names.clone(),
            trained_at: Utc::now(),
            model: leader_model,
        },
        leader_log_loss: leader_ll,
        leader_auc: leader_auc,
        leaderboard: Leaderboard { entries },
    })
}

/// Seeded shuffle and split into train/validation partitions.
fn split_frame(
    frame: &ModelFrame,
    labels: &Array1<usize>,
    opts: &SearchOptions,
) -> (Array2<f64>, Array1<usize>, Array2<f64>, Vec<usize>) {
    let n_rows = frame.n_rows();
    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(opts.seed);
    indices.shuffle(&mut rng);

    let n_val = ((n_rows as f64 * opts.validation_split).round() as usize).clamp(1, n_rows - 1);
    let (val_idx, train_idx) = indices.split_at(n_val);

    let take = |idx: &[usize]| -> (Array2<f64>, Vec<usize>) {
        let x = frame.features.select(Axis(0), idx);
        let y = idx.iter().map(|&i| labels[i]).collect();
        (x, y)
    };

    let (x_train, y_train) = take(train_idx);
    let (x_val, y_val) = take(val_idx);

    (x_train, Array1::from_vec(y_train), x_val, y_val)
}
