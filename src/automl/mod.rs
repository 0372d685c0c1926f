//! Bounded AutoML-style model search for binary classification.
//!
//! Candidate algorithm families mirror the H2O naming the API exposes
//! (`GLM`, `DRF`, `NaiveBayes`): a fixed hyperparameter grid is trained,
//! scored on a held-out split and ranked by log-loss.

pub mod algo;
pub mod metrics;
pub mod model;
pub mod search;

pub use algo::{parse_exclude_list, CandidateSpec, ModelAlgo};
pub use model::{FittedModel, ModelArtifact, ScoredPredictions};
pub use search::{run_search, Leaderboard, LeaderboardEntry, SearchOptions, SearchOutcome};
