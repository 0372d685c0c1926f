use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

/// Candidate algorithm family, named the way the training API exposes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum ModelAlgo {
    /// Regularized logistic regression
    #[strum(serialize = "GLM")]
    #[serde(rename = "GLM")]
    Glm,

    /// Decision-tree family
    #[strum(serialize = "DRF")]
    #[serde(rename = "DRF")]
    Drf,

    /// Gaussian naive Bayes
    #[strum(serialize = "NaiveBayes")]
    #[serde(rename = "NaiveBayes")]
    NaiveBayes,
}

/// Parse the comma-separated `exclude_algos` form field.
///
/// Empty segments are ignored; unknown family names are a validation error.
pub fn parse_exclude_list(raw: &str) -> Result<Vec<ModelAlgo>> {
    let mut excluded = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let algo = ModelAlgo::from_str(part).map_err(|_| {
            AppError::Validation(format!("Unknown algorithm family '{}'", part))
        })?;
        if !excluded.contains(&algo) {
            excluded.push(algo);
        }
    }
    Ok(excluded)
}

/// One trainable candidate: a family plus its hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSpec {
    pub algo: ModelAlgo,
    pub params: CandidateParams,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateParams {
    Glm { alpha: f64 },
    Drf { max_depth: u16 },
    NaiveBayes,
}

impl std::fmt::Display for CandidateParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateParams::Glm { alpha } => write!(f, "alpha={}", alpha),
            CandidateParams::Drf { max_depth } => write!(f, "max_depth={}", max_depth),
            CandidateParams::NaiveBayes => write!(f, "default"),
        }
    }
}

impl CandidateSpec {
    /// The full candidate grid, in fixed family order.
    pub fn grid() -> Vec<CandidateSpec> {
        let mut grid = Vec::new();
        for alpha in [0.0, 0.01, 0.1, 1.0] {
            grid.push(CandidateSpec {
                algo: ModelAlgo::Glm,
                params: CandidateParams::Glm { alpha },
            });
        }
        for max_depth in [4, 8, 12] {
            grid.push(CandidateSpec {
                algo: ModelAlgo::Drf,
                params: CandidateParams::Drf { max_depth },
            });
        }
        grid.push(CandidateSpec {
            algo: ModelAlgo::NaiveBayes,
            params: CandidateParams::NaiveBayes,
        });
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algo_roundtrip() {
        assert_eq!(ModelAlgo::from_str("GLM").unwrap(), ModelAlgo::Glm);
        assert_eq!(ModelAlgo::from_str("DRF").unwrap(), ModelAlgo::Drf);
        assert_eq!(
            ModelAlgo::from_str("NaiveBayes").unwrap(),
            ModelAlgo::NaiveBayes
        );
        assert_eq!(ModelAlgo::Glm.to_string(), "GLM");
    }

    #[test]
    fn test_parse_exclude_list() {
        let excluded = parse_exclude_list("GLM,DRF").unwrap();
        assert_eq!(excluded, vec![ModelAlgo::Glm, ModelAlgo::Drf]);
    }

    #[test]
    fn test_parse_exclude_list_tolerates_spacing_and_empties() {
        let excluded = parse_exclude_list(" GLM , ,DRF,").unwrap();
        assert_eq!(excluded, vec![ModelAlgo::Glm, ModelAlgo::Drf]);
        assert!(parse_exclude_list("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_exclude_list_rejects_unknown() {
        let err = parse_exclude_list("GLM,DeepLearning").unwrap_err();
        assert!(err.to_string().contains("DeepLearning"));
    }

    #[test]
    fn test_grid_family_order() {
        let grid = CandidateSpec::grid();
        assert_eq!(grid.len(), 8);
        assert_eq!(grid[0].algo, ModelAlgo::Glm);
        assert_eq!(grid.last().unwrap().algo, ModelAlgo::NaiveBayes);
    }
}
