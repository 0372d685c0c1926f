use crate::data::RawFrame;
use crate::error::{AppError, Result};
use ndarray::{Array1, Array2};

/// A frame normalized into the numeric shape the model layer expects.
#[derive(Debug, Clone)]
pub struct ModelFrame {
    /// Feature column names, in matrix order
    pub feature_names: Vec<String>,

    /// Feature matrix (n_rows x n_features)
    pub features: Array2<f64>,

    /// Binary target, present when the target column was in the upload
    pub target: Option<Array1<usize>>,

    /// Row identifiers, present when an id column was in the upload
    pub ids: Option<Vec<String>>,
}

impl ModelFrame {
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    /// Project the feature matrix onto the given column order.
    ///
    /// Used at prediction time to align an upload with the column order a
    /// trained model was fitted on.
    pub fn select(&self, names: &[String]) -> Result<Array2<f64>> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let idx = self
                .feature_names
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| {
                    AppError::Validation(format!("Missing feature column '{}'", name))
                })?;
            indices.push(idx);
        }

        let mut out = Array2::zeros((self.n_rows(), indices.len()));
        for (j, &idx) in indices.iter().enumerate() {
            out.column_mut(j).assign(&self.features.column(idx));
        }
        Ok(out)
    }
}

/// Fixed categorical encodings for the insurance cross-sell schema.
///
/// Encodings are deterministic so that train and predict uploads agree
/// without a fitted encoder travelling with the model.
fn encode_categorical(column: &str, value: &str) -> Result<f64> {
    let encoded = match column {
        "Gender" => match value {
            "Female" => Some(0.0),
            "Male" => Some(1.0),
            _ => None,
        },
        "Vehicle_Age" => match value {
            "< 1 Year" => Some(0.0),
            "1-2 Year" => Some(1.0),
            "> 2 Years" => Some(2.0),
            _ => None,
        },
        "Vehicle_Damage" => match value {
            "No" => Some(0.0),
            "Yes" => Some(1.0),
            _ => None,
        },
        _ => None,
    };

    encoded.ok_or_else(|| {
        AppError::Validation(format!(
            "Unknown value '{}' for categorical column '{}'",
            value, column
        ))
    })
}

fn is_categorical(column: &str) -> bool {
    matches!(column, "Gender" | "Vehicle_Age" | "Vehicle_Damage")
}

fn is_missing(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("na") || value.eq_ignore_ascii_case("nan")
}

/// Separate the identifier column, if any, and return its values.
fn separate_id_col(raw: &RawFrame) -> Option<(usize, Vec<String>)> {
    let idx = raw.columns.iter().position(|c| c.eq_ignore_ascii_case("id"))?;
    let ids = raw.rows.iter().map(|r| r[idx].clone()).collect();
    Some((idx, ids))
}

/// Normalize an uploaded frame into the column schema the model expects.
///
/// Separates the id column, applies the fixed categorical encodings, casts
/// everything else to `f64` (missing cells filled with the column mean) and,
/// when `target` names a column present in the upload, separates it as a
/// binary label vector.
pub fn preprocess_for_model(raw: &RawFrame, target: Option<&str>) -> Result<ModelFrame> {
    let n_rows = raw.n_rows();

    let id_col = separate_id_col(raw);
    let target_idx = target.and_then(|t| raw.column_index(t));

    let mut feature_names = Vec::new();
    let mut feature_indices = Vec::new();
    for (idx, name) in raw.columns.iter().enumerate() {
        if Some(idx) == id_col.as_ref().map(|(i, _)| *i) || Some(idx) == target_idx {
            continue;
        }
        feature_names.push(name.clone());
        feature_indices.push(idx);
    }

    if feature_names.is_empty() {
        return Err(AppError::Validation(
            "Upload has no feature columns after separating id and target".to_string(),
        ));
    }

    // Encode column by column so missing cells can be filled with the mean of
    // the values that did parse.
    let mut features = Array2::zeros((n_rows, feature_names.len()));
    for (j, (&idx, name)) in feature_indices.iter().zip(&feature_names).enumerate() {
        let mut parsed: Vec<Option<f64>> = Vec::with_capacity(n_rows);
        for (row_no, row) in raw.rows.iter().enumerate() {
            let cell = row[idx].as_str();
            let value = if is_missing(cell) {
                None
            } else if is_categorical(name) {
                Some(encode_categorical(name, cell)?)
            } else {
                Some(cell.parse::<f64>().map_err(|_| {
                    AppError::Validation(format!(
                        "Column '{}' has non-numeric value '{}' at row {}",
                        name,
                        cell,
                        row_no + 1
                    ))
                })?)
            };
            parsed.push(value);
        }

        let present: Vec<f64> = parsed.iter().flatten().copied().collect();
        let fill = if present.is_empty() {
            0.0
        } else {
            present.iter().sum::<f64>() / present.len() as f64
        };

        for (i, value) in parsed.into_iter().enumerate() {
            features[[i, j]] = value.unwrap_or(fill);
        }
    }

    // Cast the target to categorical 0/1
    let target_values = match target_idx {
        Some(idx) => {
            let mut labels = Vec::with_capacity(n_rows);
            for (row_no, row) in raw.rows.iter().enumerate() {
                let cell = row[idx].as_str();
                let label = cell.parse::<f64>().ok().and_then(|v| {
                    if v == 0.0 {
                        Some(0)
                    } else if v == 1.0 {
                        Some(1)
                    } else {
                        None
                    }
                });
                match label {
                    Some(l) => labels.push(l),
                    None => {
                        return Err(AppError::Validation(format!(
                            "Target column '{}' has non-binary value '{}' at row {}",
                            raw.columns[idx],
                            cell,
                            row_no + 1
                        )))
                    }
                }
            }
            Some(Array1::from_vec(labels))
        }
        None => None,
    };

    Ok(ModelFrame {
        feature_names,
        features,
        target: target_values,
        ids: id_col.map(|(_, ids)| ids),
    })
}
