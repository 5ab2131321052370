use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::InferenceError;
use crate::pricing::features::{FeatureValue, FeatureVector};

/// Fitted column transformer exported from the training pipeline.
///
/// Each step consumes exactly one engineered column, in order, and emits one or more model
/// inputs. The ordered list of step columns is the schema the market was fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransformer {
    pub columns: Vec<ColumnStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStep {
    pub column: String,
    #[serde(flatten)]
    pub encoding: ColumnEncoding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// `(x - mean) / scale`
    StandardScale { mean: f64, scale: f64 },
    Passthrough,
    OneHot {
        categories: Vec<String>,
        #[serde(default)]
        handle_unknown: UnknownCategory,
    },
}

/// What a one-hot step does with a category it was not fit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategory {
    /// Emit an all-zero block.
    #[default]
    Ignore,
    Error,
}

impl ColumnEncoding {
    fn width(&self) -> usize {
        match self {
            ColumnEncoding::StandardScale { .. } | ColumnEncoding::Passthrough => 1,
            ColumnEncoding::OneHot { categories, .. } => categories.len(),
        }
    }
}

impl FeatureTransformer {
    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|step| step.column.as_str())
    }

    /// Number of model inputs produced per row.
    pub fn output_width(&self) -> usize {
        self.columns.iter().map(|step| step.encoding.width()).sum()
    }

    /// Structural checks run once when a bundle is loaded.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for step in &self.columns {
            if !seen.insert(step.column.as_str()) {
                return Err(format!("column '{}' is declared twice", step.column));
            }
            match &step.encoding {
                ColumnEncoding::StandardScale { mean, scale } => {
                    if !mean.is_finite() || !scale.is_finite() || *scale == 0.0 {
                        return Err(format!(
                            "column '{}' has an unusable scaler (mean {mean}, scale {scale})",
                            step.column
                        ));
                    }
                }
                ColumnEncoding::Passthrough => {}
                ColumnEncoding::OneHot { categories, .. } => {
                    if categories.is_empty() {
                        return Err(format!("column '{}' has no categories", step.column));
                    }
                    let distinct: HashSet<_> = categories.iter().collect();
                    if distinct.len() != categories.len() {
                        return Err(format!(
                            "column '{}' lists a category twice",
                            step.column
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Fails unless `columns` matches the declared schema exactly, names and order.
    pub fn check_schema<'a, I>(&self, columns: I) -> Result<(), InferenceError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let found: Vec<&str> = columns.into_iter().collect();
        let matches = found.len() == self.columns.len()
            && found
                .iter()
                .zip(self.input_columns())
                .all(|(found, expected)| *found == expected);

        if matches {
            Ok(())
        } else {
            Err(InferenceError::SchemaMismatch {
                expected: self.input_columns().map(str::to_string).collect(),
                found: found.into_iter().map(str::to_string).collect(),
            })
        }
    }

    pub fn transform(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        self.check_schema(features.columns())?;

        let mut row = Vec::with_capacity(self.output_width());
        for (step, (column, value)) in self.columns.iter().zip(features.cells()) {
            match &step.encoding {
                ColumnEncoding::StandardScale { mean, scale } => {
                    row.push((numeric(column, value)? - mean) / scale);
                }
                ColumnEncoding::Passthrough => row.push(numeric(column, value)?),
                ColumnEncoding::OneHot {
                    categories,
                    handle_unknown,
                } => {
                    let category = value.as_category().ok_or(InferenceError::CellType {
                        column: (*column).to_string(),
                        expected: "categorical",
                    })?;
                    let hot = categories.iter().position(|known| known == category);
                    if hot.is_none() && *handle_unknown == UnknownCategory::Error {
                        return Err(InferenceError::UnknownCategory {
                            column: (*column).to_string(),
                            value: category.to_string(),
                        });
                    }
                    row.extend((0..categories.len()).map(|idx| {
                        if Some(idx) == hot {
                            1.0
                        } else {
                            0.0
                        }
                    }));
                }
            }
        }

        Ok(row)
    }
}

fn numeric(column: &str, value: &FeatureValue) -> Result<f64, InferenceError> {
    value.as_numeric().ok_or_else(|| InferenceError::CellType {
        column: column.to_string(),
        expected: "numeric",
    })
}
