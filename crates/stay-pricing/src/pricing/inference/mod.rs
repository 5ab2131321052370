//! Applies a market's fitted transformer and regressor to an engineered row.

mod model;
mod transformer;

pub use model::{
    GradientBoostedTrees, LinearModel, PriceModel, RegressionModel, RegressionTree, TreeNode,
};
pub use transformer::{ColumnEncoding, ColumnStep, FeatureTransformer, UnknownCategory};

use tracing::debug;

use super::error::ErrorClass;
use super::features::FeatureVector;
use super::market::MarketArtifacts;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("feature columns {found:?} do not match the transformer schema {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("column '{column}' must hold a {expected} value")]
    CellType {
        column: String,
        expected: &'static str,
    },
    #[error("'{value}' is not a known {column}")]
    UnknownCategory { column: String, value: String },
    #[error("transformer emits {found} inputs but the model expects {expected}")]
    WidthMismatch { expected: usize, found: usize },
    #[error("model for market '{market}' produced a non-finite estimate")]
    NonFinite { market: String },
}

impl InferenceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            InferenceError::UnknownCategory { .. } => ErrorClass::InputDomain,
            InferenceError::SchemaMismatch { .. }
            | InferenceError::CellType { .. }
            | InferenceError::WidthMismatch { .. }
            | InferenceError::NonFinite { .. } => ErrorClass::Configuration,
        }
    }
}

/// Point estimate of the nightly price in log space (native currency).
///
/// Deterministic; any failure points at a broken bundle or schema drift, so nothing is retried.
pub fn predict(artifacts: &MarketArtifacts, features: &FeatureVector) -> Result<f64, InferenceError> {
    let row = artifacts.transformer.transform(features)?;
    let expected = artifacts.model.input_width();
    if row.len() != expected {
        return Err(InferenceError::WidthMismatch {
            expected,
            found: row.len(),
        });
    }

    let log_price = artifacts.model.predict(&row);
    if !log_price.is_finite() {
        return Err(InferenceError::NonFinite {
            market: artifacts.market.to_string(),
        });
    }

    debug!(
        market = %artifacts.market,
        model = artifacts.model.name(),
        log_price,
        "model inference complete"
    );
    Ok(log_price)
}
