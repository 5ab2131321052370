use serde::Serialize;

use super::currency::CurrencyError;
use super::domain::{InputError, MarketId};
use super::features::FeatureError;
use super::inference::InferenceError;

/// How a failure should be treated at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Deployment or build defect (unknown market, schema drift, broken artifact).
    Configuration,
    /// The request itself is out of domain; reject it and carry on.
    InputDomain,
    /// A required reference value (exchange rate) is missing for the pinned date.
    ExternalData,
}

/// Error raised while pricing a single listing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("unknown market '{0}'")]
    UnknownMarket(MarketId),
    #[error(transparent)]
    InvalidInput(#[from] InputError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Currency(#[from] CurrencyError),
}

impl PricingError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PricingError::UnknownMarket(_) => ErrorClass::Configuration,
            PricingError::InvalidInput(_) | PricingError::Feature(_) => ErrorClass::InputDomain,
            PricingError::Inference(err) => err.class(),
            PricingError::Currency(err) => err.class(),
        }
    }
}
