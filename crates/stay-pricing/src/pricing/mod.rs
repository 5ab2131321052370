//! Listing pricing pipeline: features, per-market inference, calibration and conversion.
//!
//! A request flows through one parameterized pipeline regardless of market:
//! validate the listing, resolve the market bundle, engineer features, run the fitted
//! transformer and model, widen the log-price into an interval, convert it to the display
//! currency at the market's valuation date and render it.

pub mod calibration;
pub mod currency;
pub mod domain;
pub mod error;
pub mod facade;
pub mod features;
pub mod inference;
pub mod market;
pub mod router;

#[cfg(test)]
mod tests;

pub use calibration::{calibrate, PriceInterval};
pub use currency::{CurrencyCode, CurrencyConverter, CurrencyError, RateTable, RateTableError};
pub use domain::{
    Amenities, CancellationPolicy, InputError, ListingInput, MarketId, PriceEstimate,
    PricingTexts, PropertyType, RoomType, DEFAULT_ZIPCODE,
};
pub use error::{ErrorClass, PricingError};
pub use facade::{MapPoint, MarketOverview, PricingService};
pub use features::{engineer, FeatureError, FeatureValue, FeatureVector};
pub use inference::{predict, InferenceError, PriceModel, RegressionModel};
pub use market::{
    build_listing_url, MarketArtifacts, MarketRegistry, MarketSummary, RegistryError,
    RegistryHandle, RegistrySource, ZipCodeOption,
};
pub use router::{pricing_error_status, pricing_router};
