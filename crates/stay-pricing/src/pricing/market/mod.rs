//! Per-market artifacts and the registry that owns them.

mod bundle;
mod reference;
mod registry;

pub use bundle::{BundleManifest, BUNDLE_FILE, REFERENCE_FILE};
pub use reference::{build_listing_url, ReferenceDataset, ReferenceListing, ZipCodeOption};
pub use registry::{MarketRegistry, RegistryError, RegistryHandle, RegistrySource};

use chrono::NaiveDate;
use serde::Serialize;

use super::currency::CurrencyCode;
use super::domain::MarketId;
use super::features::FeatureVector;
use super::inference::{FeatureTransformer, PriceModel, RegressionModel};

/// Everything needed to price listings in one market. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct MarketArtifacts {
    pub market: MarketId,
    pub display_name: String,
    /// Snapshot date of the listings the model was trained on.
    pub dataset_date: NaiveDate,
    /// Date the exchange rate is pinned to when rendering prices.
    pub valuation_date: NaiveDate,
    pub native_currency: CurrencyCode,
    /// Median absolute percentage error of the model, as a fraction.
    pub mape_median: f64,
    pub map_zoom: u8,
    pub zipcodes: Vec<String>,
    pub transformer: FeatureTransformer,
    pub model: RegressionModel,
    pub reference: ReferenceDataset,
}

impl MarketArtifacts {
    pub fn from_manifest(manifest: BundleManifest, reference: ReferenceDataset) -> Result<Self, String> {
        let BundleManifest {
            market,
            display_name,
            dataset_date,
            valuation_date,
            native_currency,
            mape_median,
            map_zoom,
            zipcodes,
            transformer,
            model,
        } = manifest;

        let display_name = display_name.unwrap_or_else(|| market.display_name());
        let artifacts = Self {
            market,
            display_name,
            dataset_date,
            valuation_date,
            native_currency,
            mape_median,
            map_zoom,
            zipcodes,
            transformer,
            model,
            reference,
        };
        artifacts.validate()?;
        Ok(artifacts)
    }

    /// Consistency checks that would otherwise surface as wrong prices at request time.
    pub fn validate(&self) -> Result<(), String> {
        if !self.mape_median.is_finite() || !(0.0..=1.0).contains(&self.mape_median) {
            return Err(format!(
                "mape_median must be a fraction between 0 and 1, got {}",
                self.mape_median
            ));
        }
        if self.zipcodes.is_empty() {
            return Err("zip-code catalog is empty".to_string());
        }
        for listing in self.reference.listings() {
            listing.validate()?;
        }
        self.transformer.validate()?;
        self.transformer
            .check_schema(FeatureVector::COLUMNS)
            .map_err(|err| err.to_string())?;
        self.model.validate()?;

        let produced = self.transformer.output_width();
        let consumed = self.model.input_width();
        if produced != consumed {
            return Err(format!(
                "transformer emits {produced} inputs but the {} model expects {consumed}",
                self.model.name()
            ));
        }
        Ok(())
    }

    pub fn offers_zipcode(&self, zipcode: &str) -> bool {
        let zipcode = zipcode.trim();
        self.zipcodes.iter().any(|known| known == zipcode)
    }

    pub fn zipcode_options(&self) -> Vec<ZipCodeOption> {
        self.zipcodes
            .iter()
            .map(|value| ZipCodeOption::from_value(value))
            .collect()
    }

    pub fn summary(&self) -> MarketSummary {
        MarketSummary {
            market: self.market.clone(),
            display_name: self.display_name.clone(),
            dataset_date: self.dataset_date,
            valuation_date: self.valuation_date,
            native_currency: self.native_currency.clone(),
            model: self.model.name(),
            total_listings: self.reference.len(),
            zipcodes: self.zipcodes.len(),
        }
    }
}

/// Listing-friendly description of a loaded market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub market: MarketId,
    pub display_name: String,
    pub dataset_date: NaiveDate,
    pub valuation_date: NaiveDate,
    pub native_currency: CurrencyCode,
    pub model: &'static str,
    pub total_listings: usize,
    pub zipcodes: usize,
}
