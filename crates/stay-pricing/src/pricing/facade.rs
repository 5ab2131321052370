use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::calibration::{calibrate, PriceInterval};
use super::currency::{CurrencyCode, CurrencyConverter};
use super::domain::{InputError, ListingInput, MarketId, PriceEstimate, PricingTexts};
use super::error::PricingError;
use super::features::engineer;
use super::inference::{predict, InferenceError};
use super::market::{build_listing_url, MarketArtifacts, MarketRegistry, RegistryHandle};

const DAYS_PER_YEAR: f64 = 365.0;
// 2^63: the first float that no longer fits an i64.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Color scale bounds for the map, in display-currency units per night.
pub const MAP_PRICE_RANGE: (i64, i64) = (10, 200);

/// Single entry point for pricing a listing: one parameterized pipeline for every market.
pub struct PricingService<C> {
    registry: Arc<RegistryHandle>,
    converter: Arc<C>,
    display_currency: CurrencyCode,
}

impl<C> PricingService<C>
where
    C: CurrencyConverter + 'static,
{
    pub fn new(registry: Arc<RegistryHandle>, converter: Arc<C>, display_currency: CurrencyCode) -> Self {
        Self {
            registry,
            converter,
            display_currency,
        }
    }

    pub fn registry(&self) -> Arc<MarketRegistry> {
        self.registry.snapshot()
    }

    pub fn registry_handle(&self) -> &Arc<RegistryHandle> {
        &self.registry
    }

    pub fn display_currency(&self) -> &CurrencyCode {
        &self.display_currency
    }

    /// Runs the full pipeline and returns the numeric estimate.
    pub fn quote(&self, input: &ListingInput) -> Result<PriceEstimate, PricingError> {
        input.validate()?;
        let registry = self.registry.snapshot();
        let artifacts = registry.resolve(&input.market)?;
        if !artifacts.offers_zipcode(&input.zipcode) {
            return Err(InputError::UnknownZipCode {
                market: artifacts.market.clone(),
                zipcode: input.zipcode.clone(),
            }
            .into());
        }

        let features = engineer(input)?;
        debug!(market = %artifacts.market, columns = features.len(), "features engineered");

        let log_price = predict(artifacts, &features)?;
        let native = calibrate(log_price, artifacts.mape_median);
        ensure_finite(&native, artifacts)?;
        debug!(
            market = %artifacts.market,
            expected = native.expected,
            lower = native.lower,
            upper = native.upper,
            "interval calibrated"
        );

        let display = native.try_map(|amount| self.to_display(artifacts, amount))?;
        let point_value = round_half_even(display.expected, artifacts)?;
        let lower_bound = round_half_even(display.lower, artifacts)?;
        let upper_bound = round_half_even(display.upper, artifacts)?;
        let yearly_earnings = round_half_even(
            point_value as f64 * DAYS_PER_YEAR * input.occupancy_rate,
            artifacts,
        )?;

        let estimate = PriceEstimate {
            market: artifacts.market.clone(),
            currency: self.display_currency.clone(),
            point_value,
            lower_bound,
            upper_bound,
            occupancy_assumption: input.occupancy_rate,
            yearly_earnings,
            valuation_date: artifacts.valuation_date,
        };
        info!(
            market = %estimate.market,
            point_value,
            lower_bound,
            upper_bound,
            yearly_earnings,
            currency = %estimate.currency,
            "price estimate resolved"
        );
        Ok(estimate)
    }

    /// Runs the pipeline and renders the three lines shown to the host.
    pub fn estimate(&self, input: &ListingInput) -> Result<PricingTexts, PricingError> {
        self.quote(input).map(|estimate| estimate.texts())
    }

    /// Map view of the market's reference listings, priced in the display currency.
    pub fn overview(&self, market: &MarketId) -> Result<MarketOverview, PricingError> {
        let registry = self.registry.snapshot();
        let artifacts = registry.resolve(market)?;

        let points = artifacts
            .reference
            .listings()
            .iter()
            .map(|listing| -> Result<MapPoint, PricingError> {
                let price = self.to_display(artifacts, listing.price_log.exp())?;
                Ok(MapPoint {
                    listing_no: listing.listing_no,
                    latitude: listing.latitude,
                    longitude: listing.longitude,
                    price: round_half_even(price, artifacts)?,
                    accommodates: listing.accommodates,
                    bedrooms: listing.bedrooms,
                    room_type: listing.room_type.clone(),
                    neighbourhood: listing.neighbourhood_cleansed.clone(),
                    occupancy_rate: listing.occupancy_rate,
                    url: build_listing_url(listing.listing_no),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(market = %artifacts.market, points = points.len(), "market overview built");
        Ok(MarketOverview {
            market: artifacts.market.clone(),
            display_name: artifacts.display_name.clone(),
            dataset_date: artifacts.dataset_date,
            total_listings: points.len(),
            zoom: artifacts.map_zoom,
            currency: self.display_currency.clone(),
            price_range: MAP_PRICE_RANGE,
            headline: format!(
                "{} listings in {} on {}",
                points.len(),
                artifacts.display_name,
                artifacts.dataset_date.format("%Y-%m-%d")
            ),
            points,
        })
    }

    fn to_display(&self, artifacts: &MarketArtifacts, amount: f64) -> Result<f64, PricingError> {
        let converted = self.converter.convert(
            amount,
            &artifacts.native_currency,
            &self.display_currency,
            artifacts.valuation_date,
        )?;
        Ok(converted)
    }
}

impl PriceEstimate {
    pub fn texts(&self) -> PricingTexts {
        let symbol = self.currency.symbol();
        let occupancy_pct = (self.occupancy_assumption * 100.0).round() as i64;
        PricingTexts {
            listing_price: format!("Recommended listing price: {symbol}{}", self.point_value),
            price_range: format!(
                "Sensible range: {symbol}{}-{symbol}{}",
                self.lower_bound, self.upper_bound
            ),
            yearly_earnings: format!(
                "Potential yearly earnings: {symbol}{} (at occupancy of {occupancy_pct}%, not considering fees and taxes)",
                self.yearly_earnings
            ),
        }
    }
}

/// Whole-unit rounding with ties going to the even neighbour.
///
/// Amounts that are not finite or do not fit an `i64` point at a broken bundle.
fn round_half_even(value: f64, artifacts: &MarketArtifacts) -> Result<i64, InferenceError> {
    let rounded = value.round_ties_even();
    if !rounded.is_finite() || rounded.abs() >= I64_LIMIT {
        return Err(non_finite(artifacts));
    }
    Ok(rounded as i64)
}

fn ensure_finite(interval: &PriceInterval, artifacts: &MarketArtifacts) -> Result<(), InferenceError> {
    if [interval.lower, interval.expected, interval.upper]
        .iter()
        .all(|value| value.is_finite())
    {
        Ok(())
    } else {
        Err(non_finite(artifacts))
    }
}

fn non_finite(artifacts: &MarketArtifacts) -> InferenceError {
    InferenceError::NonFinite {
        market: artifacts.market.to_string(),
    }
}

/// Reference listings of a market, ready for a map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOverview {
    pub market: MarketId,
    pub display_name: String,
    pub dataset_date: NaiveDate,
    pub total_listings: usize,
    pub zoom: u8,
    pub currency: CurrencyCode,
    pub price_range: (i64, i64),
    pub headline: String,
    pub points: Vec<MapPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub listing_no: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub price: i64,
    pub accommodates: u32,
    pub bedrooms: f64,
    pub room_type: String,
    pub neighbourhood: Option<String>,
    pub occupancy_rate: f64,
    pub url: String,
}
