use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::pricing::currency::{CurrencyCode, RateTable};
use crate::pricing::domain::{
    CancellationPolicy, ListingInput, MarketId, PropertyType, RoomType,
};
use crate::pricing::facade::PricingService;
use crate::pricing::features::FeatureVector;
use crate::pricing::inference::{
    ColumnEncoding, ColumnStep, FeatureTransformer, LinearModel, RegressionModel, UnknownCategory,
};
use crate::pricing::market::{
    BundleManifest, MarketArtifacts, MarketRegistry, ReferenceDataset, ReferenceListing,
    RegistryHandle, BUNDLE_FILE, REFERENCE_FILE,
};

pub(super) const RATES: &str = "Date,USD,JPY,GBP,\n\
2020-03-17,1.0998,117.72,0.90853,\n\
2020-03-16,1.1157,119.07,0.90778,\n\
2020-03-13,1.1104,119.36,0.89710,\n";

pub(super) const ZIPCODES: [&str; 2] = ["zip_10115", "zip_other"];

pub(super) fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn usd() -> CurrencyCode {
    CurrencyCode::parse("USD").expect("valid code")
}

pub(super) fn rates() -> RateTable {
    RateTable::from_reader(Cursor::new(RATES)).expect("rate sample parses")
}

fn labels<T: ToString>(values: &[T]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

/// Passthrough for every numeric column, one-hot for the four categorical ones.
pub(super) fn transformer() -> FeatureTransformer {
    let columns = FeatureVector::COLUMNS
        .iter()
        .map(|column| {
            let categories = match *column {
                "cancellation_policy" => Some(labels(CancellationPolicy::ALL)),
                "property_type" => Some(labels(PropertyType::ALL)),
                "room_type" => Some(labels(RoomType::ALL)),
                "zipcode" => Some(labels(&ZIPCODES)),
                _ => None,
            };
            let encoding = match categories {
                Some(categories) => ColumnEncoding::OneHot {
                    categories,
                    handle_unknown: UnknownCategory::Ignore,
                },
                None => ColumnEncoding::Passthrough,
            };
            ColumnStep {
                column: (*column).to_string(),
                encoding,
            }
        })
        .collect();
    FeatureTransformer { columns }
}

/// `intercept + 0.1 * accommodates`; every other input is ignored.
pub(super) fn linear_model(intercept: f64) -> RegressionModel {
    let mut coefficients = vec![0.0; transformer().output_width()];
    coefficients[0] = 0.1;
    RegressionModel::Linear(LinearModel {
        intercept,
        coefficients,
    })
}

pub(super) fn reference() -> ReferenceDataset {
    ReferenceDataset::new(vec![
        ReferenceListing {
            listing_no: 40610629,
            latitude: 52.5200,
            longitude: 13.4050,
            price_log: 4.0,
            accommodates: 2,
            bedrooms: 1.0,
            room_type: "Entire home/apt".to_string(),
            neighbourhood_cleansed: Some("Mitte".to_string()),
            occupancy_rate: 0.35,
        },
        ReferenceListing {
            listing_no: 2015,
            latitude: 52.5345,
            longitude: 13.4026,
            price_log: 3.5,
            accommodates: 1,
            bedrooms: 1.0,
            room_type: "Private room".to_string(),
            neighbourhood_cleansed: None,
            occupancy_rate: 0.12,
        },
    ])
}

pub(super) fn manifest(market: &str, dataset_date: NaiveDate) -> BundleManifest {
    BundleManifest {
        market: MarketId::new(market),
        display_name: None,
        dataset_date,
        valuation_date: day(2020, 3, 17),
        native_currency: usd(),
        mape_median: 0.1,
        map_zoom: 9,
        zipcodes: labels(&ZIPCODES),
        transformer: transformer(),
        model: linear_model(4.0),
    }
}

pub(super) fn artifacts(market: &str) -> MarketArtifacts {
    MarketArtifacts::from_manifest(manifest(market, day(2020, 3, 17)), reference())
        .expect("test bundle is consistent")
}

pub(super) fn build_service_with(
    markets: Vec<MarketArtifacts>,
    display_currency: &str,
) -> PricingService<RateTable> {
    let registry = MarketRegistry::from_artifacts(markets).expect("registry builds");
    PricingService::new(
        Arc::new(RegistryHandle::from_registry(registry)),
        Arc::new(rates()),
        CurrencyCode::parse(display_currency).expect("valid code"),
    )
}

pub(super) fn build_service() -> PricingService<RateTable> {
    build_service_with(vec![artifacts("berlin")], "EUR")
}

pub(super) fn listing(market: &str) -> ListingInput {
    ListingInput::defaults_for(MarketId::new(market))
}

/// Writes `<dir>/<market>_<date>/{bundle.json,listings.csv}`.
pub(super) fn write_bundle(dir: &Path, manifest: &BundleManifest) {
    let bundle_dir = dir.join(manifest.directory_name());
    std::fs::create_dir_all(&bundle_dir).expect("bundle dir");
    let json = serde_json::to_vec_pretty(manifest).expect("manifest serializes");
    std::fs::write(bundle_dir.join(BUNDLE_FILE), json).expect("write manifest");

    let mut writer = csv::Writer::from_path(bundle_dir.join(REFERENCE_FILE)).expect("csv file");
    for listing in reference().listings() {
        writer.serialize(listing).expect("row serializes");
    }
    writer.flush().expect("csv flush");
}
