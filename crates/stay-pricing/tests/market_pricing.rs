use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use stay_pricing::pricing::{
    CurrencyCode, ErrorClass, ListingInput, MarketId, PricingError, PricingService, RateTable,
    RegistryHandle, RegistrySource, RoomType,
};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn service() -> PricingService<RateTable> {
    let registry = RegistryHandle::load(RegistrySource {
        dir: fixtures().join("artifacts"),
        markets: Vec::new(),
    })
    .expect("fixture bundles load");
    let rates = RateTable::from_path(fixtures().join("rates.csv")).expect("fixture rates load");
    PricingService::new(Arc::new(registry), Arc::new(rates), CurrencyCode::eur())
}

fn listing(market: &str) -> ListingInput {
    ListingInput::defaults_for(MarketId::new(market))
}

#[test]
fn golden_amsterdam_default_listing() {
    let service = service();
    let estimate = service.quote(&listing("amsterdam")).expect("amsterdam prices");

    assert_eq!(estimate.point_value, 83);
    assert_eq!((estimate.lower_bound, estimate.upper_bound), (58, 119));
    assert_eq!(
        estimate.valuation_date,
        NaiveDate::from_ymd_opt(2020, 3, 13).expect("valid date")
    );
    assert_eq!(
        estimate.yearly_earnings,
        (estimate.point_value as f64 * 365.0 * 0.3).round_ties_even() as i64
    );

    let texts = estimate.texts();
    assert_eq!(texts.listing_price, "Recommended listing price: €83");
    assert_eq!(texts.price_range, "Sensible range: €58-€119");
    assert_eq!(
        texts.yearly_earnings,
        "Potential yearly earnings: €9088 (at occupancy of 30%, not considering fees and taxes)"
    );
}

#[test]
fn zip_code_and_size_move_the_amsterdam_price() {
    let service = service();

    let mut central = listing("amsterdam");
    central.zipcode = "zip_1011".to_string();
    assert_eq!(service.quote(&central).expect("prices").point_value, 96);

    let mut family = listing("amsterdam");
    family.accommodates = 4;
    family.beds = 2.0;
    family.bedrooms = 2.0;
    let estimate = service.quote(&family).expect("prices");
    assert_eq!(estimate.point_value, 112);
    assert_eq!(estimate.yearly_earnings, 12264);
}

#[test]
fn berlin_boosted_trees_split_on_room_type_and_bedrooms() {
    let service = service();

    let default = service.quote(&listing("berlin")).expect("prices");
    assert_eq!(
        (default.lower_bound, default.point_value, default.upper_bound),
        (37, 61, 100)
    );

    let mut private = listing("berlin");
    private.room_type = RoomType::PrivateRoom;
    assert_eq!(service.quote(&private).expect("prices").point_value, 37);

    let mut larger = listing("berlin");
    larger.bedrooms = 2.0;
    assert_eq!(service.quote(&larger).expect("prices").point_value, 82);
}

#[test]
fn unknown_zip_is_rejected_before_inference() {
    let mut input = listing("berlin");
    input.zipcode = "zip_1011".to_string();
    let err = service().quote(&input).expect_err("amsterdam zip in berlin");
    assert_eq!(err.class(), ErrorClass::InputDomain);
}

#[test]
fn unconfigured_market_is_reported() {
    let err = service().quote(&listing("paris")).expect_err("no paris bundle");
    assert!(matches!(err, PricingError::UnknownMarket(ref m) if m.as_str() == "paris"));
}

#[test]
fn overview_lists_reference_listings_with_display_prices() {
    let overview = service()
        .overview(&MarketId::new("amsterdam"))
        .expect("overview");

    assert_eq!(overview.headline, "3 listings in Amsterdam on 2020-03-14");
    assert_eq!(overview.zoom, 10);
    let prices: Vec<i64> = overview.points.iter().map(|point| point.price).collect();
    assert_eq!(prices, [90, 54, 36]);

    let berlin = service()
        .overview(&MarketId::new("berlin"))
        .expect("overview");
    let prices: Vec<i64> = berlin.points.iter().map(|point| point.price).collect();
    assert_eq!(prices, [67, 45, 135]);
    assert_eq!(berlin.points[2].neighbourhood, None);
}

#[test]
fn allow_list_limits_loaded_markets() {
    let registry = RegistryHandle::load(RegistrySource {
        dir: fixtures().join("artifacts"),
        markets: vec!["Berlin".to_string()],
    })
    .expect("loads");
    let markets: Vec<String> = registry
        .snapshot()
        .markets()
        .map(|market| market.market.to_string())
        .collect();
    assert_eq!(markets, ["berlin"]);
}
