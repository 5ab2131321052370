use super::common::*;
use crate::pricing::currency::CurrencyError;
use crate::pricing::domain::{InputError, MarketId};
use crate::pricing::error::{ErrorClass, PricingError};
use crate::pricing::inference::InferenceError;
use crate::pricing::market::{MarketArtifacts, ReferenceDataset};

#[test]
fn default_listing_is_priced_in_euros_at_the_valuation_date() {
    let service = build_service();
    let estimate = service.quote(&listing("berlin")).expect("default listing prices");

    // exp(4.2) USD at 1.0998 USD/EUR on 2020-03-17, band exp(4.2 ∓ 0.42).
    assert_eq!(estimate.point_value, 61);
    assert_eq!(estimate.lower_bound, 40);
    assert_eq!(estimate.upper_bound, 92);
    assert_eq!(estimate.currency.as_str(), "EUR");
    assert_eq!(estimate.valuation_date, day(2020, 3, 17));
}

#[test]
fn yearly_earnings_follow_the_rounded_price() {
    let service = build_service();
    let mut input = listing("berlin");
    input.occupancy_rate = 0.3;
    let estimate = service.quote(&input).expect("prices");

    let expected = (estimate.point_value as f64 * 365.0 * 0.3).round_ties_even() as i64;
    assert_eq!(estimate.yearly_earnings, expected);
    assert_eq!(estimate.yearly_earnings, 6680);
}

#[test]
fn texts_match_the_pricing_tab() {
    let texts = build_service()
        .estimate(&listing("berlin"))
        .expect("default listing prices");

    assert_eq!(texts.listing_price, "Recommended listing price: €61");
    assert_eq!(texts.price_range, "Sensible range: €40-€92");
    assert_eq!(
        texts.yearly_earnings,
        "Potential yearly earnings: €6680 (at occupancy of 30%, not considering fees and taxes)"
    );
}

#[test]
fn identical_requests_render_identical_texts() {
    let service = build_service();
    let first = service.estimate(&listing("berlin")).expect("prices");
    let second = service.estimate(&listing("berlin")).expect("prices");
    assert_eq!(first, second);
}

#[test]
fn same_currency_display_skips_conversion() {
    let service = build_service_with(vec![artifacts("berlin")], "USD");
    let texts = service.estimate(&listing("berlin")).expect("prices");
    assert_eq!(texts.listing_price, "Recommended listing price: $67");
    assert_eq!(texts.price_range, "Sensible range: $44-$101");
}

#[test]
fn larger_listings_cost_more() {
    let service = build_service();
    let mut input = listing("berlin");
    input.accommodates = 4;
    input.beds = 2.0;
    let estimate = service.quote(&input).expect("prices");
    assert_eq!(estimate.point_value, 74);
}

#[test]
fn negative_log_price_keeps_the_range_ordered() {
    let mut bundle = artifacts("berlin");
    bundle.model = linear_model(-1.0);
    bundle.mape_median = 1.0;
    let service = build_service_with(vec![bundle], "EUR");

    let estimate = service.quote(&listing("berlin")).expect("prices");
    assert!(estimate.lower_bound <= estimate.point_value);
    assert!(estimate.point_value <= estimate.upper_bound);
    assert_eq!(
        (estimate.lower_bound, estimate.point_value, estimate.upper_bound),
        (0, 0, 1)
    );
}

#[test]
fn overflowing_price_fails_instead_of_saturating() {
    // exp(800.2) is infinite even though the log-price itself is finite.
    let mut bundle = artifacts("berlin");
    bundle.model = linear_model(800.0);
    let service = build_service_with(vec![bundle], "EUR");

    let err = service.quote(&listing("berlin")).expect_err("price overflows");
    assert!(matches!(
        err,
        PricingError::Inference(InferenceError::NonFinite { ref market }) if market == "berlin"
    ));
    assert_eq!(err.class(), ErrorClass::Configuration);
}

#[test]
fn price_beyond_whole_unit_range_fails() {
    // exp(50.2) is finite but does not fit a whole-unit price.
    let mut bundle = artifacts("berlin");
    bundle.model = linear_model(50.0);
    let service = build_service_with(vec![bundle], "EUR");

    let err = service.quote(&listing("berlin")).expect_err("price too large");
    assert!(matches!(
        err,
        PricingError::Inference(InferenceError::NonFinite { .. })
    ));
}

#[test]
fn unknown_market_is_a_configuration_error() {
    let err = build_service()
        .quote(&listing("Rome"))
        .expect_err("rome is not loaded");
    assert_eq!(err, PricingError::UnknownMarket(MarketId::new("rome")));
    assert_eq!(err.class(), ErrorClass::Configuration);
}

#[test]
fn market_ids_are_normalized_before_lookup() {
    let service = build_service();
    let mut input = listing("berlin");
    input.market = MarketId::new("  BERLIN ");
    assert!(service.quote(&input).is_ok());
}

#[test]
fn zip_codes_outside_the_catalog_are_rejected() {
    let mut input = listing("berlin");
    input.zipcode = "zip_75001".to_string();
    let err = build_service().quote(&input).expect_err("paris zip in berlin");
    assert_eq!(
        err,
        PricingError::InvalidInput(InputError::UnknownZipCode {
            market: MarketId::new("berlin"),
            zipcode: "zip_75001".to_string(),
        })
    );
    assert_eq!(err.class(), ErrorClass::InputDomain);
}

#[test]
fn zero_beds_never_reach_the_model() {
    let mut input = listing("berlin");
    input.beds = 0.0;
    let err = build_service().quote(&input).expect_err("beds must be positive");
    assert!(matches!(
        err,
        PricingError::InvalidInput(InputError::OutOfRange { field: "beds", .. })
    ));
    assert_eq!(err.class(), ErrorClass::InputDomain);
}

#[test]
fn missing_rate_on_the_valuation_date_fails_the_request() {
    let mut bundle = artifacts("amsterdam");
    bundle.valuation_date = day(2020, 3, 14);
    let service = build_service_with(vec![bundle], "EUR");

    let err = service.quote(&listing("amsterdam")).expect_err("saturday has no rate");
    assert_eq!(
        err,
        PricingError::Currency(CurrencyError::RateUnavailable {
            currency: usd(),
            date: day(2020, 3, 14),
        })
    );
    assert_eq!(err.class(), ErrorClass::ExternalData);
}

#[test]
fn each_market_converts_at_its_own_date() {
    let mut amsterdam = artifacts("amsterdam");
    amsterdam.valuation_date = day(2020, 3, 13);
    let service = build_service_with(vec![amsterdam, artifacts("berlin")], "EUR");

    let amsterdam = service.quote(&listing("amsterdam")).expect("prices");
    let berlin = service.quote(&listing("berlin")).expect("prices");
    // Same model, different pinned rates (1.1104 vs 1.0998).
    assert_eq!(amsterdam.point_value, 60);
    assert_eq!(berlin.point_value, 61);
}

#[test]
fn overview_prices_reference_listings_for_the_map() {
    let service = build_service();
    let overview = service
        .overview(&MarketId::new("berlin"))
        .expect("overview builds");

    assert_eq!(overview.total_listings, 2);
    assert_eq!(overview.zoom, 9);
    assert_eq!(overview.headline, "2 listings in Berlin on 2020-03-17");
    assert_eq!(overview.points[0].price, 50);
    assert_eq!(overview.points[1].price, 30);
    assert_eq!(
        overview.points[0].url,
        "https://www.airbnb.com/rooms/40610629"
    );
    assert_eq!(overview.points[1].neighbourhood, None);
}

#[test]
fn overview_of_unknown_market_fails() {
    let err = build_service()
        .overview(&MarketId::new("lisbon"))
        .expect_err("not loaded");
    assert!(matches!(err, PricingError::UnknownMarket(_)));
}

#[test]
fn overview_rejects_a_reference_price_it_cannot_show() {
    let mut listings = reference().listings().to_vec();
    listings[1].price_log = 60.0;
    let bundle = MarketArtifacts::from_manifest(
        manifest("berlin", day(2020, 3, 17)),
        ReferenceDataset::new(listings),
    )
    .expect("finite log-price is a valid row");
    let service = build_service_with(vec![bundle], "EUR");

    let err = service
        .overview(&MarketId::new("berlin"))
        .expect_err("price out of range");
    assert!(matches!(
        err,
        PricingError::Inference(InferenceError::NonFinite { .. })
    ));
}

#[test]
fn nan_reference_listing_is_rejected_with_the_bundle() {
    let mut listings = reference().listings().to_vec();
    listings[0].price_log = f64::NAN;
    let err = MarketArtifacts::from_manifest(
        manifest("berlin", day(2020, 3, 17)),
        ReferenceDataset::new(listings),
    )
    .expect_err("NaN price");
    assert!(err.contains("price_log must be finite"), "{err}");
}

#[test]
fn display_name_defaults_to_capitalized_market() {
    let bundle: MarketArtifacts = artifacts("barcelona");
    assert_eq!(bundle.display_name, "Barcelona");
}
