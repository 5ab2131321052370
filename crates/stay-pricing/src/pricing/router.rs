use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::warn;

use super::currency::CurrencyConverter;
use super::domain::{ListingInput, MarketId};
use super::error::{ErrorClass, PricingError};
use super::facade::PricingService;
use super::market::build_listing_url;

/// Router builder exposing market lookups and price estimates.
pub fn pricing_router<C>(service: Arc<PricingService<C>>) -> Router
where
    C: CurrencyConverter + 'static,
{
    Router::new()
        .route("/api/v1/markets", get(markets_handler::<C>))
        .route("/api/v1/markets/reload", post(reload_handler::<C>))
        .route("/api/v1/markets/:market", get(market_handler::<C>))
        .route("/api/v1/markets/:market/overview", get(overview_handler::<C>))
        .route("/api/v1/pricing/estimate", post(estimate_handler::<C>))
        .route("/api/v1/listings/:listing_no/url", get(listing_url_handler))
        .with_state(service)
}

pub(crate) async fn markets_handler<C>(State(service): State<Arc<PricingService<C>>>) -> Response
where
    C: CurrencyConverter + 'static,
{
    let registry = service.registry();
    let payload = json!({ "markets": registry.summaries() });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn market_handler<C>(
    State(service): State<Arc<PricingService<C>>>,
    Path(market): Path<String>,
) -> Response
where
    C: CurrencyConverter + 'static,
{
    let market = MarketId::new(&market);
    let registry = service.registry();
    match registry.resolve(&market) {
        Ok(artifacts) => {
            let payload = json!({
                "market": artifacts.summary(),
                "zipcodes": artifacts.zipcode_options(),
                "defaults": ListingInput::defaults_for(artifacts.market.clone()),
                "map_zoom": artifacts.map_zoom,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => pricing_error_response(&error),
    }
}

pub(crate) async fn overview_handler<C>(
    State(service): State<Arc<PricingService<C>>>,
    Path(market): Path<String>,
) -> Response
where
    C: CurrencyConverter + 'static,
{
    match service.overview(&MarketId::new(&market)) {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => pricing_error_response(&error),
    }
}

pub(crate) async fn estimate_handler<C>(
    State(service): State<Arc<PricingService<C>>>,
    input: Result<axum::Json<ListingInput>, JsonRejection>,
) -> Response
where
    C: CurrencyConverter + 'static,
{
    let axum::Json(input) = match input {
        Ok(input) => input,
        Err(rejection) => {
            let payload = json!({
                "error": rejection.body_text(),
                "class": ErrorClass::InputDomain,
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };
    match service.quote(&input) {
        Ok(estimate) => {
            let payload = json!({
                "texts": estimate.texts(),
                "estimate": estimate,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => pricing_error_response(&error),
    }
}

pub(crate) async fn listing_url_handler(Path(listing_no): Path<u64>) -> Response {
    let payload = json!({
        "listing_no": listing_no,
        "url": build_listing_url(listing_no),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn reload_handler<C>(State(service): State<Arc<PricingService<C>>>) -> Response
where
    C: CurrencyConverter + 'static,
{
    match service.registry_handle().reload() {
        Ok(registry) => {
            let payload = json!({
                "status": "reloaded",
                "markets": registry.summaries(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            warn!(error = %error, "market registry reload failed; keeping current markets");
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

/// Status code for a failed pricing request.
pub fn pricing_error_status(error: &PricingError) -> StatusCode {
    match error {
        PricingError::UnknownMarket(_) => StatusCode::NOT_FOUND,
        other => match other.class() {
            ErrorClass::InputDomain => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorClass::ExternalData => StatusCode::BAD_GATEWAY,
            ErrorClass::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

fn pricing_error_response(error: &PricingError) -> Response {
    let status = pricing_error_status(error);
    if status.is_server_error() {
        warn!(error = %error, class = ?error.class(), "pricing request failed");
    }
    let payload = json!({
        "error": error.to_string(),
        "class": error.class(),
    });
    (status, axum::Json(payload)).into_response()
}
