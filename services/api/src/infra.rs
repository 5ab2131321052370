use metrics_exporter_prometheus::PrometheusHandle;
use stay_pricing::config::{ConfigError, PricingConfig};
use stay_pricing::error::AppError;
use stay_pricing::pricing::{
    CurrencyCode, PricingService, RateTable, RegistryHandle, RegistrySource,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads every market bundle and the rate table; any failure aborts startup.
pub(crate) fn load_pricing_service(
    config: &PricingConfig,
) -> Result<PricingService<RateTable>, AppError> {
    let display_currency = CurrencyCode::parse(&config.display_currency)
        .map_err(|_| ConfigError::InvalidCurrency(config.display_currency.clone()))?;

    let rates = RateTable::from_path(&config.rates_path)?;
    if !rates.covers(&display_currency) {
        return Err(ConfigError::InvalidCurrency(display_currency.to_string()).into());
    }

    let registry = RegistryHandle::load(RegistrySource {
        dir: config.artifacts_dir.clone(),
        markets: config.markets.clone(),
    })?;

    let snapshot = registry.snapshot();
    for market in snapshot.markets() {
        if !rates.covers(&market.native_currency) {
            return Err(ConfigError::InvalidCurrency(market.native_currency.to_string()).into());
        }
    }
    info!(
        markets = snapshot.len(),
        display_currency = %display_currency,
        rates = %config.rates_path.display(),
        "pricing service initialised"
    );

    Ok(PricingService::new(
        Arc::new(registry),
        Arc::new(rates),
        display_currency,
    ))
}
