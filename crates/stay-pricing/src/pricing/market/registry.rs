use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use super::bundle::load_bundle;
use super::{MarketArtifacts, MarketSummary};
use crate::pricing::domain::MarketId;
use crate::pricing::error::PricingError;
use crate::pricing::inference::PriceModel;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid bundle manifest {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid reference dataset {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
    #[error("rejected bundle {}: {reason}", path.display())]
    InvalidBundle { path: PathBuf, reason: String },
    #[error("market '{0}' is provided by more than one bundle")]
    DuplicateMarket(MarketId),
    #[error("no bundle found for market(s): {}", .0.join(", "))]
    MissingMarkets(Vec<String>),
    #[error("no market bundles under {}", .0.display())]
    Empty(PathBuf),
    #[error("registry was not loaded from disk and cannot be reloaded")]
    NoSource,
}

/// Loaded markets keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    markets: BTreeMap<MarketId, Arc<MarketArtifacts>>,
}

impl MarketRegistry {
    /// Loads every `<market>_<date>` bundle under `dir`, or only the allow-listed markets.
    ///
    /// Any unreadable or inconsistent bundle fails the whole load.
    pub fn load(dir: &Path, allow: &[String]) -> Result<Self, RegistryError> {
        let allow: Vec<MarketId> = allow.iter().map(|market| MarketId::new(market)).collect();
        let entries = std::fs::read_dir(dir).map_err(|source| RegistryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut bundle_dirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RegistryError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if !path.is_dir() || name.starts_with('.') {
                continue;
            }
            let market = match name.rsplit_once('_') {
                Some((market, _date)) => MarketId::new(market),
                None => {
                    warn!(directory = %path.display(), "skipping directory without a market prefix");
                    continue;
                }
            };
            if !allow.is_empty() && !allow.contains(&market) {
                continue;
            }
            bundle_dirs.push(path);
        }
        bundle_dirs.sort();

        let mut artifacts = Vec::with_capacity(bundle_dirs.len());
        for path in &bundle_dirs {
            artifacts.push(load_bundle(path)?);
        }

        let registry = Self::from_artifacts(artifacts)?;
        let missing: Vec<String> = allow
            .iter()
            .filter(|market| !registry.markets.contains_key(*market))
            .map(|market| market.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(RegistryError::MissingMarkets(missing));
        }
        if registry.is_empty() {
            return Err(RegistryError::Empty(dir.to_path_buf()));
        }

        for market in registry.markets.values() {
            info!(
                market = %market.market,
                dataset_date = %market.dataset_date,
                model = market.model.name(),
                listings = market.reference.len(),
                "market bundle loaded"
            );
        }
        Ok(registry)
    }

    /// Builds a registry from already-constructed bundles, re-validating each one.
    pub fn from_artifacts<I>(artifacts: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = MarketArtifacts>,
    {
        let mut markets = BTreeMap::new();
        for bundle in artifacts {
            bundle
                .validate()
                .map_err(|reason| RegistryError::InvalidBundle {
                    path: PathBuf::from(bundle.market.as_str()),
                    reason,
                })?;
            let market = bundle.market.clone();
            if markets.insert(market.clone(), Arc::new(bundle)).is_some() {
                return Err(RegistryError::DuplicateMarket(market));
            }
        }
        Ok(Self { markets })
    }

    pub fn resolve(&self, market: &MarketId) -> Result<&MarketArtifacts, PricingError> {
        self.markets
            .get(market)
            .map(|artifacts| artifacts.as_ref())
            .ok_or_else(|| PricingError::UnknownMarket(market.clone()))
    }

    pub fn markets(&self) -> impl Iterator<Item = &MarketArtifacts> {
        self.markets.values().map(|artifacts| artifacts.as_ref())
    }

    pub fn summaries(&self) -> Vec<MarketSummary> {
        self.markets().map(MarketArtifacts::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

/// Where a registry is loaded from, kept so it can be reloaded later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySource {
    pub dir: PathBuf,
    pub markets: Vec<String>,
}

/// Shared, swappable registry. Readers take an `Arc` snapshot and keep using it even if a
/// reload lands mid-request; a reload replaces the whole registry or nothing.
#[derive(Debug)]
pub struct RegistryHandle {
    source: Option<RegistrySource>,
    current: RwLock<Arc<MarketRegistry>>,
}

impl RegistryHandle {
    pub fn load(source: RegistrySource) -> Result<Self, RegistryError> {
        let registry = MarketRegistry::load(&source.dir, &source.markets)?;
        Ok(Self {
            source: Some(source),
            current: RwLock::new(Arc::new(registry)),
        })
    }

    pub fn from_registry(registry: MarketRegistry) -> Self {
        Self {
            source: None,
            current: RwLock::new(Arc::new(registry)),
        }
    }

    pub fn snapshot(&self) -> Arc<MarketRegistry> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, registry: MarketRegistry) -> Arc<MarketRegistry> {
        let registry = Arc::new(registry);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = registry.clone();
        registry
    }

    /// Re-reads the source directory. On failure the current registry stays in service.
    pub fn reload(&self) -> Result<Arc<MarketRegistry>, RegistryError> {
        let source = self.source.as_ref().ok_or(RegistryError::NoSource)?;
        let registry = MarketRegistry::load(&source.dir, &source.markets)?;
        info!(markets = registry.len(), "market registry reloaded");
        Ok(self.replace(registry))
    }
}
