use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::reference::ReferenceDataset;
use super::registry::RegistryError;
use super::MarketArtifacts;
use crate::pricing::currency::CurrencyCode;
use crate::pricing::domain::MarketId;
use crate::pricing::inference::{FeatureTransformer, RegressionModel};

/// Manifest with the fitted transformer and model, next to the reference listings.
pub const BUNDLE_FILE: &str = "bundle.json";
pub const REFERENCE_FILE: &str = "listings.csv";

/// On-disk description of one market, exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub market: MarketId,
    #[serde(default)]
    pub display_name: Option<String>,
    pub dataset_date: NaiveDate,
    pub valuation_date: NaiveDate,
    pub native_currency: CurrencyCode,
    pub mape_median: f64,
    #[serde(default = "default_map_zoom")]
    pub map_zoom: u8,
    pub zipcodes: Vec<String>,
    pub transformer: FeatureTransformer,
    pub model: RegressionModel,
}

fn default_map_zoom() -> u8 {
    10
}

impl BundleManifest {
    /// Directory name the bundle is expected under: `<market>_<dataset date>`.
    pub fn directory_name(&self) -> String {
        format!("{}_{}", self.market, self.dataset_date.format("%Y-%m-%d"))
    }
}

/// Reads and validates the bundle stored in `dir`.
pub(crate) fn load_bundle(dir: &Path) -> Result<MarketArtifacts, RegistryError> {
    let manifest_path = dir.join(BUNDLE_FILE);
    let file = File::open(&manifest_path).map_err(|source| RegistryError::Io {
        path: manifest_path.clone(),
        source,
    })?;
    let manifest: BundleManifest =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| RegistryError::Json {
            path: manifest_path.clone(),
            source,
        })?;

    let expected_dir = manifest.directory_name();
    let actual_dir = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if actual_dir != expected_dir {
        return Err(RegistryError::InvalidBundle {
            path: dir.to_path_buf(),
            reason: format!("bundle for {expected_dir} is stored under '{actual_dir}'"),
        });
    }

    let reference_path = dir.join(REFERENCE_FILE);
    let file = File::open(&reference_path).map_err(|source| RegistryError::Io {
        path: reference_path.clone(),
        source,
    })?;
    let reference = ReferenceDataset::from_reader(file).map_err(|source| RegistryError::Csv {
        path: reference_path,
        source,
    })?;

    MarketArtifacts::from_manifest(manifest, reference).map_err(|reason| {
        RegistryError::InvalidBundle {
            path: dir.to_path_buf(),
            reason,
        }
    })
}
