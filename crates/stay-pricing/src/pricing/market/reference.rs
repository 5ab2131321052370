use std::io::Read;

use serde::{Deserialize, Serialize};

/// One historical listing from a market's reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceListing {
    pub listing_no: u64,
    pub latitude: f64,
    pub longitude: f64,
    /// Natural log of the nightly price in the market's native currency.
    pub price_log: f64,
    pub accommodates: u32,
    pub bedrooms: f64,
    pub room_type: String,
    #[serde(default)]
    pub neighbourhood_cleansed: Option<String>,
    pub occupancy_rate: f64,
}

impl ReferenceListing {
    /// Rejects rows that would put a listing off the map or price it at NaN.
    pub fn validate(&self) -> Result<(), String> {
        let fail = |reason: String| Err(format!("reference listing {}: {reason}", self.listing_no));
        if !self.price_log.is_finite() {
            return fail(format!("price_log must be finite, got {}", self.price_log));
        }
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude) {
            return fail(format!(
                "coordinates ({}, {}) are off the map",
                self.latitude, self.longitude
            ));
        }
        if !self.bedrooms.is_finite() || self.bedrooms < 0.0 {
            return fail(format!("bedrooms must be a non-negative count, got {}", self.bedrooms));
        }
        if !(0.0..=1.0).contains(&self.occupancy_rate) {
            return fail(format!(
                "occupancy_rate must be a fraction between 0 and 1, got {}",
                self.occupancy_rate
            ));
        }
        Ok(())
    }
}

/// Historical listings a market's model was fit against; backs the map view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceDataset {
    listings: Vec<ReferenceListing>,
}

impl ReferenceDataset {
    pub fn new(listings: Vec<ReferenceListing>) -> Self {
        Self { listings }
    }

    pub(crate) fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let listings = csv_reader
            .deserialize::<ReferenceListing>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { listings })
    }

    pub fn listings(&self) -> &[ReferenceListing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

/// Zip-code dropdown entry: the value the model knows and a human label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZipCodeOption {
    pub value: String,
    pub label: String,
}

impl ZipCodeOption {
    /// `zip_10115` is shown as `10115`, `zip_other` as `other`.
    pub fn from_value(value: &str) -> Self {
        let label = value.strip_prefix("zip_").unwrap_or(value).to_string();
        Self {
            value: value.to_string(),
            label,
        }
    }
}

/// Public page for a listing on the platform. The listing may no longer exist.
pub fn build_listing_url(listing_no: u64) -> String {
    format!("https://www.airbnb.com/rooms/{listing_no}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_reference_rows_with_optional_neighbourhood() {
        let csv = "listing_no,latitude,longitude,price_log,accommodates,bedrooms,room_type,neighbourhood_cleansed,occupancy_rate\n\
40610629, 52.52, 13.40, 4.2, 2, 1, Entire home/apt, Mitte, 0.35\n\
40610630,52.50,13.41,3.9,1,1,Private room,,0.10\n";
        let dataset = ReferenceDataset::from_reader(Cursor::new(csv)).expect("parses");
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.listings()[0].room_type, "Entire home/apt");
        assert_eq!(
            dataset.listings()[0].neighbourhood_cleansed.as_deref(),
            Some("Mitte")
        );
        assert_eq!(dataset.listings()[1].neighbourhood_cleansed, None);
    }

    #[test]
    fn nan_and_infinite_cells_parse_but_fail_validation() {
        let csv = "listing_no,latitude,longitude,price_log,accommodates,bedrooms,room_type,neighbourhood_cleansed,occupancy_rate\n\
1,52.52,13.40,NaN,2,1,Entire home/apt,Mitte,0.35\n\
2,inf,13.41,3.9,1,1,Private room,,0.10\n\
3,52.50,13.41,3.9,1,1,Private room,,NaN\n\
4,52.50,13.41,3.9,1,1,Private room,,0.10\n";
        let dataset = ReferenceDataset::from_reader(Cursor::new(csv)).expect("parses");
        let listings = dataset.listings();

        let err = listings[0].validate().expect_err("NaN price");
        assert!(err.starts_with("reference listing 1: price_log"), "{err}");
        assert!(listings[1].validate().is_err());
        assert!(listings[2].validate().is_err());
        assert!(listings[3].validate().is_ok());
    }

    #[test]
    fn zip_labels_drop_the_prefix() {
        assert_eq!(ZipCodeOption::from_value("zip_1011").label, "1011");
        assert_eq!(ZipCodeOption::from_value("zip_other").label, "other");
        assert_eq!(ZipCodeOption::from_value("75001").label, "75001");
    }

    #[test]
    fn listing_url_points_at_room_page() {
        assert_eq!(
            build_listing_url(40610629),
            "https://www.airbnb.com/rooms/40610629"
        );
    }
}
