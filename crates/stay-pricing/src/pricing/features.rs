//! Feature engineering for the market price models.
//!
//! Turns a [`ListingInput`] into the named row the fitted transformers expect. The numeric
//! transforms must match the ones applied when the models were trained, otherwise every
//! estimate silently drifts:
//!
//! * `accommodates_per_bed = accommodates / beds`
//! * `bathrooms_log = ln(bathrooms)`
//! * `calc_host_lst_count_sqrt_log = ln(sqrt(bucket + 1))` (this squashes the 0..=7 bucket into
//!   `0.0..=ln(sqrt(8))`; odd, but the models were trained on it)
//! * `minimum_nights_sqrt = sqrt(minimum_nights)`
//! * flags become `0.0`/`1.0`, categories pass through as their labels.

use serde::Serialize;

use super::domain::ListingInput;

/// A single engineered cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

impl FeatureValue {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FeatureValue::Numeric(value) => Some(*value),
            FeatureValue::Categorical(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Categorical(value) => Some(value),
            FeatureValue::Numeric(_) => None,
        }
    }

    fn flag(value: bool) -> Self {
        FeatureValue::Numeric(if value { 1.0 } else { 0.0 })
    }
}

/// Engineered row, each cell tagged with the column it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    cells: Vec<(&'static str, FeatureValue)>,
}

impl FeatureVector {
    /// Column layout produced by [`engineer`], in order.
    pub const COLUMNS: [&'static str; 24] = [
        "accommodates",
        "accommodates_per_bed",
        "am_balcony",
        "am_breakfast",
        "am_child_friendly",
        "am_elevator",
        "am_essentials",
        "am_pets_allowed",
        "am_private_entrance",
        "am_smoking_allowed",
        "am_tv",
        "bathrooms_log",
        "bedrooms",
        "calc_host_lst_count_sqrt_log",
        "cancellation_policy",
        "guests_included",
        "host_is_superhost",
        "instant_bookable",
        "maximum_nights",
        "minimum_nights_sqrt",
        "property_type",
        "room_type",
        "wk_mth_discount",
        "zipcode",
    ];

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(column, _)| *column)
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.cells
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn cells(&self) -> &[(&'static str, FeatureValue)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("cannot derive {feature}: {denominator} is zero")]
    DivisionByZero {
        feature: &'static str,
        denominator: &'static str,
    },
    #[error("cannot derive {feature}: {field} = {value} is outside the transform's domain")]
    Domain {
        feature: &'static str,
        field: &'static str,
        value: f64,
    },
}

/// Builds the model-ready row for a listing. Pure; never yields `inf` or `NaN`.
pub fn engineer(input: &ListingInput) -> Result<FeatureVector, FeatureError> {
    let accommodates = f64::from(input.accommodates);
    let amenities = &input.amenities;

    let cells = vec![
        ("accommodates", FeatureValue::Numeric(accommodates)),
        (
            "accommodates_per_bed",
            FeatureValue::Numeric(accommodates_per_bed(accommodates, input.beds)?),
        ),
        ("am_balcony", FeatureValue::flag(amenities.balcony)),
        ("am_breakfast", FeatureValue::flag(amenities.breakfast)),
        ("am_child_friendly", FeatureValue::flag(amenities.child_friendly)),
        ("am_elevator", FeatureValue::flag(amenities.elevator)),
        ("am_essentials", FeatureValue::flag(amenities.essentials)),
        ("am_pets_allowed", FeatureValue::flag(amenities.pets_allowed)),
        ("am_private_entrance", FeatureValue::flag(amenities.private_entrance)),
        ("am_smoking_allowed", FeatureValue::flag(amenities.smoking_allowed)),
        ("am_tv", FeatureValue::flag(amenities.tv)),
        (
            "bathrooms_log",
            FeatureValue::Numeric(bathrooms_log(input.bathrooms)?),
        ),
        ("bedrooms", FeatureValue::Numeric(input.bedrooms)),
        (
            "calc_host_lst_count_sqrt_log",
            FeatureValue::Numeric(host_listing_factor(input.host_listing_bucket)),
        ),
        (
            "cancellation_policy",
            FeatureValue::Categorical(input.cancellation_policy.label().to_string()),
        ),
        (
            "guests_included",
            FeatureValue::Numeric(f64::from(input.guests_included)),
        ),
        ("host_is_superhost", FeatureValue::flag(input.host_is_superhost)),
        ("instant_bookable", FeatureValue::flag(input.instant_bookable)),
        (
            "maximum_nights",
            FeatureValue::Numeric(f64::from(input.maximum_nights)),
        ),
        (
            "minimum_nights_sqrt",
            FeatureValue::Numeric(minimum_nights_sqrt(f64::from(input.minimum_nights))?),
        ),
        (
            "property_type",
            FeatureValue::Categorical(input.property_type.label().to_string()),
        ),
        (
            "room_type",
            FeatureValue::Categorical(input.room_type.label().to_string()),
        ),
        (
            "wk_mth_discount",
            FeatureValue::Numeric(input.weekly_monthly_discount),
        ),
        (
            "zipcode",
            FeatureValue::Categorical(input.zipcode.trim().to_string()),
        ),
    ];

    Ok(FeatureVector { cells })
}

fn accommodates_per_bed(accommodates: f64, beds: f64) -> Result<f64, FeatureError> {
    if beds == 0.0 {
        return Err(FeatureError::DivisionByZero {
            feature: "accommodates_per_bed",
            denominator: "beds",
        });
    }
    let ratio = accommodates / beds;
    if !ratio.is_finite() || ratio < 0.0 {
        return Err(FeatureError::Domain {
            feature: "accommodates_per_bed",
            field: "beds",
            value: beds,
        });
    }
    Ok(ratio)
}

fn bathrooms_log(bathrooms: f64) -> Result<f64, FeatureError> {
    if !bathrooms.is_finite() || bathrooms <= 0.0 {
        return Err(FeatureError::Domain {
            feature: "bathrooms_log",
            field: "bathrooms",
            value: bathrooms,
        });
    }
    Ok(bathrooms.ln())
}

fn host_listing_factor(bucket: u8) -> f64 {
    (f64::from(bucket) + 1.0).sqrt().ln()
}

fn minimum_nights_sqrt(minimum_nights: f64) -> Result<f64, FeatureError> {
    if !minimum_nights.is_finite() || minimum_nights < 0.0 {
        return Err(FeatureError::Domain {
            feature: "minimum_nights_sqrt",
            field: "minimum_nights",
            value: minimum_nights,
        });
    }
    Ok(minimum_nights.sqrt())
}
