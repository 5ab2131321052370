use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::currency::CurrencyCode;

/// Normalized market identifier (trimmed, lowercase city key such as `amsterdam`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MarketId(String);

impl MarketId {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// City name with its first letter capitalized, for headings.
    pub fn display_name(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl From<String> for MarketId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for MarketId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<MarketId> for String {
    fn from(value: MarketId) -> Self {
        value.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raised when a label does not name any variant of a listing enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Category label exactly as the market transformers were fit on it.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownLabel;

            /// Accepts the label itself or a snake_case spelling (`entire_home_apt`).
            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let wanted = slug(raw);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| slug(candidate.label()) == wanted)
                    .ok_or_else(|| UnknownLabel {
                        kind: $kind,
                        value: raw.to_string(),
                        expected: Self::ALL
                            .iter()
                            .map(|candidate| candidate.label())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

fn slug(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

labelled_enum!(
    /// Guest cancellation terms offered by the host.
    CancellationPolicy, "cancellation policy" {
        Flexible => "flexible",
        Moderate => "moderate",
        Strict => "strict",
        SuperStrict => "super_strict",
    }
);

labelled_enum!(
    PropertyType, "property type" {
        Apartment => "Apartment",
        House => "House",
        BoutiqueHotel => "Boutique hotel",
        SecondaryUnit => "Secondary unit",
        BedAndBreakfast => "Bed and breakfast",
        UniqueSpace => "Unique space",
    }
);

labelled_enum!(
    RoomType, "room type" {
        EntireHome => "Entire home/apt",
        PrivateRoom => "Private room",
        SharedRoom => "Shared room",
        HotelRoom => "Hotel room",
    }
);

/// Amenity toggles offered on the listing form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenities {
    pub essentials: bool,
    pub balcony: bool,
    pub breakfast: bool,
    pub child_friendly: bool,
    pub elevator: bool,
    pub pets_allowed: bool,
    pub private_entrance: bool,
    pub smoking_allowed: bool,
    pub tv: bool,
}

impl Default for Amenities {
    fn default() -> Self {
        Self {
            essentials: true,
            balcony: false,
            breakfast: false,
            child_friendly: false,
            elevator: false,
            pets_allowed: false,
            private_entrance: false,
            smoking_allowed: false,
            tv: false,
        }
    }
}

/// Listing attributes as entered by the host. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingInput {
    pub market: MarketId,
    pub zipcode: String,
    pub accommodates: u32,
    pub bedrooms: f64,
    pub beds: f64,
    pub bathrooms: f64,
    pub minimum_nights: u32,
    pub maximum_nights: u32,
    pub cancellation_policy: CancellationPolicy,
    pub property_type: PropertyType,
    pub room_type: RoomType,
    pub instant_bookable: bool,
    pub host_is_superhost: bool,
    /// Number of other active listings the host runs, bucketed 0..=7.
    pub host_listing_bucket: u8,
    pub weekly_monthly_discount: f64,
    pub guests_included: u32,
    pub occupancy_rate: f64,
    pub amenities: Amenities,
}

pub const DEFAULT_ZIPCODE: &str = "zip_other";
pub const MAX_HOST_LISTING_BUCKET: u8 = 7;
pub const MAX_DISCOUNT: f64 = 0.5;

impl ListingInput {
    /// Form defaults for the given market.
    pub fn defaults_for(market: MarketId) -> Self {
        Self {
            market,
            zipcode: DEFAULT_ZIPCODE.to_string(),
            accommodates: 2,
            bedrooms: 1.0,
            beds: 1.0,
            bathrooms: 1.0,
            minimum_nights: 1,
            maximum_nights: 1125,
            cancellation_policy: CancellationPolicy::Flexible,
            property_type: PropertyType::Apartment,
            room_type: RoomType::EntireHome,
            instant_bookable: false,
            host_is_superhost: false,
            host_listing_bucket: 0,
            weekly_monthly_discount: 0.0,
            guests_included: 2,
            occupancy_rate: 0.3,
            amenities: Amenities::default(),
        }
    }

    /// Checks every field against its declared domain and reports the first violation.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.zipcode.trim().is_empty() {
            return Err(InputError::out_of_range("zipcode", "a non-empty zip code", &self.zipcode));
        }
        if self.accommodates < 1 {
            return Err(InputError::out_of_range("accommodates", "at least 1", self.accommodates));
        }
        for (field, value) in [
            ("bedrooms", self.bedrooms),
            ("beds", self.beds),
            ("bathrooms", self.bathrooms),
        ] {
            if !is_positive_half_step(value) {
                return Err(InputError::out_of_range(
                    field,
                    "a positive multiple of 0.5",
                    value,
                ));
            }
        }
        if self.minimum_nights < 1 {
            return Err(InputError::out_of_range("minimum_nights", "at least 1", self.minimum_nights));
        }
        if self.maximum_nights < 1 {
            return Err(InputError::out_of_range("maximum_nights", "at least 1", self.maximum_nights));
        }
        if self.host_listing_bucket > MAX_HOST_LISTING_BUCKET {
            return Err(InputError::out_of_range(
                "host_listing_bucket",
                "between 0 and 7",
                self.host_listing_bucket,
            ));
        }
        if !in_closed_range(self.weekly_monthly_discount, 0.0, MAX_DISCOUNT) {
            return Err(InputError::out_of_range(
                "weekly_monthly_discount",
                "between 0 and 0.5",
                self.weekly_monthly_discount,
            ));
        }
        if self.guests_included < 1 {
            return Err(InputError::out_of_range("guests_included", "at least 1", self.guests_included));
        }
        if !in_closed_range(self.occupancy_rate, 0.0, 1.0) {
            return Err(InputError::out_of_range(
                "occupancy_rate",
                "between 0 and 1",
                self.occupancy_rate,
            ));
        }
        Ok(())
    }
}

fn is_positive_half_step(value: f64) -> bool {
    value.is_finite() && value > 0.0 && (value * 2.0).fract() == 0.0
}

fn in_closed_range(value: f64, min: f64, max: f64) -> bool {
    value.is_finite() && (min..=max).contains(&value)
}

/// Request-level rejection of a listing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("zip code '{zipcode}' is not offered in market '{market}'")]
    UnknownZipCode { market: MarketId, zipcode: String },
}

impl InputError {
    fn out_of_range(field: &'static str, expected: &'static str, value: impl fmt::Display) -> Self {
        Self::OutOfRange {
            field,
            expected,
            value: value.to_string(),
        }
    }
}

/// Calibrated price for one listing, in whole display-currency units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceEstimate {
    pub market: MarketId,
    pub currency: CurrencyCode,
    pub point_value: i64,
    pub lower_bound: i64,
    pub upper_bound: i64,
    pub occupancy_assumption: f64,
    pub yearly_earnings: i64,
    pub valuation_date: NaiveDate,
}

/// The three lines shown on the pricing tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingTexts {
    pub listing_price: String,
    pub price_range: String,
    pub yearly_earnings: String,
}
