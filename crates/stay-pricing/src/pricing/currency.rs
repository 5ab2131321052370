//! Historical exchange rates pinned to each market's valuation date.
//!
//! Rates come from a local table in the European Central Bank reference-rate layout: a `Date`
//! column followed by one column per currency, each cell holding units of that currency per
//! euro. Blank and `N/A` cells mean "no rate that day". Lookups never fall back to another
//! date; a missing rate fails the request instead of skewing the price.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ErrorClass;

const BASE_CURRENCY: &str = "EUR";

/// Upper-case ISO 4217 style code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn parse(raw: &str) -> Result<Self, CurrencyError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code))
        } else {
            Err(CurrencyError::InvalidCode(raw.to_string()))
        }
    }

    pub fn eur() -> Self {
        Self(BASE_CURRENCY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix used in display strings: a glyph where one is common, otherwise `"CHF "`.
    pub fn symbol(&self) -> String {
        match self.0.as_str() {
            "EUR" => "€".to_string(),
            "USD" => "$".to_string(),
            "GBP" => "£".to_string(),
            "JPY" => "¥".to_string(),
            other => format!("{other} "),
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurrencyError {
    #[error("'{0}' is not a three-letter currency code")]
    InvalidCode(String),
    #[error("currency {0} is not covered by the rate table")]
    UnknownCurrency(CurrencyCode),
    #[error("no {currency} exchange rate published for {date}")]
    RateUnavailable { currency: CurrencyCode, date: NaiveDate },
}

impl CurrencyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CurrencyError::RateUnavailable { .. } => ErrorClass::ExternalData,
            CurrencyError::InvalidCode(_) | CurrencyError::UnknownCurrency(_) => {
                ErrorClass::Configuration
            }
        }
    }
}

/// Conversion contract used by the pricing pipeline.
pub trait CurrencyConverter: Send + Sync {
    fn convert(
        &self,
        amount: f64,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<f64, CurrencyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RateTableError {
    #[error("failed to read rate table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid rate table CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("rate table line {line}: {detail}")]
    Malformed { line: u64, detail: String },
}

/// In-memory daily euro reference rates.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    currencies: BTreeSet<CurrencyCode>,
    days: BTreeMap<NaiveDate, HashMap<CurrencyCode, f64>>,
}

impl RateTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RateTableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RateTableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if !headers
            .get(0)
            .is_some_and(|first| first.trim_start_matches('\u{feff}').eq_ignore_ascii_case("date"))
        {
            return Err(RateTableError::Malformed {
                line: 1,
                detail: "first column must be 'Date'".to_string(),
            });
        }

        // The ECB export ends every line with a comma, so blank headers are skipped.
        let mut columns = Vec::new();
        for (idx, header) in headers.iter().enumerate().skip(1) {
            if header.is_empty() {
                continue;
            }
            let code = CurrencyCode::parse(header).map_err(|err| RateTableError::Malformed {
                line: 1,
                detail: err.to_string(),
            })?;
            columns.push((idx, code));
        }

        let mut table = RateTable {
            currencies: columns.iter().map(|(_, code)| code.clone()).collect(),
            days: BTreeMap::new(),
        };
        table.currencies.insert(CurrencyCode::eur());

        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            let raw_date = record.get(0).unwrap_or_default();
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|err| {
                RateTableError::Malformed {
                    line,
                    detail: format!("invalid date '{raw_date}': {err}"),
                }
            })?;

            let mut rates = HashMap::new();
            for (idx, code) in &columns {
                let cell = record.get(*idx).unwrap_or_default();
                if cell.is_empty() || cell.eq_ignore_ascii_case("n/a") {
                    continue;
                }
                let rate: f64 = cell.parse().map_err(|_| RateTableError::Malformed {
                    line,
                    detail: format!("invalid {code} rate '{cell}'"),
                })?;
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(RateTableError::Malformed {
                        line,
                        detail: format!("{code} rate must be positive, got {rate}"),
                    });
                }
                rates.insert(code.clone(), rate);
            }
            if table.days.insert(date, rates).is_some() {
                return Err(RateTableError::Malformed {
                    line,
                    detail: format!("duplicate row for {date}"),
                });
            }
        }

        Ok(table)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.currencies.iter()
    }

    pub fn covers(&self, currency: &CurrencyCode) -> bool {
        self.currencies.contains(currency)
    }

    /// Units of `currency` per euro on exactly `date`.
    pub fn rate(&self, currency: &CurrencyCode, date: NaiveDate) -> Result<f64, CurrencyError> {
        if !self.covers(currency) {
            return Err(CurrencyError::UnknownCurrency(currency.clone()));
        }
        let unavailable = || CurrencyError::RateUnavailable {
            currency: currency.clone(),
            date,
        };

        let day = self.days.get(&date).ok_or_else(unavailable)?;
        if currency.as_str() == BASE_CURRENCY {
            return Ok(1.0);
        }
        day.get(currency).copied().ok_or_else(unavailable)
    }
}

impl CurrencyConverter for RateTable {
    fn convert(
        &self,
        amount: f64,
        from: &CurrencyCode,
        to: &CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<f64, CurrencyError> {
        if from == to {
            return Ok(amount);
        }
        let from_rate = self.rate(from, as_of)?;
        let to_rate = self.rate(to, as_of)?;
        Ok(amount / from_rate * to_rate)
    }
}
