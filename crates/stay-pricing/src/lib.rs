//! Nightly price recommendations for short-term rental listings.

pub mod config;
pub mod error;
pub mod pricing;
pub mod telemetry;
