//! Exrate Common Types
//!
//! This crate contains the exchange-rate data model shared across the exrate
//! workspace: currency codes, rate snapshots, historical series and their
//! flattened, paginated form.

pub mod currency;
pub mod rates;
pub mod time;

pub use currency::*;
pub use rates::*;
pub use time::*;
