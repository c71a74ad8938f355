//! Exchange-rate snapshots and time series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CurrencyCode;

/// Rates keyed by currency code.
pub type RateTable = BTreeMap<CurrencyCode, Decimal>;

/// Latest rates for a base currency, as published by the upstream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Base currency the rates are quoted against.
    pub base: CurrencyCode,
    /// Publication date of the rates.
    #[serde(rename = "date")]
    pub as_of: NaiveDate,
    /// Quote currency to rate.
    pub rates: RateTable,
    /// Amount of base currency the rates are scaled to.
    pub amount: Decimal,
}

impl RateSnapshot {
    pub fn new(base: CurrencyCode, as_of: NaiveDate, rates: RateTable, amount: Decimal) -> Self {
        Self {
            base,
            as_of,
            rates,
            amount,
        }
    }

    /// Look up a rate by currency, ignoring the case of `currency`.
    pub fn rate_for(&self, currency: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(&currency.normalized()).copied()
    }
}

/// Historical rates over a date range.
///
/// Outer keys are ISO calendar dates (`YYYY-MM-DD`). Each date carries its
/// own currency set, so the series may be sparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResult {
    pub base: CurrencyCode,
    pub amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rates: BTreeMap<String, RateTable>,
}

impl HistoryResult {
    /// Total number of (date, currency) pairs in the series.
    pub fn record_count(&self) -> usize {
        self.rates.values().map(BTreeMap::len).sum()
    }
}

/// One (date, currency, rate) row of a flattened history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedRateEntry {
    pub date: NaiveDate,
    pub currency: CurrencyCode,
    pub rate: Decimal,
}

/// A page of flattened history rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedHistory {
    pub base_currency: CurrencyCode,
    pub page: u32,
    pub page_size: u32,
    pub total_records: usize,
    pub rows: Vec<FlattenedRateEntry>,
}
