//! Rate provider contract.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use exrate_common::{CurrencyCode, HistoryResult, RateSnapshot};
use rust_decimal::Decimal;

use crate::error::FxResult;

/// The three logical rate queries the service layer depends on.
///
/// One provider is active per process. How it is chosen is up to whoever
/// wires the service together.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Latest rates for `base`.
    async fn latest(&self, base: &CurrencyCode) -> FxResult<Arc<RateSnapshot>>;

    /// Convert `amount` of `from` into `to`, rounded to a whole unit.
    async fn convert(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> FxResult<Decimal>;

    /// Historical rates for `base` between `start` and `end`.
    async fn history(
        &self,
        base: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> FxResult<Arc<HistoryResult>>;
}
