//! Upstream rate source contract.

use async_trait::async_trait;
use chrono::NaiveDate;
use exrate_common::{CurrencyCode, HistoryResult, RateSnapshot};
use rust_decimal::Decimal;

use crate::error::FxResult;

/// Raw access to the upstream exchange-rate source.
///
/// Implementations perform a single request per call, with no caching or
/// retrying. Errors must be classified as
/// [`FxError::TransientUpstream`](crate::FxError::TransientUpstream) or
/// [`FxError::PermanentUpstream`](crate::FxError::PermanentUpstream) so the
/// resilience layer can react to them.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Source name, used in breaker destinations and error messages.
    fn name(&self) -> &str;

    /// Latest rates for `base`.
    async fn fetch_latest(&self, base: &CurrencyCode) -> FxResult<RateSnapshot>;

    /// Latest rates for `from`, restricted to `to` and scaled by `amount`.
    async fn fetch_scoped(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> FxResult<RateSnapshot>;

    /// Rates for `base` between `start` and `end` inclusive.
    async fn fetch_history(
        &self,
        base: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> FxResult<HistoryResult>;
}

#[cfg(test)]
pub use mock::MockUpstreamSource;
