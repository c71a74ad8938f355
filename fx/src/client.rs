//! Cached, resilient client over the upstream rate source.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use exrate_common::{CurrencyCode, HistoryResult, RateSnapshot, COMPACT_DATE_FORMAT};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::instrument;

use crate::cache::{RateCache, SharedRateCache};
use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;
use crate::resilience::Resilience;
use crate::upstream::UpstreamSource;

/// [`RateProvider`] backed by an [`UpstreamSource`].
///
/// Every query is answered from the cache when possible. On a miss the
/// upstream call runs through the resilience layer and only a successful
/// result is stored. All three queries share one TTL.
pub struct UpstreamRateClient {
    source: Arc<dyn UpstreamSource>,
    cache: SharedRateCache,
    resilience: Arc<Resilience>,
    ttl: Duration,
}

impl UpstreamRateClient {
    pub fn new(
        source: Arc<dyn UpstreamSource>,
        cache: SharedRateCache,
        resilience: Arc<Resilience>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            resilience,
            ttl,
        }
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn resilience(&self) -> &Resilience {
        &self.resilience
    }

    /// Breaker destination for one class of upstream query.
    pub fn destination(&self, operation: &str) -> String {
        format!("{}:{}", self.source.name(), operation)
    }

    fn latest_key(base: &CurrencyCode) -> String {
        format!("latest:{base}")
    }

    // Raw caller case on purpose: "usd" and "USD" are different entries.
    fn convert_key(from: &CurrencyCode, to: &CurrencyCode, amount: Decimal) -> String {
        format!("convert:{from}:{to}:{amount}")
    }

    fn history_key(base: &CurrencyCode, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "history:{}:{}:{}",
            base,
            start.format(COMPACT_DATE_FORMAT),
            end.format(COMPACT_DATE_FORMAT)
        )
    }
}

/// Round half to even, to a whole unit.
fn round_to_unit(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
}

#[async_trait]
impl RateProvider for UpstreamRateClient {
    fn name(&self) -> &str {
        self.source.name()
    }

    #[instrument(skip(self), fields(base = %base))]
    async fn latest(&self, base: &CurrencyCode) -> FxResult<Arc<RateSnapshot>> {
        let destination = self.destination("latest");

        self.cache
            .get_or_compute(&Self::latest_key(base), self.ttl, || {
                self.resilience
                    .execute(&destination, || self.source.fetch_latest(base))
            })
            .await
    }

    #[instrument(skip(self), fields(from = %from, to = %to, amount = %amount))]
    async fn convert(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> FxResult<Decimal> {
        let destination = self.destination("convert");

        let converted = self
            .cache
            .get_or_compute(&Self::convert_key(from, to, amount), self.ttl, || async {
                let snapshot = self
                    .resilience
                    .execute(&destination, || self.source.fetch_scoped(from, to, amount))
                    .await?;

                snapshot
                    .rate_for(to)
                    .map(round_to_unit)
                    .ok_or_else(|| FxError::RateNotFound(to.to_string()))
            })
            .await?;

        Ok(*converted)
    }

    #[instrument(skip(self), fields(base = %base, start = %start, end = %end))]
    async fn history(
        &self,
        base: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> FxResult<Arc<HistoryResult>> {
        let destination = self.destination("history");

        self.cache
            .get_or_compute(&Self::history_key(base, start, end), self.ttl, || {
                self.resilience
                    .execute(&destination, || self.source.fetch_history(base, start, end))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitState;
    use crate::upstream::MockUpstreamSource;
    use exrate_common::RateTable;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(base: &str, rates: &[(&str, Decimal)]) -> RateSnapshot {
        let rates: RateTable = rates
            .iter()
            .map(|(c, r)| (CurrencyCode::new(*c), *r))
            .collect();
        RateSnapshot::new(CurrencyCode::new(base), date(2024, 1, 2), rates, dec!(1))
    }

    fn history(base: &str) -> HistoryResult {
        let mut rates = BTreeMap::new();
        rates.insert(
            "2024-01-01".to_string(),
            RateTable::from([(CurrencyCode::eur(), dec!(0.9))]),
        );
        HistoryResult {
            base: CurrencyCode::new(base),
            amount: dec!(1),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 10),
            rates,
        }
    }

    fn setup() -> (Arc<MockUpstreamSource>, UpstreamRateClient) {
        let source = Arc::new(MockUpstreamSource::new("mock"));
        source.set_latest(snapshot("USD", &[("EUR", dec!(0.91)), ("INR", dec!(82.4))]));
        source.set_latest(snapshot("EUR", &[("USD", dec!(1.11)), ("GBP", dec!(2.5))]));
        source.set_history(history("USD"));

        let client = UpstreamRateClient::new(
            source.clone(),
            Arc::new(RateCache::new()),
            Arc::new(Resilience::default()),
            Duration::minutes(10),
        );
        (source, client)
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(UpstreamRateClient::latest_key(&CurrencyCode::usd()), "latest:USD");
        assert_eq!(
            UpstreamRateClient::convert_key(&CurrencyCode::usd(), &CurrencyCode::inr(), dec!(100)),
            "convert:USD:INR:100"
        );
        assert_eq!(
            UpstreamRateClient::history_key(&CurrencyCode::usd(), date(2024, 1, 1), date(2024, 1, 10)),
            "history:USD:20240101:20240110"
        );
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(round_to_unit(dec!(1.11)), dec!(1));
        assert_eq!(round_to_unit(dec!(2.5)), dec!(2));
        assert_eq!(round_to_unit(dec!(3.5)), dec!(4));
        assert_eq!(round_to_unit(dec!(82.6)), dec!(83));
    }

    #[tokio::test]
    async fn test_latest_is_cached() {
        let (source, client) = setup();

        let first = client.latest(&CurrencyCode::usd()).await.unwrap();
        let second = client.latest(&CurrencyCode::usd()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.rate_for(&CurrencyCode::eur()), Some(dec!(0.91)));
        assert_eq!(source.latest_calls(), 1);
    }

    #[tokio::test]
    async fn test_convert_rounds_rate() {
        let (source, client) = setup();

        let converted = client
            .convert(&CurrencyCode::eur(), &CurrencyCode::usd(), dec!(50))
            .await
            .unwrap();

        assert_eq!(converted, dec!(1));
        assert_eq!(source.scoped_calls(), 1);
        assert!(client.cache().get::<Decimal>("convert:EUR:USD:50").is_some());
    }

    #[tokio::test]
    async fn test_convert_key_is_case_sensitive() {
        let (source, client) = setup();

        let upper = client
            .convert(&CurrencyCode::eur(), &CurrencyCode::usd(), dec!(10))
            .await
            .unwrap();
        let lower = client
            .convert(&CurrencyCode::new("eur"), &CurrencyCode::new("usd"), dec!(10))
            .await
            .unwrap();
        client
            .convert(&CurrencyCode::new("eur"), &CurrencyCode::new("usd"), dec!(10))
            .await
            .unwrap();

        assert_eq!(upper, lower);
        assert_eq!(source.scoped_calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_target_is_not_found_and_not_cached() {
        let (source, client) = setup();

        for _ in 0..2 {
            let result = client
                .convert(&CurrencyCode::usd(), &CurrencyCode::new("JPY"), dec!(5))
                .await;
            assert!(matches!(result, Err(FxError::RateNotFound(ref c)) if c == "JPY"));
        }

        assert_eq!(source.scoped_calls(), 2);
        assert!(client.cache().is_empty());
        assert_eq!(client.resilience().breaker().failure_count("mock:convert"), 0);
    }

    #[tokio::test]
    async fn test_history_is_cached() {
        let (source, client) = setup();

        let first = client
            .history(&CurrencyCode::usd(), date(2024, 1, 1), date(2024, 1, 10))
            .await
            .unwrap();
        let second = client
            .history(&CurrencyCode::usd(), date(2024, 1, 1), date(2024, 1, 10))
            .await
            .unwrap();
        client
            .history(&CurrencyCode::usd(), date(2024, 1, 1), date(2024, 1, 11))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.history_calls(), 2);
    }

    #[tokio::test]
    async fn test_upstream_error_is_not_cached() {
        let (source, client) = setup();
        source.push_failure(FxError::permanent("mock", "HTTP 400"));

        let result = client.latest(&CurrencyCode::usd()).await;
        assert!(matches!(result, Err(FxError::PermanentUpstream { .. })));
        assert!(client.cache().is_empty());

        client.latest(&CurrencyCode::usd()).await.unwrap();
        assert_eq!(source.latest_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_skips_upstream() {
        let (source, client) = setup();
        source.push_transient_failures(12);

        for _ in 0..3 {
            assert!(matches!(
                client.latest(&CurrencyCode::usd()).await,
                Err(FxError::TransientUpstream { .. })
            ));
        }
        assert_eq!(source.latest_calls(), 12);

        let result = client.latest(&CurrencyCode::usd()).await;
        assert!(matches!(result, Err(FxError::CircuitOpen { ref destination }) if destination == "mock:latest"));
        assert_eq!(source.latest_calls(), 12);

        // Other endpoint classes keep their own circuit
        client
            .history(&CurrencyCode::usd(), date(2024, 1, 1), date(2024, 1, 10))
            .await
            .unwrap();

        tokio::time::advance(std::time::Duration::from_secs(30)).await;
        client.latest(&CurrencyCode::usd()).await.unwrap();
        assert_eq!(source.latest_calls(), 13);
        assert_eq!(
            client.resilience().breaker().state("mock:latest"),
            CircuitState::Closed
        );
    }
}
