//! Conversion and history service.

use std::sync::Arc;

use chrono::NaiveDate;
use exrate_common::{CurrencyCode, PaginatedHistory, RateSnapshot};
use tracing::{info, instrument};

use crate::conversion::{ConversionOutcome, ConversionRequest};
use crate::error::FxResult;
use crate::pagination::{paginate, PageRequest};
use crate::policy::CurrencyPolicy;
use crate::provider::RateProvider;

/// Entry point for the three rate operations.
///
/// Applies the currency policy before conversions and pages history
/// results. Caching and resilience live in the provider.
pub struct ExchangeService {
    provider: Arc<dyn RateProvider>,
    policy: CurrencyPolicy,
}

impl ExchangeService {
    /// Create a service with the default currency policy.
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        Self::with_policy(provider, CurrencyPolicy::default())
    }

    pub fn with_policy(provider: Arc<dyn RateProvider>, policy: CurrencyPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &CurrencyPolicy {
        &self.policy
    }

    /// Latest rates for `base`.
    #[instrument(skip(self), fields(provider = %self.provider.name()))]
    pub async fn latest_rates(&self, base: &CurrencyCode) -> FxResult<Arc<RateSnapshot>> {
        self.provider.latest(base).await
    }

    /// Convert an amount, refusing pairs the policy does not allow.
    #[instrument(skip(self, request), fields(
        from = %request.from_currency,
        to = %request.to_currency,
        amount = %request.amount
    ))]
    pub async fn convert(&self, request: ConversionRequest) -> FxResult<ConversionOutcome> {
        self.policy
            .check_pair(&request.from_currency, &request.to_currency)?;

        let converted = self
            .provider
            .convert(&request.from_currency, &request.to_currency, request.amount)
            .await?;

        let outcome = ConversionOutcome::new(request, converted);

        info!(converted = %outcome.converted_amount, "Conversion completed");

        Ok(outcome)
    }

    /// One page of historical rates for `base` between `start` and `end`.
    #[instrument(skip(self))]
    pub async fn historical_rates(
        &self,
        base: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
        page: PageRequest,
    ) -> FxResult<PaginatedHistory> {
        page.validate()?;

        let history = self.provider.history(base, start, end).await?;
        paginate(self.provider.name(), &history, page)
    }
}
