//! Currency conversion request and result types.

use exrate_common::{now, CurrencyCode, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to convert an amount between two currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    /// Source currency, as supplied by the caller.
    pub from_currency: CurrencyCode,
    /// Target currency, as supplied by the caller.
    pub to_currency: CurrencyCode,
    /// Amount of source currency.
    pub amount: Decimal,
}

impl ConversionRequest {
    pub fn new(
        from_currency: impl Into<CurrencyCode>,
        to_currency: impl Into<CurrencyCode>,
        amount: Decimal,
    ) -> Self {
        Self {
            from_currency: from_currency.into(),
            to_currency: to_currency.into(),
            amount,
        }
    }
}

/// Result of a conversion.
///
/// Built fresh for every request and never cached. `computed_at` is the
/// time the service produced the result, not the as-of date of the rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutcome {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub original_amount: Decimal,
    pub converted_amount: Decimal,
    pub computed_at: Timestamp,
}

impl ConversionOutcome {
    /// Wrap a converted amount, stamping it with the current time.
    pub fn new(request: ConversionRequest, converted_amount: Decimal) -> Self {
        Self {
            from: request.from_currency,
            to: request.to_currency,
            original_amount: request.amount,
            converted_amount,
            computed_at: now(),
        }
    }
}
