//! Frankfurter API source.
//!
//! Talks to a Frankfurter-compatible service (<https://frankfurter.dev>):
//!
//! - `GET {base_url}/latest?base=USD`
//! - `GET {base_url}/latest?base=EUR&symbols=USD&amount=50`
//! - `GET {base_url}/2024-01-01..2024-01-31?base=USD`

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use exrate_common::{CurrencyCode, HistoryResult, RateSnapshot, ISO_DATE_FORMAT};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::{FxError, FxResult};
use crate::upstream::UpstreamSource;

const SOURCE_NAME: &str = "frankfurter";

/// HTTP client for the Frankfurter API.
pub struct FrankfurterSource {
    client: Client,
    base_url: String,
}

impl FrankfurterSource {
    /// Create a source for `base_url`. `timeout` bounds each HTTP request.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> FxResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FxError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn latest_url(&self) -> String {
        format!("{}/latest", self.base_url)
    }

    fn history_url(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/{}..{}",
            self.base_url,
            start.format(ISO_DATE_FORMAT),
            end.format(ISO_DATE_FORMAT)
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> FxResult<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FxError::transient(SOURCE_NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %response.url(), "Frankfurter API request failed");
            return Err(classify_status(status));
        }

        info!(status = %status, url = %response.url(), "Called Frankfurter API");

        response.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                FxError::permanent(SOURCE_NAME, format!("malformed response: {e}"))
            } else {
                FxError::transient(SOURCE_NAME, e.to_string())
            }
        })
    }
}

/// Map a non-success HTTP status to an error class.
fn classify_status(status: StatusCode) -> FxError {
    let message = format!("HTTP {status}");
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        FxError::transient(SOURCE_NAME, message)
    } else {
        FxError::permanent(SOURCE_NAME, message)
    }
}

#[async_trait]
impl UpstreamSource for FrankfurterSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_latest(&self, base: &CurrencyCode) -> FxResult<RateSnapshot> {
        self.get_json(&self.latest_url(), &[("base", base.to_string())])
            .await
    }

    async fn fetch_scoped(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        amount: Decimal,
    ) -> FxResult<RateSnapshot> {
        self.get_json(
            &self.latest_url(),
            &[
                ("base", from.to_string()),
                ("symbols", to.to_string()),
                ("amount", amount.to_string()),
            ],
        )
        .await
    }

    async fn fetch_history(
        &self,
        base: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> FxResult<HistoryResult> {
        self.get_json(&self.history_url(start, end), &[("base", base.to_string())])
            .await
    }
}
