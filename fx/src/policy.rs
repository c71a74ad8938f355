//! Currency policy gate.

use std::collections::HashSet;

use exrate_common::CurrencyCode;

use crate::error::{FxError, FxResult};

/// Currencies refused by default.
pub const DEFAULT_DENIED_CURRENCIES: [&str; 4] = ["TRY", "PLN", "THB", "MXN"];

/// Decides which currency pairs may be converted.
///
/// Codes are stored upper-cased and compared case-insensitively. When an
/// allowlist is set, codes outside it are refused too.
#[derive(Debug, Clone)]
pub struct CurrencyPolicy {
    denied: HashSet<String>,
    allowed: Option<HashSet<String>>,
}

impl Default for CurrencyPolicy {
    fn default() -> Self {
        Self::with_denied(DEFAULT_DENIED_CURRENCIES)
    }
}

impl CurrencyPolicy {
    /// Policy refusing exactly `denied`.
    pub fn with_denied<I, S>(denied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            denied: upper_set(denied),
            allowed: None,
        }
    }

    /// Only accept codes in `allowed`, on top of the denylist.
    pub fn with_allowed<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed = Some(upper_set(allowed));
        self
    }

    /// Check if a single code is permitted.
    pub fn is_supported(&self, currency: &CurrencyCode) -> bool {
        let code = currency.normalized();

        if self.denied.contains(code.as_str()) {
            return false;
        }

        match &self.allowed {
            Some(allowed) => allowed.contains(code.as_str()),
            None => true,
        }
    }

    /// Check both sides of a conversion.
    pub fn check_pair(&self, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<()> {
        if self.is_supported(from) && self.is_supported(to) {
            Ok(())
        } else {
            Err(FxError::PolicyRejected)
        }
    }

    pub fn denied(&self) -> impl Iterator<Item = &str> {
        self.denied.iter().map(String::as_str)
    }
}

fn upper_set<I, S>(codes: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    codes
        .into_iter()
        .map(|c| c.as_ref().trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}
