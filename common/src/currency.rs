//! Currency codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217 style currency code as supplied by the caller.
///
/// Unlike most currency types this keeps the original case. Cache keys are
/// built from the raw code, while rate lookups and policy checks go through
/// [`CurrencyCode::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a currency code without changing its case.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Get the code exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Upper-cased copy of this code.
    pub fn normalized(&self) -> CurrencyCode {
        Self(self.0.to_uppercase())
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    pub fn inr() -> Self {
        Self::new("INR")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CurrencyCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_is_preserved() {
        let code = CurrencyCode::new("usd");
        assert_eq!(code.as_str(), "usd");
        assert_eq!(code.to_string(), "usd");
        assert_ne!(code, CurrencyCode::usd());
    }

    #[test]
    fn test_normalized() {
        assert_eq!(CurrencyCode::new("eUr").normalized(), CurrencyCode::eur());
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&CurrencyCode::gbp()).unwrap();
        assert_eq!(json, "\"GBP\"");

        let code: CurrencyCode = serde_json::from_str("\"inr\"").unwrap();
        assert_eq!(code.as_str(), "inr");
    }
}
