//! Exrate FX
//!
//! Resilient, cached access to an upstream exchange-rate source.
//!
//! # Features
//!
//! - Cache-aside rate cache with a shared TTL and no negative caching
//! - Retry with exponential backoff and jitter for transient upstream failures
//! - Per-destination circuit breaker in front of the retry loop
//! - Currency policy gate and paginated historical rates
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use exrate_fx::{
//!     ConversionRequest, ExchangeService, FrankfurterSource, FxConfig, RateCache, Resilience,
//!     UpstreamRateClient,
//! };
//!
//! let config = FxConfig::from_env();
//! let source = FrankfurterSource::new(&config.upstream_base_url, config.request_timeout)?;
//! let client = UpstreamRateClient::new(
//!     Arc::new(source),
//!     Arc::new(RateCache::new()),
//!     Arc::new(Resilience::new(config.resilience())),
//!     config.cache_ttl(),
//! );
//! let service = ExchangeService::with_policy(Arc::new(client), config.policy());
//!
//! let outcome = service
//!     .convert(ConversionRequest::new("EUR", "USD", dec!(50)))
//!     .await?;
//! ```

pub mod cache;
pub mod circuit_breaker;
pub mod client;
pub mod config;
pub mod conversion;
pub mod error;
pub mod frankfurter;
pub mod pagination;
pub mod policy;
pub mod provider;
pub mod resilience;
pub mod service;
pub mod upstream;

pub use cache::{CacheStats, RateCache, SharedRateCache};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::UpstreamRateClient;
pub use config::FxConfig;
pub use conversion::{ConversionOutcome, ConversionRequest};
pub use error::{FxError, FxResult};
pub use frankfurter::FrankfurterSource;
pub use pagination::{flatten, paginate, PageRequest};
pub use policy::CurrencyPolicy;
pub use provider::RateProvider;
pub use resilience::{Resilience, ResilienceConfig, RetryPolicy};
pub use service::ExchangeService;
pub use upstream::UpstreamSource;
