//! Exrate CLI
//!
//! Query latest rates, convert amounts and page through historical rates
//! from the command line. Results are printed as JSON on stdout; logs go to
//! stderr.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use exrate_common::CurrencyCode;
use exrate_fx::{
    ConversionRequest, ExchangeService, FrankfurterSource, FxConfig, PageRequest, RateCache,
    Resilience, UpstreamRateClient,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod metrics;

use metrics::BurstMetrics;

/// Exrate CLI
#[derive(Parser, Debug)]
#[command(name = "exrate")]
#[command(about = "Cached, resilient exchange-rate lookups")]
struct Args {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Override the upstream base URL
    #[arg(long, global = true)]
    upstream_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Latest rates for a base currency
    Latest {
        #[arg(default_value = "EUR")]
        base: String,
    },

    /// Convert an amount between two currencies
    Convert {
        from: String,
        to: String,
        amount: Decimal,
    },

    /// One page of historical rates
    History {
        base: String,
        /// First date (YYYY-MM-DD)
        start: NaiveDate,
        /// Last date (YYYY-MM-DD)
        end: NaiveDate,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "10")]
        page_size: u32,
    },

    /// Fire concurrent identical latest-rate requests
    Burst {
        #[arg(default_value = "EUR")]
        base: String,
        /// Number of concurrent requests
        #[arg(short, long, default_value = "20")]
        requests: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(
            args.json_logs
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!args.json_logs)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    // Load configuration
    let mut config = FxConfig::from_env();
    if let Some(url) = args.upstream_url {
        config.upstream_base_url = url;
    }
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    info!(
        upstream = %config.upstream_base_url,
        cache_ttl_minutes = config.cache_ttl_minutes,
        "Starting exrate"
    );

    let source = FrankfurterSource::new(&config.upstream_base_url, config.request_timeout)?;
    let client = Arc::new(UpstreamRateClient::new(
        Arc::new(source),
        Arc::new(RateCache::new()),
        Arc::new(Resilience::new(config.resilience())),
        config.cache_ttl(),
    ));
    let service = ExchangeService::with_policy(client.clone(), config.policy());

    match args.command {
        Command::Latest { base } => {
            let snapshot = service.latest_rates(&CurrencyCode::new(base)).await?;
            print_json(&*snapshot)?;
        }
        Command::Convert { from, to, amount } => {
            let outcome = service
                .convert(ConversionRequest::new(from, to, amount))
                .await?;
            print_json(&outcome)?;
        }
        Command::History {
            base,
            start,
            end,
            page,
            page_size,
        } => {
            let history = service
                .historical_rates(
                    &CurrencyCode::new(base),
                    start,
                    end,
                    PageRequest::new(page, page_size),
                )
                .await?;
            print_json(&history)?;
        }
        Command::Burst { base, requests } => {
            let base = CurrencyCode::new(base);
            let metrics = run_burst(&service, &base, requests).await;
            let cache = client.cache().stats();

            print_json(&serde_json::json!({
                "base": base,
                "requests": metrics.report(),
                "cache": {
                    "totalEntries": cache.total_entries,
                    "liveEntries": cache.live_entries,
                    "expiredEntries": cache.expired_entries,
                },
            }))?;
        }
    }

    Ok(())
}

/// Issue `requests` concurrent `latest` calls and collect their latencies.
async fn run_burst(service: &ExchangeService, base: &CurrencyCode, requests: usize) -> BurstMetrics {
    let calls = (0..requests).map(|_| async move {
        let started = Instant::now();
        let result = service.latest_rates(base).await;
        (result, started.elapsed())
    });

    let mut metrics = BurstMetrics::new();
    for (result, elapsed) in futures::future::join_all(calls).await {
        match result {
            Ok(_) => metrics.record_success(elapsed.as_millis() as u64),
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Burst request failed");
                metrics.record_failure();
            }
        }
    }

    info!(
        total = metrics.total_requests,
        failed = metrics.failed_requests,
        average_latency_ms = metrics.average_latency_ms(),
        "Burst complete"
    );

    metrics
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
