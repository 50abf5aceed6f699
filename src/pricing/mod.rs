// Pricing module - daily price history with a per-process cache

pub mod yahoo;

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::DashError;
use crate::reports::DateRange;
use crate::tickers::ResolvedTicker;

/// Global singleton fetcher.
/// The cache is shared across all lookups within a process.
static GLOBAL_FETCHER: Lazy<PriceFetcher> = Lazy::new(PriceFetcher::new);

/// One trading day as returned by the market-data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

/// Market-data backend, queried once per exchange symbol
pub trait PriceSource: Send + Sync {
    fn daily_bars(
        &self,
        symbol: &str,
        range: DateRange,
        timeout_secs: u64,
    ) -> impl Future<Output = Result<Vec<PriceBar>>> + Send;
}

/// Yahoo Finance chart API
#[derive(Debug, Default, Clone, Copy)]
pub struct YahooSource;

impl PriceSource for YahooSource {
    async fn daily_bars(
        &self,
        symbol: &str,
        range: DateRange,
        timeout_secs: u64,
    ) -> Result<Vec<PriceBar>> {
        yahoo::fetch_daily_bars(symbol, range.from, range.to, timeout_secs).await
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    bars: Vec<PriceBar>,
    timestamp: chrono::DateTime<Utc>,
}

type CacheKey = (String, NaiveDate, NaiveDate);

/// Price history fetcher with an in-memory cache keyed by symbol and range
pub struct PriceFetcher<S = YahooSource> {
    source: S,
    cache: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
}

impl Default for PriceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceFetcher {
    pub fn new() -> Self {
        Self::with_source(YahooSource)
    }
}

impl<S: PriceSource> PriceFetcher<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetch the daily bars of `ticker` over `range`.
    ///
    /// Symbols are tried in the order the ticker's market prefers; the first
    /// one returning data wins. Cached series are served even offline.
    ///
    /// `EmptyPriceData` means some symbol answered without bars. When every
    /// symbol failed outright, the last failure is returned as is.
    pub async fn fetch_history(
        &self,
        ticker: &ResolvedTicker,
        range: DateRange,
        config: &Config,
    ) -> Result<Vec<PriceBar>> {
        let symbols = ticker.symbols();
        let ttl = Duration::hours(config.price_cache_ttl_hours);

        for symbol in &symbols {
            if let Some(bars) = self.cached(symbol, range, ttl) {
                debug!("Using cached prices for {} ({})", symbol, range);
                return Ok(bars);
            }
        }

        if config.offline {
            return Err(DashError::Pricing(format!(
                "offline mode is on, cannot fetch prices for {}",
                ticker.code
            ))
            .into());
        }

        let mut answered = false;
        let mut last_err: Option<anyhow::Error> = None;
        for symbol in &symbols {
            match self
                .source
                .daily_bars(symbol, range, config.http_timeout_secs)
                .await
            {
                Ok(bars) if !bars.is_empty() => {
                    info!("Loaded {} daily bars for {}", bars.len(), symbol);
                    self.store(symbol, range, bars.clone(), ttl);
                    return Ok(bars);
                }
                Ok(_) => {
                    debug!("No bars for {} in {}", symbol, range);
                    answered = true;
                }
                Err(err) if is_unknown_symbol(&err) => {
                    debug!("{} is not listed on the data source: {:#}", symbol, err);
                    answered = true;
                }
                Err(err) => {
                    warn!("Price fetch for {} failed: {:#}", symbol, err);
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) if !answered => Err(err),
            _ => Err(DashError::EmptyPriceData {
                ticker: ticker.code.clone(),
                from: range.from,
                to: range.to,
            }
            .into()),
        }
    }
}

impl<S> PriceFetcher<S> {
    fn cached(&self, symbol: &str, range: DateRange, ttl: Duration) -> Option<Vec<PriceBar>> {
        let cache = self.cache.lock().expect("price cache mutex poisoned");
        let entry = cache.get(&(symbol.to_string(), range.from, range.to))?;
        let age = Utc::now().signed_duration_since(entry.timestamp);
        (age < ttl).then(|| entry.bars.clone())
    }

    /// Insert a fresh series and drop every entry older than `ttl`
    fn store(&self, symbol: &str, range: DateRange, bars: Vec<PriceBar>, ttl: Duration) {
        let now = Utc::now();
        let mut cache = self.cache.lock().expect("price cache mutex poisoned");
        cache.retain(|_, entry| now.signed_duration_since(entry.timestamp) < ttl);
        cache.insert(
            (symbol.to_string(), range.from, range.to),
            CacheEntry {
                bars,
                timestamp: now,
            },
        );
    }
}

fn is_unknown_symbol(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<DashError>(),
        Some(DashError::UnknownSymbol(_))
    )
}

/// Fetch price history through the global shared fetcher.
pub async fn fetch_price_history(
    ticker: &ResolvedTicker,
    range: DateRange,
    config: &Config,
) -> Result<Vec<PriceBar>> {
    GLOBAL_FETCHER.fetch_history(ticker, range, config).await
}

/// Put a series into the global cache so lookups run without the network
#[cfg(test)]
pub(crate) fn seed_global_cache(symbol: &str, range: DateRange, bars: Vec<PriceBar>) {
    GLOBAL_FETCHER.store(symbol, range, bars, Duration::hours(24));
}
