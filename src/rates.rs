//! Cache-aside retrieval of the published exchange rates.
//!
//! Source-side failures (unreachable source, timeout, malformed document)
//! are logged and answered with an empty list: callers always get rates or
//! nothing, never an error for a bank-side outage. Only an empty request is
//! reported as an error.

use crate::core::currency::{Currency, ExchangeRate, RateSnapshot};
use crate::core::error::{ErrorCategory, RatesError, SourceError};
use crate::providers::cnb_parser::parse_rates;
use crate::providers::fetcher::{DocumentFetcher, HttpFetcher};
use crate::store::memory::MemoryCache;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_SOURCE_URL: &str =
    "https://www.cnb.cz/cs/financni_trhy/devizovy_trh/kurzy_devizoveho_trhu/denni_kurz.xml";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// The whole published table lives under this one key.
pub const RATES_CACHE_KEY: &str = "daily-rates";

pub type RateCache = MemoryCache<String, Arc<RateSnapshot>>;

#[derive(Debug, Clone)]
pub struct RatesConfig {
    pub source_url: String,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
}

impl RatesConfig {
    pub fn new(source_url: &str) -> Self {
        RatesConfig {
            source_url: source_url.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig::new(DEFAULT_SOURCE_URL)
    }
}

pub struct ExchangeRateService {
    config: RatesConfig,
    fetcher: Arc<dyn DocumentFetcher>,
    cache: Arc<RateCache>,
}

impl ExchangeRateService {
    /// Creates a service fetching over HTTP with the configured timeout.
    pub fn new(config: RatesConfig, cache: Arc<RateCache>) -> reqwest::Result<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher), cache))
    }

    pub fn with_fetcher(
        config: RatesConfig,
        fetcher: Arc<dyn DocumentFetcher>,
        cache: Arc<RateCache>,
    ) -> Self {
        ExchangeRateService {
            config,
            fetcher,
            cache,
        }
    }

    /// Returns the published rates whose target is one of `currencies`.
    ///
    /// Requested codes the source does not publish are left out. Rates are
    /// always quoted against the Czech crown; nothing is inverted or crossed.
    #[instrument(skip(self, currencies), fields(requested = currencies.len()))]
    pub async fn get_exchange_rates(
        &self,
        currencies: &[Currency],
    ) -> Result<Vec<ExchangeRate>, RatesError> {
        if currencies.is_empty() {
            let err = RatesError::InvalidInput;
            warn!(category = %err.category(), "Rejected rate request: {}", err);
            return Err(err);
        }

        let snapshot = match self.load_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let stale = self.cache.get_stale(&RATES_CACHE_KEY.to_string()).await;
                debug!(
                    error = %err,
                    stale_snapshot_retained = stale.is_some(),
                    "No rates available, returning empty result"
                );
                return Ok(Vec::new());
            }
        };

        let rates = filter_rates(&snapshot, currencies);
        if rates.len() < currencies.len() {
            let missing: Vec<&str> = currencies
                .iter()
                .filter(|c| !rates.iter().any(|r| r.target() == *c))
                .map(Currency::code)
                .collect();
            debug!(?missing, "Requested currencies not published by the source");
        }
        Ok(rates)
    }

    async fn load_snapshot(&self) -> Result<Arc<RateSnapshot>, SourceError> {
        let fetcher = Arc::clone(&self.fetcher);
        let url = self.config.source_url.clone();

        let loader = async move {
            info!(url = %url, "Fetching exchange rates");
            let raw = fetcher
                .fetch(&url)
                .await
                .inspect_err(|e| log_source_error(&url, e))?;
            let snapshot = parse_rates(&raw).inspect_err(|e| log_source_error(&url, e))?;
            info!(
                url = %url,
                rates = snapshot.rates.len(),
                published_on = ?snapshot.published_on,
                "Caching exchange rates"
            );
            Ok::<_, SourceError>(Arc::new(snapshot))
        };

        self.cache
            .get_or_load(
                RATES_CACHE_KEY.to_string(),
                Some(self.config.cache_ttl),
                loader,
            )
            .await
    }
}

fn log_source_error(url: &str, err: &SourceError) {
    let category = err.category();
    match category {
        ErrorCategory::Timeout => {
            warn!(category = %category, url, error = %err, "Timed out fetching rate document")
        }
        ErrorCategory::MalformedSource => {
            error!(category = %category, url, error = %err, "Failed to parse rate document")
        }
        _ => error!(category = %category, url, error = %err, "Failed to fetch rate document"),
    }
}

fn filter_rates(snapshot: &RateSnapshot, currencies: &[Currency]) -> Vec<ExchangeRate> {
    let requested: HashSet<&Currency> = currencies.iter().collect();
    snapshot
        .rates
        .iter()
        .filter(|rate| requested.contains(rate.target()))
        .cloned()
        .collect()
}
