pub mod cli;
pub mod core;
pub mod providers;
pub mod rates;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::currency::Currency;
use crate::rates::{ExchangeRateService, RateCache};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

pub enum AppCommand {
    /// Show rates for the given currency codes, or the configured ones if empty
    Rates { currencies: Vec<String>, json: bool },
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    if let Some(path) = config_path {
        return AppConfig::load_from_path(path);
    }

    let default_path = AppConfig::default_config_path()?;
    if default_path.exists() {
        AppConfig::load()
    } else {
        debug!(
            "No config at {}, using defaults",
            default_path.display()
        );
        Ok(AppConfig::default())
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    let cache = Arc::new(RateCache::new());
    let service = ExchangeRateService::new(config.rates_config(), cache)
        .context("Failed to create HTTP client")?;

    match command {
        AppCommand::Rates { currencies, json } => {
            let currencies: Vec<Currency> = if currencies.is_empty() {
                config.default_currencies()
            } else {
                currencies.iter().map(|c| Currency::new(c)).collect()
            };
            cli::rates::show_rates(&service, &currencies, json).await
        }
    }
}
