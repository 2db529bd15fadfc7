use anyhow::{Context, Result};
use common::CurrencyCode;
use compute::summary::SummaryPolicy;
use moka::future::Cache;
use sea_orm::Database;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::schemas::AppState;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://billdesk.db";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Runtime settings.
///
/// Resolved in order: built-in defaults, an optional `billdesk.toml` in the working directory,
/// then `BILLDESK_*` environment variables (e.g. `BILLDESK_CURRENCY_CODE=USD`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    /// ISO-4217 code every amount is denominated in.
    pub currency_code: String,
    /// Expense category whose total is reported as salary expenses.
    pub payroll_category: String,
    /// Expense category whose total is reported as advance expenses.
    pub advance_category: String,
    pub summary_cache_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let policy = SummaryPolicy::default();
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            currency_code: "INR".to_string(),
            payroll_category: policy.payroll_category,
            advance_category: policy.advance_category,
            summary_cache_ttl_secs: 60,
        }
    }
}

impl Settings {
    /// Loads `.env`, then layers `billdesk.toml` and the environment over the defaults.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Settings::default();

        let settings: Settings = config::Config::builder()
            .set_default("database_url", defaults.database_url)?
            .set_default("bind_address", defaults.bind_address)?
            .set_default("currency_code", defaults.currency_code)?
            .set_default("payroll_category", defaults.payroll_category)?
            .set_default("advance_category", defaults.advance_category)?
            .set_default("summary_cache_ttl_secs", defaults.summary_cache_ttl_secs as i64)?
            .add_source(config::File::with_name("billdesk").required(false))
            .add_source(config::Environment::with_prefix("BILLDESK"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        // Fail at startup rather than on the first summary request.
        settings.currency()?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Applies command-line values over the loaded settings.
    pub fn with_overrides(mut self, database_url: Option<String>, bind_address: Option<String>) -> Self {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
        self
    }

    pub fn currency(&self) -> Result<CurrencyCode> {
        CurrencyCode::parse(&self.currency_code)
            .with_context(|| format!("Unsupported currency code '{}'", self.currency_code))
    }

    pub fn summary_policy(&self) -> SummaryPolicy {
        SummaryPolicy {
            payroll_category: self.payroll_category.clone(),
            advance_category: self.advance_category.clone(),
        }
    }
}

/// For file-backed SQLite URLs without options, asks the driver to create the file if missing.
pub fn creating_sqlite_url(database_url: &str) -> String {
    if database_url.starts_with("sqlite://") && !database_url.contains('?') {
        format!("{}?mode=rwc", database_url)
    } else {
        database_url.to_string()
    }
}

/// Connects to `database_url` and builds the shared handler state from `settings`.
pub async fn initialize_app_state_with_url(
    database_url: &str,
    settings: &Settings,
) -> Result<AppState> {
    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    let cache = Cache::builder()
        .max_capacity(1000)
        .time_to_live(Duration::from_secs(settings.summary_cache_ttl_secs))
        .build();

    Ok(AppState {
        db,
        cache,
        currency: settings.currency()?,
        summary_policy: settings.summary_policy(),
    })
}
