use anyhow::{Context, Result};
use compute::summary::{summarize, summarize_year};
use sea_orm::Database;
use tracing::{debug, info};

use crate::config::Settings;

/// Prints the monthly summary, or the yearly one when `month` is absent, as pretty JSON on stdout.
pub async fn print_summary(settings: &Settings, year: i32, month: Option<u32>) -> Result<()> {
    info!("Computing summary for {} {:?}", year, month);
    let db = Database::connect(&settings.database_url)
        .await
        .with_context(|| format!("Failed to connect to database '{}'", settings.database_url))?;
    let currency = settings.currency()?;
    let policy = settings.summary_policy();

    let json = match month {
        Some(month) => {
            let summary = summarize(&db, year, month, &policy).await?;
            serde_json::to_string_pretty(&summary.to_dto(&currency))?
        }
        None => {
            let summary = summarize_year(&db, year, &policy).await?;
            serde_json::to_string_pretty(&summary.to_dto(&currency))?
        }
    };
    debug!("Summary computed");

    println!("{}", json);
    Ok(())
}
