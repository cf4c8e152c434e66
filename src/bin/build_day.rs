//! build-day — one-shot daily stock build, printed to stdout
//!
//! Builds the match board for one date without touching the day cache.
//! Handy for checking provider credentials and league coverage.
//!
//! Run:
//!   THEODDS_API_KEY=... cargo run --bin build-day -- 2025-06-14

use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use daily_stock::StockBuilder;
use dotenv::dotenv;
use odds_provider::{League, TheOddsApi};
use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let api_key = env::var("THEODDS_API_KEY").context("THEODDS_API_KEY not set")?;
    let tz: Tz = env::var("DISPLAY_TIMEZONE")
        .unwrap_or_else(|_| "Europe/Paris".to_string())
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid DISPLAY_TIMEZONE: {e}"))?;

    let date = match env::args().nth(1) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .with_context(|| format!("invalid date {raw}, expected YYYY-MM-DD"))?,
        None => odds_engine::today_in(tz),
    };

    info!(%date, "building daily stock");
    let builder = StockBuilder::new(TheOddsApi::new(api_key), League::defaults(), tz);
    let stock = builder.build(date).await?;

    info!(matches = stock.matches.len(), "done");
    println!("{}", serde_json::to_string_pretty(&stock)?);
    Ok(())
}
