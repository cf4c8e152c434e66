//! matchday-server — daily football odds board
//!
//! What it does:
//!   1. GET  /api/matches-odds?date=YYYY-MM-DD — fixtures and best h2h
//!      prices for one local calendar day, built once and cached as JSON
//!   2. POST /api/submit-bet — validates a bet slip and forwards it to a
//!      webhook channel
//!   3. GET  /api/health — liveness
//!
//! Run:
//!   THEODDS_API_KEY=... cargo run --bin matchday-server

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use bet_notifier::{format_message, BetSlip, Notifier, OddsMode};
use chrono::NaiveDate;
use chrono_tz::Tz;
use daily_stock::{DailyStockService, DayCache, StockBuilder};
use dotenv::dotenv;
use odds_provider::TheOddsApi;
use serde::Deserialize;
use serde_json::json;
use std::fs::File;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
use config::{AppConfig, CorsMode};

struct AppState {
    service:   DailyStockService<TheOddsApi>,
    notifier:  Notifier,
    odds_mode: OddsMode,
    tz:        Tz,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = AppConfig::from_env()?;
    info!("=== matchday server ===");
    info!("Leagues: {}", cfg.leagues.len());
    info!("Display timezone: {}", cfg.timezone);
    info!("Cache dir: {}", cfg.cache_dir.display());
    info!("Odds combination: {:?}", cfg.odds_mode);
    if cfg.webhook_url.is_none() {
        warn!("DISCORD_WEBHOOK_URL is not set, bets will not be forwarded");
    }

    // One server per cache dir, two writers would race on the day files.
    std::fs::create_dir_all(&cfg.cache_dir)
        .with_context(|| format!("create cache dir {}", cfg.cache_dir.display()))?;
    let lock_path = cfg.cache_dir.join(".matchday.lock");
    let lock_file = File::create(&lock_path)
        .with_context(|| format!("create lock file {}", lock_path.display()))?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _guard = match lock.try_write() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("another matchday-server already owns {}. Exiting.", cfg.cache_dir.display());
            return Ok(());
        }
    };

    let provider = TheOddsApi::new(cfg.odds_api_key.clone());
    let builder = StockBuilder::new(provider, cfg.leagues.clone(), cfg.timezone);
    let service = DailyStockService::new(builder, DayCache::new(&cfg.cache_dir));

    let state = Arc::new(AppState {
        service,
        notifier: Notifier::new(cfg.webhook_url.clone()),
        odds_mode: cfg.odds_mode,
        tz: cfg.timezone,
    });

    let cors = match &cfg.cors {
        CorsMode::Permissive => {
            info!("CORS: permissive cross-origin mode");
            CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
        }
        CorsMode::Allowlist(origins) => {
            info!("CORS: allowlist of {} origin(s)", origins.len());
            let parsed: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()).collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/matches-odds", get(matches_odds))
        .route("/api/submit-bet", post(submit_bet))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await.context("bind server port")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

#[derive(Deserialize)]
struct MatchesQuery {
    date: Option<String>,
}

async fn matches_odds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchesQuery>,
) -> Response {
    let date = match &query.date {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid date, expected YYYY-MM-DD" })),
                )
                    .into_response();
            }
        },
        None => odds_engine::today_in(state.tz),
    };

    match state.service.get_or_build(date).await {
        Ok(stock) => Json(stock).into_response(),
        Err(e) => {
            error!("matches-odds failed for {date}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "could not retrieve matches/odds" })),
            )
                .into_response()
        }
    }
}

async fn submit_bet(State(state): State<Arc<AppState>>, Json(slip): Json<BetSlip>) -> Response {
    if let Err(e) = slip.validate() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
    }

    let total = slip.total_odds(state.odds_mode);
    let win = slip.potential_win(state.odds_mode);
    let content = format_message(&slip, state.odds_mode);

    if let Err(e) = state.notifier.send(&content).await {
        error!("webhook delivery failed: {e}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "could not forward bet" })),
        )
            .into_response();
    }

    info!(bettor = %slip.bettor_name, selections = slip.selections.len(), "bet accepted");
    Json(json!({
        "ok": true,
        "totalOdd": format!("{total:.2}"),
        "potentialWin": format!("{win:.2}"),
    }))
    .into_response()
}
