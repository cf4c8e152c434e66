/// matchday — Daily Stock
///
/// The day's match board. Per league, the events feed and the h2h odds
/// feed are fetched together and merged by event id — fixtures stay on the
/// board while in progress even after their odds entry disappears. A built
/// day is cached as one JSON file per calendar date and served verbatim
/// from then on; a failed league fails the whole day so a partial board is
/// never cached.
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use futures_util::future::try_join_all;
use odds_engine::{kickoff_label, same_local_day, select_best, BookmakerQuote, DefaultPrices};
use odds_provider::{FetchError, League, OddsProvider, ProviderEvent, ProviderOdds, H2H_MARKET};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Provenance sentinel for fixtures with no odds entry (in progress, or
/// not yet quoted).
pub const SOURCE_PENDING: &str = "Odds pending";
/// Fallback provenance when an odds entry yielded no attributable slot.
pub const SOURCE_PROVIDER: &str = "The Odds API";

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id:          String,
    pub competition: String,
    /// "HH:MM" in the display timezone.
    pub kick_off:    String,
    pub home:        String,
    pub away:        String,
    pub odds:        MatchOdds,
    pub source:      String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStock {
    pub date:         NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub matches:      Vec<MatchRecord>,
}

#[derive(Debug, Error)]
pub enum StockError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("day cache I/O failed: {0}")]
    Cache(#[from] std::io::Error),
    #[error("day cache encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

// ── Builder ──────────────────────────────────────────────────────────────────

pub struct StockBuilder<P> {
    provider: P,
    leagues:  Vec<League>,
    tz:       Tz,
    defaults: DefaultPrices,
}

impl<P: OddsProvider> StockBuilder<P> {
    pub fn new(provider: P, leagues: Vec<League>, tz: Tz) -> Self {
        Self { provider, leagues, tz, defaults: DefaultPrices::default() }
    }

    /// One league's records for one local calendar day.
    ///
    /// Both feeds must succeed; either failure fails the league. Per-quote
    /// problems (unmatched labels, unparseable prices) are absorbed by the
    /// selector and never fail a fixture.
    pub async fn league_day(
        &self,
        league: &League,
        date: NaiveDate,
    ) -> Result<Vec<MatchRecord>, StockError> {
        let (events, odds) = tokio::try_join!(
            self.provider.events(&league.key),
            self.provider.odds(&league.key),
        )?;

        let odds_by_id: HashMap<&str, &ProviderOdds> =
            odds.iter().map(|entry| (entry.id.as_str(), entry)).collect();

        let records: Vec<MatchRecord> = events
            .iter()
            .filter(|ev| same_local_day(ev.commence_time, date, self.tz))
            .map(|ev| self.merge_event(league, ev, odds_by_id.get(ev.id.as_str()).copied()))
            .collect();

        debug!(league = %league.key, %date, matches = records.len(), "league merged");
        Ok(records)
    }

    fn merge_event(
        &self,
        league: &League,
        ev: &ProviderEvent,
        odds_entry: Option<&ProviderOdds>,
    ) -> MatchRecord {
        let (odds, source) = match odds_entry {
            None => (
                MatchOdds {
                    home: self.defaults.home,
                    draw: self.defaults.draw,
                    away: self.defaults.away,
                },
                SOURCE_PENDING.to_string(),
            ),
            Some(entry) => {
                let quotes = h2h_quotes(entry);
                let best = select_best(&ev.home_team, &ev.away_team, &quotes);
                let source = best.bookmaker().unwrap_or(SOURCE_PROVIDER).to_string();
                let odds = MatchOdds {
                    home: best.home.as_ref().map_or(self.defaults.home, |s| s.price),
                    draw: best.draw.as_ref().map_or(self.defaults.draw, |s| s.price),
                    away: best.away.as_ref().map_or(self.defaults.away, |s| s.price),
                };
                (odds, source)
            }
        };

        MatchRecord {
            id: ev.id.clone(),
            competition: league.label.clone(),
            kick_off: kickoff_label(ev.commence_time, self.tz),
            home: ev.home_team.clone(),
            away: ev.away_team.clone(),
            odds,
            source,
        }
    }

    /// Fan out over every configured league concurrently. One failing
    /// league fails the whole day — a partial board must never be cached.
    pub async fn build(&self, date: NaiveDate) -> Result<DailyStock, StockError> {
        let chunks =
            try_join_all(self.leagues.iter().map(|league| self.league_day(league, date)))
                .await?;

        let mut matches: Vec<MatchRecord> = chunks.into_iter().flatten().collect();
        // fixed-width HH:MM: lexicographic == chronological within one day
        matches.sort_by(|a, b| a.kick_off.cmp(&b.kick_off));

        info!(%date, matches = matches.len(), "daily stock built");
        Ok(DailyStock { date, generated_at: Utc::now(), matches })
    }
}

/// Flatten every bookmaker's h2h market lines for one event.
fn h2h_quotes(entry: &ProviderOdds) -> Vec<BookmakerQuote> {
    let mut quotes = Vec::new();
    for bookmaker in &entry.bookmakers {
        for market in bookmaker.markets.iter().filter(|m| m.key == H2H_MARKET) {
            for outcome in &market.outcomes {
                quotes.push(BookmakerQuote {
                    bookmaker: bookmaker.title.clone(),
                    label:     outcome.name.clone(),
                    price:     outcome.price.clone(),
                });
            }
        }
    }
    quotes
}

// ── Day cache ────────────────────────────────────────────────────────────────

/// One pretty-printed JSON file per calendar date. A written date is
/// authoritative-final for the rest of the process run.
pub struct DayCache {
    dir: PathBuf,
}

impl DayCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    fn path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{date}.json"))
    }

    /// A missing or corrupt file is a miss, not an error: the day gets
    /// rebuilt and rewritten.
    pub fn read(&self, date: NaiveDate) -> Option<DailyStock> {
        let raw = fs::read_to_string(self.path(date)).ok()?;
        match serde_json::from_str(&raw) {
            Ok(stock) => Some(stock),
            Err(e) => {
                warn!(%date, "corrupt day cache file, rebuilding: {e}");
                None
            }
        }
    }

    pub fn write(&self, stock: &DailyStock) -> Result<(), StockError> {
        fs::create_dir_all(&self.dir)?;
        let body = serde_json::to_string_pretty(stock)?;
        fs::write(self.path(stock.date), body)?;
        Ok(())
    }
}

// ── Service ──────────────────────────────────────────────────────────────────

pub struct DailyStockService<P> {
    builder: StockBuilder<P>,
    cache:   DayCache,
}

impl<P: OddsProvider> DailyStockService<P> {
    pub fn new(builder: StockBuilder<P>, cache: DayCache) -> Self {
        Self { builder, cache }
    }

    /// Cached snapshot for the date, or build-then-persist. No lock:
    /// concurrent first requests for an unbuilt date may each build and
    /// write; builds are idempotent and the last writer wins.
    pub async fn get_or_build(&self, date: NaiveDate) -> Result<DailyStock, StockError> {
        if let Some(stock) = self.cache.read(date) {
            debug!(%date, "day cache hit");
            return Ok(stock);
        }

        let built = self.builder.build(date).await?;
        self.cache.write(&built)?;
        Ok(built)
    }
}
