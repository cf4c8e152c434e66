/// matchday — The Odds API client
///
/// Two feeds per league:
///   A) /v4/sports/{league}/events — fixtures (id, teams, kickoff), cheap
///   B) /v4/sports/{league}/odds   — h2h prices across EU bookmakers
///
/// The odds endpoint has no date filter, so callers fetch the whole feed
/// and merge with the events feed by event id.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.the-odds-api.com/v4/sports";
/// The only market this system reads: home win / draw / away win.
pub const H2H_MARKET: &str = "h2h";

// ── Wire structs ─────────────────────────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
pub struct ProviderEvent {
    pub id:            String,
    pub home_team:     String,
    pub away_team:     String,
    pub commence_time: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProviderOdds {
    pub id:         String,
    #[serde(default)]
    pub bookmakers: Vec<ProviderBookmaker>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProviderBookmaker {
    pub title:   String,
    #[serde(default)]
    pub markets: Vec<ProviderMarket>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProviderMarket {
    pub key:      String,
    #[serde(default)]
    pub outcomes: Vec<ProviderOutcome>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProviderOutcome {
    pub name:  String,
    /// Kept raw: some books send numbers, some send strings like "8,5".
    pub price: Value,
}

// ── League configuration ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct League {
    /// Provider sport key, e.g. "soccer_epl".
    pub key:   String,
    /// Display label on match records, e.g. "Premier League".
    pub label: String,
}

impl League {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self { key: key.into(), label: label.into() }
    }

    /// The competitions the board covers out of the box.
    pub fn defaults() -> Vec<League> {
        vec![
            League::new("soccer_epl", "Premier League"),
            League::new("soccer_spain_la_liga", "La Liga"),
            League::new("soccer_france_ligue_one", "Ligue 1"),
            League::new("soccer_germany_bundesliga", "Bundesliga"),
            League::new("soccer_uefa_champs_league", "Champions League"),
        ]
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("odds provider API key is not configured")]
    MissingApiKey,
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{league} feed returned HTTP {status}: {body}")]
    Status {
        league: String,
        status: u16,
        body:   String,
    },
    #[error("could not decode {league} feed: {source}")]
    Decode {
        league: String,
        #[source]
        source: reqwest::Error,
    },
}

// ── Provider seam ────────────────────────────────────────────────────────────

/// Request/response collaborator the merge pipeline is written against.
/// Tests substitute an in-memory fake.
#[async_trait]
pub trait OddsProvider: Send + Sync {
    async fn events(&self, league: &str) -> Result<Vec<ProviderEvent>, FetchError>;
    async fn odds(&self, league: &str) -> Result<Vec<ProviderOdds>, FetchError>;
}

pub struct TheOddsApi {
    client:   reqwest::Client,
    api_key:  String,
    base_url: String,
}

impl TheOddsApi {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_key:  api_key.into(),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        league: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        if self.api_key.is_empty() {
            return Err(FetchError::MissingApiKey);
        }

        let url = format!("{}/{}/{}", self.base_url, league, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Request { url: url.clone(), source: e })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(league, %status, "odds provider returned an error");
            return Err(FetchError::Status {
                league: league.to_string(),
                status: status.as_u16(),
                body:   body.chars().take(200).collect(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| FetchError::Decode { league: league.to_string(), source: e })
    }
}

#[async_trait]
impl OddsProvider for TheOddsApi {
    async fn events(&self, league: &str) -> Result<Vec<ProviderEvent>, FetchError> {
        let events: Vec<ProviderEvent> =
            self.get_json(league, "events", &[("dateFormat", "iso")]).await?;
        debug!(league, count = events.len(), "fetched events feed");
        Ok(events)
    }

    async fn odds(&self, league: &str) -> Result<Vec<ProviderOdds>, FetchError> {
        let odds: Vec<ProviderOdds> = self
            .get_json(
                league,
                "odds",
                &[
                    ("regions", "eu"),
                    ("markets", H2H_MARKET),
                    ("oddsFormat", "decimal"),
                    ("dateFormat", "iso"),
                ],
            )
            .await?;
        debug!(league, count = odds.len(), "fetched odds feed");
        Ok(odds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_leagues_cover_the_board() {
        let leagues = League::defaults();
        assert_eq!(leagues.len(), 5);
        assert!(leagues.iter().any(|l| l.key == "soccer_epl"));
        assert!(leagues.iter().all(|l| !l.label.is_empty()));
    }

    #[test]
    fn events_feed_deserializes() {
        let raw = r#"[
            {
                "id": "e1",
                "sport_key": "soccer_epl",
                "sport_title": "EPL",
                "commence_time": "2025-06-14T19:00:00Z",
                "home_team": "Chelsea",
                "away_team": "Arsenal"
            }
        ]"#;
        let events: Vec<ProviderEvent> = serde_json::from_str(raw).unwrap();
        assert_eq!(events[0].id, "e1");
        assert_eq!(events[0].home_team, "Chelsea");
    }

    #[test]
    fn odds_feed_keeps_prices_raw() {
        // prices come back as numbers or strings depending on the book
        let raw = r#"[
            {
                "id": "e1",
                "bookmakers": [
                    {
                        "key": "unibet",
                        "title": "Unibet",
                        "markets": [
                            {
                                "key": "h2h",
                                "outcomes": [
                                    { "name": "Chelsea", "price": 1.8 },
                                    { "name": "Draw", "price": "3,4" },
                                    { "name": "Arsenal", "price": 4.1 }
                                ]
                            }
                        ]
                    }
                ]
            }
        ]"#;
        let odds: Vec<ProviderOdds> = serde_json::from_str(raw).unwrap();
        let outcomes = &odds[0].bookmakers[0].markets[0].outcomes;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].price.is_number());
        assert!(outcomes[1].price.is_string());
    }

    #[test]
    fn odds_feed_tolerates_missing_bookmakers() {
        let odds: Vec<ProviderOdds> = serde_json::from_str(r#"[{ "id": "e2" }]"#).unwrap();
        assert!(odds[0].bookmakers.is_empty());
    }

    #[test]
    fn empty_api_key_is_a_configuration_error() {
        let err = FetchError::MissingApiKey;
        assert_eq!(err.to_string(), "odds provider API key is not configured");
    }
}
