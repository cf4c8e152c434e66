//! Process configuration.
//!
//! Everything is read from the environment exactly once at startup and
//! passed into constructors; business logic never touches ambient process
//! state.

use anyhow::{Context, Result};
use bet_notifier::OddsMode;
use chrono_tz::Tz;
use odds_provider::League;
use std::env;
use std::path::PathBuf;

/// Cross-origin policy, explicit rather than a silent fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsMode {
    /// Only the listed origins may call the API.
    Allowlist(Vec<String>),
    /// Permissive cross-origin mode: any origin is accepted.
    Permissive,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port:         u16,
    pub odds_api_key: String,
    pub webhook_url:  Option<String>,
    pub cache_dir:    PathBuf,
    pub cors:         CorsMode,
    pub timezone:     Tz,
    pub leagues:      Vec<League>,
    pub odds_mode:    OddsMode,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3001);

        let odds_api_key = env::var("THEODDS_API_KEY").context("THEODDS_API_KEY not set")?;

        let webhook_url = env::var("DISCORD_WEBHOOK_URL").ok().filter(|v| !v.is_empty());

        let cache_dir = env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("cache"));

        let timezone: Tz = env::var("DISPLAY_TIMEZONE")
            .unwrap_or_else(|_| "Europe/Paris".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid DISPLAY_TIMEZONE: {e}"))?;

        let odds_mode = match env::var("ODDS_COMBINATION").as_deref() {
            Ok("sum") => OddsMode::Sum,
            _ => OddsMode::Product,
        };

        Ok(Self {
            port,
            odds_api_key,
            webhook_url,
            cache_dir,
            cors: parse_cors(env::var("CORS_ORIGIN").ok()),
            timezone,
            leagues: League::defaults(),
            odds_mode,
        })
    }
}

/// "*" anywhere in the list, or no list at all, selects permissive mode.
fn parse_cors(raw: Option<String>) -> CorsMode {
    let origins: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsMode::Permissive
    } else {
        CorsMode::Allowlist(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_star_means_permissive() {
        assert_eq!(parse_cors(None), CorsMode::Permissive);
        assert_eq!(parse_cors(Some(String::new())), CorsMode::Permissive);
        assert_eq!(parse_cors(Some("*".to_string())), CorsMode::Permissive);
        assert_eq!(
            parse_cors(Some("http://localhost:5173, *".to_string())),
            CorsMode::Permissive
        );
    }

    #[test]
    fn origin_list_becomes_an_allowlist() {
        assert_eq!(
            parse_cors(Some("http://localhost:5173, https://bets.example".to_string())),
            CorsMode::Allowlist(vec![
                "http://localhost:5173".to_string(),
                "https://bets.example".to_string(),
            ])
        );
    }
}
