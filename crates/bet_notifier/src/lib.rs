/// matchday — Bet Notifier
///
/// Validates submitted bet slips, combines selection odds into a total,
/// and forwards a readable summary to a Discord-style webhook. Pure glue:
/// no odds logic lives here.
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

// ── Slip types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub home:        String,
    pub away:        String,
    pub competition: String,
    pub kick_off:    String,
    /// What the bettor picked, e.g. "Chelsea" or "Draw".
    pub pick:        String,
    pub odd:         f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetSlip {
    pub bettor_name: String,
    pub stake:       f64,
    #[serde(default)]
    pub selections:  Vec<Selection>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlipError {
    #[error("bettor name is required")]
    MissingName,
    #[error("stake must be a positive amount")]
    InvalidStake,
    #[error("at least one selection is required")]
    NoSelections,
}

/// How selection odds combine into the total.
///
/// `Product` is the correct parlay payout model and the default. `Sum` is
/// the legacy additive behavior, kept selectable for deployments that
/// still expect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OddsMode {
    #[default]
    Product,
    Sum,
}

impl BetSlip {
    pub fn validate(&self) -> Result<(), SlipError> {
        if self.bettor_name.trim().is_empty() {
            return Err(SlipError::MissingName);
        }
        if !self.stake.is_finite() || self.stake <= 0.0 {
            return Err(SlipError::InvalidStake);
        }
        if self.selections.is_empty() {
            return Err(SlipError::NoSelections);
        }
        Ok(())
    }

    pub fn total_odds(&self, mode: OddsMode) -> f64 {
        let total: f64 = match mode {
            OddsMode::Product => self.selections.iter().map(|s| s.odd).product(),
            OddsMode::Sum => self.selections.iter().map(|s| s.odd).sum(),
        };
        round2(total)
    }

    pub fn potential_win(&self, mode: OddsMode) -> f64 {
        round2(self.stake * self.total_odds(mode))
    }
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

// ── Message formatting ───────────────────────────────────────────────────────

/// Multi-line webhook message for one slip.
pub fn format_message(slip: &BetSlip, mode: OddsMode) -> String {
    let total = slip.total_odds(mode);
    let win = slip.potential_win(mode);
    let total_label = match mode {
        OddsMode::Product => "Combined odds",
        OddsMode::Sum => "Sum of odds",
    };

    let mut lines = vec![
        "**New bet** 💸".to_string(),
        format!("👤 Bettor: **{}**", slip.bettor_name),
        format!("💶 Stake: **{:.2}**", slip.stake),
        format!("🧮 {}: **{:.2}**", total_label, total),
        format!("🏆 Potential win: **{:.2}**", win),
        String::new(),
    ];
    for (i, s) in slip.selections.iter().enumerate() {
        lines.push(format!(
            "• {}. {} vs {} - *{}* ({})\n   ➜ **Pick:** {} @ {}",
            i + 1,
            s.home,
            s.away,
            s.competition,
            s.kick_off,
            s.pick,
            s.odd,
        ));
    }
    lines.join("\n")
}

// ── Delivery ─────────────────────────────────────────────────────────────────

pub struct Notifier {
    client:      reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), webhook_url }
    }

    /// POST the message to the webhook. A missing URL is a warn-and-skip,
    /// not an error: bets are still accepted without a channel to post to.
    pub async fn send(&self, content: &str) -> Result<(), reqwest::Error> {
        let Some(url) = &self.webhook_url else {
            warn!("webhook URL is not set, bet will not be forwarded");
            return Ok(());
        };

        self.client
            .post(url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?
            .error_for_status()?;

        info!("bet forwarded to webhook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(pick: &str, odd: f64) -> Selection {
        Selection {
            home:        "Chelsea".to_string(),
            away:        "Arsenal".to_string(),
            competition: "Premier League".to_string(),
            kick_off:    "21:00".to_string(),
            pick:        pick.to_string(),
            odd,
        }
    }

    fn slip(stake: f64, selections: Vec<Selection>) -> BetSlip {
        BetSlip { bettor_name: "Alex".to_string(), stake, selections }
    }

    #[test]
    fn validation_catches_bad_slips() {
        let mut s = slip(10.0, vec![selection("Chelsea", 1.8)]);
        assert_eq!(s.validate(), Ok(()));

        s.bettor_name = "  ".to_string();
        assert_eq!(s.validate(), Err(SlipError::MissingName));

        let s = slip(0.0, vec![selection("Chelsea", 1.8)]);
        assert_eq!(s.validate(), Err(SlipError::InvalidStake));
        let s = slip(f64::NAN, vec![selection("Chelsea", 1.8)]);
        assert_eq!(s.validate(), Err(SlipError::InvalidStake));

        let s = slip(10.0, vec![]);
        assert_eq!(s.validate(), Err(SlipError::NoSelections));
    }

    #[test]
    fn product_is_the_payout_model() {
        let s = slip(10.0, vec![selection("Chelsea", 2.0), selection("Draw", 3.0)]);
        assert_eq!(s.total_odds(OddsMode::Product), 6.0);
        assert_eq!(s.potential_win(OddsMode::Product), 60.0);
    }

    #[test]
    fn sum_mode_matches_the_legacy_variant() {
        let s = slip(10.0, vec![selection("Chelsea", 2.0), selection("Draw", 3.0)]);
        assert_eq!(s.total_odds(OddsMode::Sum), 5.0);
        assert_eq!(s.potential_win(OddsMode::Sum), 50.0);
    }

    #[test]
    fn totals_are_rounded_to_cents() {
        let s = slip(3.0, vec![selection("Chelsea", 1.33), selection("Draw", 3.17)]);
        assert_eq!(s.total_odds(OddsMode::Product), 4.22); // 4.2161
        assert_eq!(s.potential_win(OddsMode::Product), 12.66);
    }

    #[test]
    fn message_lists_every_selection() {
        let s = slip(5.0, vec![selection("Chelsea", 1.8), selection("Draw", 3.4)]);
        let msg = format_message(&s, OddsMode::Product);
        assert!(msg.contains("Bettor: **Alex**"));
        assert!(msg.contains("Combined odds: **6.12**"));
        assert!(msg.contains("• 1. Chelsea vs Arsenal"));
        assert!(msg.contains("• 2."));
        assert!(msg.contains("**Pick:** Draw @ 3.4"));

        let msg = format_message(&s, OddsMode::Sum);
        assert!(msg.contains("Sum of odds: **5.20**"));
    }

    #[test]
    fn slip_deserializes_from_camel_case() {
        let raw = r#"{
            "bettorName": "Alex",
            "stake": 10,
            "selections": [
                {
                    "home": "Chelsea", "away": "Arsenal",
                    "competition": "Premier League", "kickOff": "21:00",
                    "pick": "Chelsea", "odd": 1.8
                }
            ]
        }"#;
        let s: BetSlip = serde_json::from_str(raw).unwrap();
        assert_eq!(s.bettor_name, "Alex");
        assert_eq!(s.selections[0].kick_off, "21:00");
    }
}
