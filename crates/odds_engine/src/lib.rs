/// matchday — Odds Engine
///
/// Pure odds logic, no I/O:
///   - price normalization (comma decimals, the "85 means 8.5" correction)
///   - outcome label → home/draw/away matching
///   - best-price selection across bookmaker quotes
///   - fixed-timezone calendar helpers for the day window
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::Value;

// ── Price normalization ──────────────────────────────────────────────────────

/// Normalize a raw provider price into a decimal odd, rounded to 2 dp.
///
/// Accepts numbers and strings, with either "." or "," as the decimal
/// separator. Some books send "85" when they mean 8.5; integers in the
/// 20..=99 band divisible by 5 are divided by 10. Best-effort heuristic:
/// a genuine integer odd in that band would be mangled, but such prices
/// do not occur in h2h football markets.
///
/// Returns None for anything non-numeric or non-finite.
pub fn sanitize_price(raw: &Value) -> Option<f64> {
    let mut n = match raw {
        Value::Number(num) => num.as_f64()?,
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && (20.0..=99.0).contains(&n) && (n as i64) % 5 == 0 {
        n /= 10.0;
    }
    Some(round2(n))
}

pub fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

// ── Outcome matching ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeSlot {
    Home,
    Draw,
    Away,
}

/// Map a bookmaker-reported outcome label to a slot for one fixture.
///
/// Rule order matters: exact team match is tried before the substring
/// fallback so that abbreviated labels ("Arsenal" for "Arsenal FC") still
/// land on the right team without shadowing exact names. Labels that match
/// nothing are dropped by the caller.
pub fn match_outcome(home_team: &str, away_team: &str, label: &str) -> Option<OutcomeSlot> {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        // an empty label is a substring of everything
        return None;
    }
    let home = home_team.trim().to_lowercase();
    let away = away_team.trim().to_lowercase();

    if label.contains("draw") {
        return Some(OutcomeSlot::Draw);
    }
    if label == home {
        return Some(OutcomeSlot::Home);
    }
    if label == away {
        return Some(OutcomeSlot::Away);
    }
    if home.contains(&label) {
        return Some(OutcomeSlot::Home);
    }
    if away.contains(&label) {
        return Some(OutcomeSlot::Away);
    }
    None
}

// ── Best-price selection ─────────────────────────────────────────────────────

/// One raw h2h outcome line from one bookmaker.
#[derive(Debug, Clone)]
pub struct BookmakerQuote {
    pub bookmaker: String,
    pub label:     String,
    pub price:     Value,
}

/// The selected price for one slot and who offered it.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotPrice {
    pub price:     f64,
    pub bookmaker: String,
}

#[derive(Debug, Clone, Default)]
pub struct BestPrice {
    pub home: Option<SlotPrice>,
    pub draw: Option<SlotPrice>,
    pub away: Option<SlotPrice>,
}

impl BestPrice {
    fn slot_mut(&mut self, slot: OutcomeSlot) -> &mut Option<SlotPrice> {
        match slot {
            OutcomeSlot::Home => &mut self.home,
            OutcomeSlot::Draw => &mut self.draw,
            OutcomeSlot::Away => &mut self.away,
        }
    }

    /// Single attribution string for the record: home slot's book wins,
    /// then draw, then away.
    pub fn bookmaker(&self) -> Option<&str> {
        self.home
            .as_ref()
            .or(self.draw.as_ref())
            .or(self.away.as_ref())
            .map(|s| s.bookmaker.as_str())
    }
}

/// Fallback prices for slots no valid quote ever reached.
#[derive(Debug, Clone, Copy)]
pub struct DefaultPrices {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Default for DefaultPrices {
    fn default() -> Self {
        Self { home: 2.2, draw: 3.3, away: 3.2 }
    }
}

/// Fold all quotes for one fixture into the best price per slot.
///
/// Unmatched labels and unparseable prices are skipped. A strictly greater
/// normalized price replaces the current slot holder; ties keep the
/// first-seen bookmaker. Pure: quote order only affects tie attribution.
pub fn select_best(home_team: &str, away_team: &str, quotes: &[BookmakerQuote]) -> BestPrice {
    let mut best = BestPrice::default();
    for quote in quotes {
        let Some(slot) = match_outcome(home_team, away_team, &quote.label) else {
            continue;
        };
        let Some(price) = sanitize_price(&quote.price) else {
            continue;
        };
        let entry = best.slot_mut(slot);
        if entry.as_ref().map_or(true, |current| price > current.price) {
            *entry = Some(SlotPrice { price, bookmaker: quote.bookmaker.clone() });
        }
    }
    best
}

// ── Day window ───────────────────────────────────────────────────────────────

/// Calendar date of an instant in the display timezone.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// True iff the instant falls on `date` in the display timezone.
pub fn same_local_day(instant: DateTime<Utc>, date: NaiveDate, tz: Tz) -> bool {
    local_date(instant, tz) == date
}

pub fn today_in(tz: Tz) -> NaiveDate {
    local_date(Utc::now(), tz)
}

/// "HH:MM" kickoff display string in the display timezone. Fixed-width,
/// so lexicographic order equals chronological order within one day.
pub fn kickoff_label(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}
