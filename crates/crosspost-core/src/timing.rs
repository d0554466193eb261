// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timing-recommendation engine.
//!
//! Pure scoring over candidate slots in the audience's local time. The
//! optimization target is a balanced composite of engagement heuristics and
//! scheduling reliability, not raw engagement maximization.

use chrono::{DateTime, Datelike, Duration, FixedOffset, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Recommendations below this confidence block auto-scheduling and require
/// an explicit operator confirmation.
pub const CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Posts may not be scheduled further out than this.
pub const MAX_HORIZON_DAYS: i64 = 30;

/// How many days ahead the engine scores candidate slots.
const CANDIDATE_DAYS: i64 = 14;

/// Candidate hours in audience-local time, inclusive.
const FIRST_HOUR: u32 = 8;
const LAST_HOUR: u32 = 20;

/// Confidence reported when no historical signal exists and the 09:30
/// fallback is used.
const FALLBACK_CONFIDENCE: f64 = 0.35;

/// Historical performance signal: relative engagement per weekday,
/// Monday-first, each in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySignal {
    pub weekday_scores: [f64; 7],
}

impl HistorySignal {
    pub fn best_weekday(&self) -> Weekday {
        let (idx, _) = self
            .weekday_scores
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, &s)| if s > acc.1 { (i, s) } else { acc });
        weekday_from_monday_index(idx)
    }

    fn score_for(&self, weekday: Weekday) -> f64 {
        self.weekday_scores[weekday.num_days_from_monday() as usize]
    }
}

fn weekday_from_monday_index(idx: usize) -> Weekday {
    use Weekday::*;
    [Mon, Tue, Wed, Thu, Fri, Sat, Sun][idx % 7]
}

/// The engine's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommended_time_utc: DateTime<Utc>,
    /// In [0, 1].
    pub confidence: f64,
    pub reasoning_summary: String,
    pub fallback_used: bool,
}

/// Recommend a publish time.
///
/// `audience_offset_minutes` is the audience timezone as a fixed UTC offset.
/// With no history the recommendation is the next 09:30 audience-local slot
/// at below-threshold confidence, forcing explicit confirmation downstream.
pub fn recommend_post_time(
    now: DateTime<Utc>,
    audience_offset_minutes: i32,
    history: Option<&HistorySignal>,
) -> Recommendation {
    let offset = FixedOffset::east_opt(audience_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset"));

    let Some(history) = history else {
        return fallback_recommendation(now, offset);
    };

    let local_now = now.with_timezone(&offset);
    let mut best: Option<(f64, DateTime<Utc>, Weekday)> = None;
    let best_day = history.best_weekday();

    for day_ahead in 0..CANDIDATE_DAYS {
        for hour in FIRST_HOUR..=LAST_HOUR {
            let date = (local_now + Duration::days(day_ahead)).date_naive();
            let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            let Some(slot_local) = offset.from_local_datetime(&naive).single() else {
                continue;
            };
            let slot_utc = slot_local.with_timezone(&Utc);
            // Future-only; leave a one-hour runway for approval round-trips.
            if slot_utc <= now + Duration::hours(1) {
                continue;
            }

            let weekday = slot_local.weekday();
            let score = slot_score(weekday, hour, day_ahead, history);

            let replace = match &best {
                None => true,
                Some((best_score, best_time, best_weekday)) => {
                    if (score - best_score).abs() < 1e-9 {
                        // Tie-break in order: earliest slot, weekday over
                        // weekend, then the historically best day.
                        tie_rank(slot_utc, weekday, best_day)
                            < tie_rank(*best_time, *best_weekday, best_day)
                    } else {
                        score > *best_score
                    }
                }
            };
            if replace {
                best = Some((score, slot_utc, weekday));
            }
        }
    }

    match best {
        Some((score, time, weekday)) => {
            let confidence = (0.5 + score / 2.0).clamp(0.0, 1.0);
            Recommendation {
                recommended_time_utc: time,
                confidence,
                reasoning_summary: format!(
                    "Scored {:.2} for {} {:02}:00 audience-local; blended day-of-week, \
                     hour-of-day, and historical engagement weights",
                    score,
                    weekday,
                    time.with_timezone(&offset).hour()
                ),
                fallback_used: false,
            }
        }
        None => fallback_recommendation(now, offset),
    }
}

/// Composite of engagement heuristics and scheduling reliability, in [0, 1].
fn slot_score(weekday: Weekday, hour: u32, day_ahead: i64, history: &HistorySignal) -> f64 {
    let dow_weight = if is_weekend(weekday) { 0.6 } else { 1.0 };
    let hour_weight = match hour {
        9..=11 => 1.0,
        12..=14 => 0.8,
        17..=19 => 0.9,
        _ => 0.6,
    };
    // Sooner slots are more reliable: less drift between recommendation
    // and execution conditions.
    let reliability = 1.0 - 0.02 * day_ahead as f64;
    let engagement = 0.5 + 0.5 * history.score_for(weekday);
    (dow_weight * hour_weight * reliability * engagement).clamp(0.0, 1.0)
}

fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// Lexicographic tie rank: lower wins.
fn tie_rank(time: DateTime<Utc>, weekday: Weekday, best_day: Weekday) -> (i64, u8, u8) {
    (
        time.timestamp(),
        u8::from(is_weekend(weekday)),
        u8::from(weekday != best_day),
    )
}

fn fallback_recommendation(now: DateTime<Utc>, offset: FixedOffset) -> Recommendation {
    let local_now = now.with_timezone(&offset);
    let mut date = local_now.date_naive();
    let target = date.and_hms_opt(9, 30, 0).expect("09:30 is valid");
    let mut slot_local = offset
        .from_local_datetime(&target)
        .single()
        .unwrap_or(local_now);
    if slot_local <= local_now {
        date = date.succ_opt().unwrap_or(date);
        if let Some(next) = date
            .and_hms_opt(9, 30, 0)
            .and_then(|naive| offset.from_local_datetime(&naive).single())
        {
            slot_local = next;
        }
    }
    Recommendation {
        recommended_time_utc: slot_local.with_timezone(&Utc),
        confidence: FALLBACK_CONFIDENCE,
        reasoning_summary: "No historical performance signal; defaulting to the next \
            09:30 audience-local slot"
            .to_string(),
        fallback_used: true,
    }
}
