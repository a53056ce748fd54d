//! Recommendation synthesis
//!
//! Turns a classified forecast into an operational action and a message.
//! The policy is a decision table over three facts about the earliest
//! elevated day; see [`decide`].

use crate::models::{Action, ForecastPoint, Recommendation, RiskLevel};
use chrono::{DateTime, NaiveTime, Utc};

/// Lead time (in whole days) at or below which a critical day needs action now
pub const IMMEDIATE_WINDOW_DAYS: i64 = 1;

/// Action for the earliest high-or-critical day
///
/// | has high risk | critical | within a day | action           |
/// |---------------|----------|--------------|------------------|
/// | no            | -        | -            | monitor          |
/// | yes           | yes      | yes          | issue_now        |
/// | yes           | yes      | no           | prepare          |
/// | yes           | no       | -            | monitor_closely  |
pub fn decide(has_high_risk: bool, is_critical: bool, within_a_day: bool) -> Action {
    match (has_high_risk, is_critical, within_a_day) {
        (false, _, _) => Action::Monitor,
        (true, true, true) => Action::IssueNow,
        (true, true, false) => Action::Prepare,
        (true, false, _) => Action::MonitorClosely,
    }
}

/// Whole days between `now` and the start of `point`'s date
pub fn days_until(point: &ForecastPoint, now: DateTime<Utc>) -> i64 {
    (point.date.and_time(NaiveTime::MIN) - now.naive_utc()).num_days()
}

/// Build the recommendation for a forecast as seen at `now`
pub fn recommend(forecast: &[ForecastPoint], now: DateTime<Utc>) -> Recommendation {
    let high_risk_days: Vec<ForecastPoint> = forecast
        .iter()
        .filter(|p| p.risk_level.is_elevated())
        .cloned()
        .collect();

    let Some(first) = high_risk_days.first() else {
        return Recommendation {
            action: decide(false, false, false),
            message: format!(
                "Low suspension risk for the next {} days. Continue monitoring weather conditions.",
                forecast.len()
            ),
            high_risk_days,
        };
    };

    let is_critical = first.risk_level == RiskLevel::Critical;
    let within_a_day = days_until(first, now) <= IMMEDIATE_WINDOW_DAYS;
    let action = decide(true, is_critical, within_a_day);

    let percent = (first.probability * 100.0).round() as i64;
    let day = first.date.format("%A, %B %d");
    let message = match action {
        Action::IssueNow => format!(
            "CRITICAL: Issue suspension immediately. {}% probability tomorrow.",
            percent
        ),
        Action::Prepare => format!(
            "HIGH ALERT: Prepare suspension for {}. {}% probability.",
            day, percent
        ),
        _ => format!(
            "WATCH: Monitor conditions closely for {}. {}% probability.",
            day, percent
        ),
    };

    Recommendation {
        action,
        message,
        high_risk_days,
    }
}
