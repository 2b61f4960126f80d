use chrono::{DateTime, NaiveDate, Timelike, Utc};
use std::ops::Range;

use crate::models::MarketSession;

// UTC hour ranges, half-open
const ASIA_HOURS: Range<u32> = 0..8;
const EUROPE_HOURS: Range<u32> = 7..16;
const US_HOURS: Range<u32> = 13..22;

fn intersection(a: &Range<u32>, b: &Range<u32>) -> Range<u32> {
    a.start.max(b.start)..a.end.min(b.end)
}

/// Maps a UTC hour to its session. Overlap windows win over the sessions they
/// belong to; the night band after US close falls back to Asia.
pub fn classify_hour(hour: u32) -> MarketSession {
    let asia_europe = intersection(&ASIA_HOURS, &EUROPE_HOURS);
    let europe_us = intersection(&EUROPE_HOURS, &US_HOURS);

    if asia_europe.contains(&hour) || europe_us.contains(&hour) {
        MarketSession::Overlap
    } else if ASIA_HOURS.contains(&hour) {
        MarketSession::Asia
    } else if EUROPE_HOURS.contains(&hour) {
        MarketSession::Europe
    } else if US_HOURS.contains(&hour) {
        MarketSession::Us
    } else {
        MarketSession::Asia
    }
}

pub fn classify(at: DateTime<Utc>) -> MarketSession {
    classify_hour(at.hour())
}

pub fn classify_timestamp(timestamp: i64) -> MarketSession {
    classify(DateTime::from_timestamp(timestamp, 0).unwrap_or_default())
}

/// `[start, end)` unix-second bounds of a UTC calendar day
pub fn day_bounds(date: NaiveDate) -> (i64, i64) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
    (start, start + 86_400)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_every_hour_has_exactly_one_session() {
        let expected = [
            (0, MarketSession::Asia),
            (3, MarketSession::Asia),
            (6, MarketSession::Asia),
            (7, MarketSession::Overlap),
            (8, MarketSession::Europe),
            (12, MarketSession::Europe),
            (13, MarketSession::Overlap),
            (15, MarketSession::Overlap),
            (16, MarketSession::Us),
            (21, MarketSession::Us),
            (22, MarketSession::Asia),
            (23, MarketSession::Asia),
        ];
        for (hour, session) in expected {
            assert_eq!(classify_hour(hour), session, "hour {}", hour);
        }

        let mut counts = std::collections::HashMap::new();
        for hour in 0..24 {
            *counts.entry(classify_hour(hour)).or_insert(0) += 1;
        }
        assert_eq!(counts.values().sum::<i32>(), 24);
        assert_eq!(counts[&MarketSession::Overlap], 4);
        assert_eq!(counts[&MarketSession::Asia], 9);
        assert_eq!(counts[&MarketSession::Europe], 5);
        assert_eq!(counts[&MarketSession::Us], 6);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0).unwrap();
        let first = classify(at);
        for _ in 0..10 {
            assert_eq!(classify(at), first);
        }
        assert_eq!(classify_timestamp(at.timestamp()), first);
        assert_eq!(first, MarketSession::Overlap);
    }

    #[test]
    fn test_minutes_do_not_cross_boundaries() {
        let just_before = Utc.with_ymd_and_hms(2025, 6, 2, 15, 59, 59).unwrap();
        let on_the_hour = Utc.with_ymd_and_hms(2025, 6, 2, 16, 0, 0).unwrap();
        assert_eq!(classify(just_before), MarketSession::Overlap);
        assert_eq!(classify(on_the_hour), MarketSession::Us);
    }

    #[test]
    fn test_day_bounds() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start, 1_735_689_600);
        assert_eq!(end - start, 86_400);
    }
}
