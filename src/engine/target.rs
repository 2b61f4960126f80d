use chrono::NaiveDate;

use crate::engine::stats::rate;
use crate::models::{DailySummary, Target, TargetProgress, TargetStatus};

/// A metric is on track at 90% of the expected progress.
pub const ON_TRACK_RATIO: f64 = 0.9;
/// Below 70% of the expected progress a metric is behind.
pub const BEHIND_RATIO: f64 = 0.7;

/// Sums of the daily summaries inside a target window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowTotals {
    pub trades: u32,
    pub wins: u32,
    pub sop_followed: u32,
    pub net_profit: f64,
}

impl WindowTotals {
    /// Summaries outside `[start, end]` are skipped.
    pub fn from_summaries(summaries: &[DailySummary], start: NaiveDate, end: NaiveDate) -> Self {
        let mut totals = WindowTotals::default();
        for day in summaries
            .iter()
            .filter(|s| s.date >= start && s.date <= end)
        {
            totals.trades += day.total_trades;
            totals.wins += day.wins;
            totals.sop_followed += day.sop_followed;
            totals.net_profit += day.net_pnl;
        }
        totals
    }

    pub fn win_rate(&self) -> f64 {
        rate(self.wins, self.trades)
    }

    pub fn sop_rate(&self) -> f64 {
        rate(self.sop_followed, self.trades)
    }
}

/// min(current / threshold × 100, 100), floored at zero.
pub fn metric_progress(current: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 100.0;
    }
    (current / threshold * 100.0).clamp(0.0, 100.0)
}

/// (days elapsed, days total) of an inclusive window, elapsed clipped to the window.
pub fn window_days(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> (i64, i64) {
    let total = (end - start).num_days() + 1;
    let elapsed = ((today - start).num_days() + 1).clamp(0, total);
    (elapsed, total)
}

pub fn expected_progress(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> f64 {
    let (elapsed, total) = window_days(start, end, today);
    if total <= 0 {
        return 100.0;
    }
    elapsed as f64 / total as f64 * 100.0
}

pub fn is_on_track(progress: f64, expected: f64) -> bool {
    progress >= expected * ON_TRACK_RATIO
}

pub fn is_behind(progress: f64, expected: f64) -> bool {
    progress < expected * BEHIND_RATIO
}

struct Metric {
    current: f64,
    threshold: f64,
    progress: f64,
}

/// Status policy, in order: window over → completed/failed on raw thresholds;
/// every metric on track → on-track; any metric behind → behind; else at-risk.
fn classify(metrics: &[Metric], expected: f64, window_over: bool) -> TargetStatus {
    if window_over {
        return if metrics.iter().all(|m| m.current >= m.threshold) {
            TargetStatus::Completed
        } else {
            TargetStatus::Failed
        };
    }
    if metrics.iter().all(|m| is_on_track(m.progress, expected)) {
        TargetStatus::OnTrack
    } else if metrics.iter().any(|m| is_behind(m.progress, expected)) {
        TargetStatus::Behind
    } else {
        TargetStatus::AtRisk
    }
}

pub fn compute_progress(target: &Target, totals: &WindowTotals, today: NaiveDate) -> TargetProgress {
    let current_win_rate = totals.win_rate();
    let current_sop_rate = totals.sop_rate();
    let current_profit = totals.net_profit;

    let win_rate_progress = metric_progress(current_win_rate, target.win_rate_threshold);
    let sop_rate_progress = metric_progress(current_sop_rate, target.sop_rate_threshold);
    let profit_progress = target
        .profit_threshold
        .map(|threshold| metric_progress(current_profit, threshold));

    let (days_elapsed, days_total) = window_days(target.start_date, target.end_date, today);
    let expected = expected_progress(target.start_date, target.end_date, today);

    let mut metrics = vec![
        Metric {
            current: current_win_rate,
            threshold: target.win_rate_threshold,
            progress: win_rate_progress,
        },
        Metric {
            current: current_sop_rate,
            threshold: target.sop_rate_threshold,
            progress: sop_rate_progress,
        },
    ];
    if let (Some(threshold), Some(progress)) = (target.profit_threshold, profit_progress) {
        metrics.push(Metric {
            current: current_profit,
            threshold,
            progress,
        });
    }

    let status = classify(&metrics, expected, today > target.end_date);

    TargetProgress {
        target_id: target.id.clone(),
        trades: totals.trades,
        wins: totals.wins,
        sop_followed: totals.sop_followed,
        current_win_rate,
        current_sop_rate,
        current_profit,
        win_rate_progress,
        sop_rate_progress,
        profit_progress,
        expected_progress: expected,
        days_elapsed,
        days_total,
        win_rate_on_track: is_on_track(win_rate_progress, expected),
        sop_rate_on_track: is_on_track(sop_rate_progress, expected),
        profit_on_track: profit_progress.map(|p| is_on_track(p, expected)),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TargetState, TargetType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Ten-day window: on day five half the time has elapsed
    fn target(profit_threshold: Option<f64>) -> Target {
        Target {
            id: "TARGET-1".to_string(),
            user_id: "u1".to_string(),
            target_type: TargetType::Monthly,
            start_date: date(2025, 3, 1),
            end_date: date(2025, 3, 10),
            win_rate_threshold: 50.0,
            sop_rate_threshold: 80.0,
            profit_threshold,
            is_active: true,
            state: TargetState::Active,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn midway() -> NaiveDate {
        date(2025, 3, 5)
    }

    fn totals(trades: u32, wins: u32, sop: u32, profit: f64) -> WindowTotals {
        WindowTotals {
            trades,
            wins,
            sop_followed: sop,
            net_profit: profit,
        }
    }

    #[test]
    fn test_expected_progress_is_clipped_to_window() {
        let t = target(None);
        assert!((expected_progress(t.start_date, t.end_date, midway()) - 50.0).abs() < 1e-9);
        assert_eq!(expected_progress(t.start_date, t.end_date, date(2025, 2, 1)), 0.0);
        assert_eq!(expected_progress(t.start_date, t.end_date, date(2025, 4, 1)), 100.0);
        assert_eq!(window_days(t.start_date, t.end_date, midway()), (5, 10));
    }

    #[test]
    fn test_metric_progress_caps_and_floors() {
        assert_eq!(metric_progress(120.0, 50.0), 100.0);
        assert_eq!(metric_progress(-30.0, 500.0), 0.0);
        assert_eq!(metric_progress(0.0, 0.0), 100.0);
        assert!((metric_progress(25.0, 50.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_status_boundaries_around_expected_progress() {
        let t = target(None);

        // 23% win rate vs 50% threshold = 46% progress, 92% of expected
        let p = compute_progress(&t, &totals(100, 23, 100, 10.0), midway());
        assert!((p.win_rate_progress - 46.0).abs() < 1e-6);
        assert!(p.win_rate_on_track);
        assert_eq!(p.status, TargetStatus::OnTrack);

        // 44% progress, 88% of expected: not on track, not behind
        let p = compute_progress(&t, &totals(100, 22, 100, 10.0), midway());
        assert!(!p.win_rate_on_track);
        assert_eq!(p.status, TargetStatus::AtRisk);

        // 34% progress, under 70% of expected
        let p = compute_progress(&t, &totals(100, 17, 100, 10.0), midway());
        assert_eq!(p.status, TargetStatus::Behind);

        // Exactly 35% is the behind boundary and stays at-risk
        let p = compute_progress(&t, &totals(200, 35, 200, 10.0), midway());
        assert!((p.win_rate_progress - 35.0).abs() < 1e-6);
        assert_eq!(p.status, TargetStatus::AtRisk);
    }

    #[test]
    fn test_profit_metric_only_counts_when_set() {
        let p = compute_progress(&target(None), &totals(10, 10, 10, -500.0), midway());
        assert_eq!(p.profit_progress, None);
        assert_eq!(p.profit_on_track, None);
        assert_eq!(p.status, TargetStatus::OnTrack);

        let p = compute_progress(&target(Some(1000.0)), &totals(10, 10, 10, -500.0), midway());
        assert_eq!(p.profit_progress, Some(0.0));
        assert_eq!(p.profit_on_track, Some(false));
        assert_eq!(p.status, TargetStatus::Behind);
    }

    #[test]
    fn test_finished_window_completes_or_fails_on_raw_thresholds() {
        let after = date(2025, 3, 11);
        let t = target(Some(100.0));

        let p = compute_progress(&t, &totals(10, 5, 8, 100.0), after);
        assert_eq!(p.status, TargetStatus::Completed);

        let p = compute_progress(&t, &totals(10, 5, 8, 99.0), after);
        assert_eq!(p.status, TargetStatus::Failed);

        // The last day itself is still in progress
        let p = compute_progress(&t, &totals(10, 5, 8, 100.0), date(2025, 3, 10));
        assert_eq!(p.status, TargetStatus::OnTrack);
        assert_eq!(p.expected_progress, 100.0);
    }

    #[test]
    fn test_window_totals_skip_days_outside_window() {
        let mut inside = DailySummary::empty("u1", date(2025, 3, 2));
        inside.total_trades = 2;
        inside.wins = 1;
        inside.sop_followed = 2;
        inside.net_pnl = 40.0;
        let mut outside = inside.clone();
        outside.date = date(2025, 3, 11);

        let totals = WindowTotals::from_summaries(&[inside, outside], date(2025, 3, 1), date(2025, 3, 10));
        assert_eq!(totals.trades, 2);
        assert_eq!(totals.wins, 1);
        assert!((totals.win_rate() - 50.0).abs() < 1e-9);
        assert!((totals.sop_rate() - 100.0).abs() < 1e-9);
        assert!((totals.net_profit - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_not_started_is_on_track() {
        let p = compute_progress(&target(None), &WindowTotals::default(), date(2025, 2, 20));
        assert_eq!(p.expected_progress, 0.0);
        assert_eq!(p.status, TargetStatus::OnTrack);
    }
}
