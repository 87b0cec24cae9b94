//! Trend, velocity, and trajectory analysis over a snapshot sequence.
//!
//! Ordinary least-squares regression over a time series, classified into
//! a small direction enum rather than surfaced as a raw slope.

use crate::types::Snapshot;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Day,
    Week,
    Month,
    All,
}

impl Window {
    fn seconds(self) -> Option<i64> {
        match self {
            Window::Day => Some(86_400),
            Window::Week => Some(7 * 86_400),
            Window::Month => Some(30 * 86_400),
            Window::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub window: Window,
    pub sample_count: usize,
    pub direction: Direction,
    pub change_percent: f64,
    pub slope: f64,
}

/// Ordinary least-squares slope and intercept over `(x, y)` pairs, plus the
/// coefficient of determination (R²). Returns `None` for fewer than 2
/// distinct x values, where a line is undefined.
fn linear_regression(points: &[(f64, f64)]) -> Option<(f64, f64, f64)> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }

    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    for (x, y) in points {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x) * (x - mean_x);
    }
    if var_x == 0.0 {
        return None;
    }

    let slope = cov / var_x;
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|(x, y)| {
            let predicted = slope * x + intercept;
            (y - predicted).powi(2)
        })
        .sum();
    let r2 = if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot };

    Some((slope, intercept, r2))
}

fn snapshots_in_window(snapshots: &[Snapshot], window: Window) -> Vec<&Snapshot> {
    snapshots_in_span(snapshots, window.seconds())
}

fn snapshots_in_span(snapshots: &[Snapshot], span: Option<i64>) -> Vec<&Snapshot> {
    let mut sorted: Vec<&Snapshot> = snapshots.iter().collect();
    sorted.sort_by_key(|s| s.timestamp);
    match span {
        None => sorted,
        Some(span) => {
            let Some(latest) = sorted.last().map(|s| s.timestamp) else {
                return sorted;
            };
            let cutoff = latest - span;
            sorted.into_iter().filter(|s| s.timestamp >= cutoff).collect()
        }
    }
}

/// Direction and change-percent of `healthScore` across the window.
pub fn trend(snapshots: &[Snapshot], window: Window) -> TrendReport {
    let windowed = snapshots_in_window(snapshots, window);
    let sample_count = windowed.len();

    if sample_count < 2 {
        return TrendReport {
            window,
            sample_count,
            direction: Direction::Stable,
            change_percent: 0.0,
            slope: 0.0,
        };
    }

    let points: Vec<(f64, f64)> = windowed
        .iter()
        .map(|s| (s.timestamp as f64, s.metrics.health_score))
        .collect();
    let (slope, _, _) = linear_regression(&points).unwrap_or((0.0, 0.0, 0.0));

    let first = windowed.first().unwrap().metrics.health_score;
    let last = windowed.last().unwrap().metrics.health_score;
    let change_percent = if first == 0.0 {
        0.0
    } else {
        (last - first) / first * 100.0
    };

    let direction = if slope.abs() < 1e-9 {
        Direction::Stable
    } else if slope > 0.0 {
        Direction::Improving
    } else {
        Direction::Declining
    };

    TrendReport {
        window,
        sample_count,
        direction,
        change_percent,
        slope,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VelocityReport {
    pub complexity_slope: f64,
    pub complexity_r2: f64,
    pub hotspot_slope: f64,
    pub hotspot_r2: f64,
    pub sample_count: usize,
}

/// Regression over recent `avgComplexity` and `hotspotCount` to quantify
/// how fast the codebase is getting more (or less) complex/hot, looking
/// back only `window_days` days from the newest snapshot.
pub fn velocity(snapshots: &[Snapshot], window_days: u32) -> VelocityReport {
    let span = (window_days as i64).checked_mul(86_400);
    let sorted = snapshots_in_span(snapshots, span);

    let complexity_points: Vec<(f64, f64)> = sorted
        .iter()
        .map(|s| (s.timestamp as f64, s.metrics.avg_complexity))
        .collect();
    let hotspot_points: Vec<(f64, f64)> = sorted
        .iter()
        .map(|s| (s.timestamp as f64, s.metrics.hotspot_count as f64))
        .collect();

    let (complexity_slope, _, complexity_r2) =
        linear_regression(&complexity_points).unwrap_or((0.0, 0.0, 0.0));
    let (hotspot_slope, _, hotspot_r2) = linear_regression(&hotspot_points).unwrap_or((0.0, 0.0, 0.0));

    VelocityReport {
        complexity_slope,
        complexity_r2,
        hotspot_slope,
        hotspot_r2,
        sample_count: sorted.len(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrajectoryReport {
    pub insufficient_data: bool,
    pub horizon_days: u32,
    pub projected_health_score: f64,
    pub confidence_low: f64,
    pub confidence_high: f64,
}

/// Project `healthScore` `horizon_days` into the future along the fitted
/// regression line, with a confidence band of +/- one residual standard
/// deviation. Flags `insufficient_data` with fewer than 2 snapshots.
pub fn trajectory(snapshots: &[Snapshot], horizon_days: u32) -> TrajectoryReport {
    let mut sorted: Vec<&Snapshot> = snapshots.iter().collect();
    sorted.sort_by_key(|s| s.timestamp);

    if sorted.len() < 2 {
        return TrajectoryReport {
            insufficient_data: true,
            horizon_days,
            projected_health_score: sorted
                .last()
                .map(|s| s.metrics.health_score)
                .unwrap_or(0.0),
            confidence_low: 0.0,
            confidence_high: 0.0,
        };
    }

    let points: Vec<(f64, f64)> = sorted
        .iter()
        .map(|s| (s.timestamp as f64, s.metrics.health_score))
        .collect();
    let Some((slope, intercept, _)) = linear_regression(&points) else {
        return TrajectoryReport {
            insufficient_data: true,
            horizon_days,
            projected_health_score: sorted.last().unwrap().metrics.health_score,
            confidence_low: 0.0,
            confidence_high: 0.0,
        };
    };

    let horizon_secs = horizon_days as f64 * 86_400.0;
    let last_timestamp = sorted.last().unwrap().timestamp as f64;
    let target_x = last_timestamp + horizon_secs;
    let projected = slope * target_x + intercept;

    let residual_variance = points
        .iter()
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum::<f64>()
        / points.len() as f64;
    let residual_std = residual_variance.sqrt();

    TrajectoryReport {
        insufficient_data: false,
        horizon_days,
        projected_health_score: projected,
        confidence_low: projected - residual_std,
        confidence_high: projected + residual_std,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SnapshotMetrics;

    fn snapshot(timestamp: i64, health_score: f64) -> Snapshot {
        Snapshot {
            timestamp,
            commit_hash: None,
            metrics: SnapshotMetrics {
                health_score,
                avg_complexity: 5.0,
                hotspot_count: 2,
                file_count: 10,
                total_lines: 1000,
            },
        }
    }

    #[test]
    fn rising_health_score_is_improving() {
        let snapshots: Vec<Snapshot> = [60.0, 62.0, 64.0, 66.0, 68.0]
            .iter()
            .enumerate()
            .map(|(i, &h)| snapshot(i as i64 * 86_400, h))
            .collect();
        let report = trend(&snapshots, Window::All);
        assert_eq!(report.direction, Direction::Improving);
        assert!((report.change_percent - 13.333333).abs() < 0.01);
    }

    #[test]
    fn falling_health_score_is_declining() {
        let snapshots: Vec<Snapshot> = [80.0, 75.0, 70.0]
            .iter()
            .enumerate()
            .map(|(i, &h)| snapshot(i as i64 * 86_400, h))
            .collect();
        let report = trend(&snapshots, Window::All);
        assert_eq!(report.direction, Direction::Declining);
    }

    #[test]
    fn single_snapshot_is_insufficient_data_for_trajectory() {
        let snapshots = vec![snapshot(0, 70.0)];
        let report = trajectory(&snapshots, 30);
        assert!(report.insufficient_data);
    }

    #[test]
    fn single_snapshot_trend_defaults_to_stable() {
        let snapshots = vec![snapshot(0, 70.0)];
        let report = trend(&snapshots, Window::All);
        assert_eq!(report.direction, Direction::Stable);
        assert_eq!(report.sample_count, 1);
    }

    #[test]
    fn trajectory_projects_along_fitted_slope() {
        let snapshots: Vec<Snapshot> = [50.0, 55.0, 60.0]
            .iter()
            .enumerate()
            .map(|(i, &h)| snapshot(i as i64 * 86_400, h))
            .collect();
        let report = trajectory(&snapshots, 1);
        assert!(!report.insufficient_data);
        assert!(report.projected_health_score > 60.0);
        assert!(report.confidence_low <= report.projected_health_score);
        assert!(report.confidence_high >= report.projected_health_score);
    }

    #[test]
    fn window_filters_out_stale_snapshots() {
        let mut snapshots = vec![snapshot(0, 10.0)];
        snapshots.push(snapshot(100 * 86_400, 90.0));
        snapshots.push(snapshot(101 * 86_400, 92.0));
        let report = trend(&snapshots, Window::Day);
        assert_eq!(report.sample_count, 2);
    }

    #[test]
    fn velocity_window_days_excludes_old_snapshots() {
        let mut snapshots = vec![snapshot(0, 60.0)];
        snapshots.push(snapshot(100 * 86_400, 60.0));
        snapshots.push(snapshot(101 * 86_400, 65.0));

        let narrow = velocity(&snapshots, 1);
        assert_eq!(narrow.sample_count, 2);

        let wide = velocity(&snapshots, 1_000);
        assert_eq!(wide.sample_count, 3);
    }
}
