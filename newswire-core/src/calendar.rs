//! Local-calendar helpers for trend bucketing and cap accounting.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

/// The calendar day an instant falls on in `tz`.
#[must_use]
pub fn local_day(at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// `(year, month, day)` of an instant in `tz`.
#[must_use]
pub fn local_ymd(at: DateTime<Utc>, tz: Tz) -> (i32, u32, u32) {
    let d = local_day(at, tz);
    (d.year(), d.month(), d.day())
}

/// Direction of a daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Slope above the dead band.
    Up,
    /// Slope below the negative dead band.
    Down,
    /// Slope inside the dead band, or fewer than two points.
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        })
    }
}

/// Sign of the least-squares slope of `(day, value)` points with a ±0.02
/// dead band. Days are the x axis as offsets from the first day.
#[must_use]
pub fn daily_trend(points: &[(NaiveDate, f64)]) -> Trend {
    if points.len() < 2 {
        return Trend::Stable;
    }
    let x0 = points[0].0;
    let xs: Vec<f64> = points
        .iter()
        .map(|(d, _)| (*d - x0).num_days() as f64)
        .collect();
    let ys: Vec<f64> = points.iter().map(|(_, v)| *v).collect();

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let cov: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let var: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if var == 0.0 {
        return Trend::Stable;
    }
    let slope = cov / var;
    if slope > 0.02 {
        Trend::Up
    } else if slope < -0.02 {
        Trend::Down
    } else {
        Trend::Stable
    }
}
