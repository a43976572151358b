//! Synthetic historical series for extracted parameters.
//!
//! There is no stored history yet, so each series is fabricated around the
//! current reading: six monthly points ending at the real value, with the
//! earlier points perturbed by bounded noise. Randomness is injected so the
//! output is reproducible under a seeded generator.

pub mod insights;

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use rand::Rng;

use crate::models::{HealthParameter, TrendDirection, TrendPoint, TrendSeries};
use crate::pipeline::status;

/// Number of monthly points in every series, current reading included.
pub const HISTORY_POINTS: u32 = 6;

/// Maximum relative noise applied to historical points.
const NOISE_RATIO: f64 = 0.15;

/// Historical points never drop below this share of the current value.
const FLOOR_RATIO: f64 = 0.1;

/// Relative change under which a series counts as stable.
const STABLE_THRESHOLD: f64 = 0.05;

/// Build a trend map for every parameter of one report, keyed by name.
pub fn generate_trend_data<R: Rng>(
    parameters: &[HealthParameter],
    as_of: NaiveDate,
    rng: &mut R,
) -> BTreeMap<String, TrendSeries> {
    let trends: BTreeMap<_, _> = parameters
        .iter()
        .map(|p| (p.name.clone(), synthesize(p, as_of, &mut *rng)))
        .collect();
    tracing::debug!(parameters = parameters.len(), series = trends.len(), "trend data generated");
    trends
}

/// Fabricate a six-month series ending at the parameter's current value.
pub fn synthesize<R: Rng>(
    parameter: &HealthParameter,
    as_of: NaiveDate,
    rng: &mut R,
) -> TrendSeries {
    let current = parameter.value;
    let range = Some(parameter.normal_range.as_str());

    let points: Vec<TrendPoint> = month_starts(as_of)
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let value = if i as u32 == HISTORY_POINTS - 1 {
                current
            } else {
                perturb(current, &mut *rng)
            };
            TrendPoint {
                date,
                value,
                status: status::classify(value, range),
            }
        })
        .collect();

    let direction = trend_direction(&points);
    let current_status = points
        .last()
        .map(|p| p.status)
        .unwrap_or(parameter.status);
    let insights = insights::generate(parameter, current, current_status, direction);

    TrendSeries {
        parameter: parameter.name.clone(),
        unit: parameter.unit.clone(),
        normal_range: parameter.normal_range.clone(),
        points,
        trend_direction: direction,
        insights,
    }
}

/// Stable under 5% relative change between first and last point, otherwise by sign.
pub fn trend_direction(points: &[TrendPoint]) -> TrendDirection {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return TrendDirection::Stable;
    };
    if points.len() < 2 {
        return TrendDirection::Stable;
    }

    let delta = last.value - first.value;
    let relative = if first.value != 0.0 {
        (delta / first.value).abs()
    } else if delta == 0.0 {
        0.0
    } else {
        f64::INFINITY
    };

    if relative < STABLE_THRESHOLD {
        TrendDirection::Stable
    } else if delta > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    }
}

/// First day of the month for `as_of` and each of the preceding five months, oldest first.
fn month_starts(as_of: NaiveDate) -> Vec<NaiveDate> {
    let anchor = as_of.with_day(1).unwrap_or(as_of);
    (0..HISTORY_POINTS)
        .rev()
        .map(|back| anchor.checked_sub_months(Months::new(back)).unwrap_or(anchor))
        .collect()
}

fn perturb<R: Rng>(current: f64, rng: &mut R) -> f64 {
    let factor: f64 = rng.gen_range(-1.0..=1.0);
    let value = (current + current * NOISE_RATIO * factor).max(current * FLOOR_RATIO);
    (value * 100.0).round() / 100.0
}
