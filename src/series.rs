//! Forecast series combiner: normalizes and fuses the two prediction traces
//! returned by the fused-prediction endpoint.

use std::collections::HashMap;

use chrono::NaiveDateTime;

/// Asof-join tolerance between a cnn timestamp and its fusion neighbor.
pub const ASOF_TOLERANCE_SECS: i64 = 60;

/// Fixed fusion weighting of the combined trace.
pub const CNN_WEIGHT: f64 = 0.4;
pub const FUSION_WEIGHT: f64 = 0.6;

/// (epoch seconds, value)
pub type Point = (i64, f64);

/// A series as fetched: raw index strings paired with values, in whatever
/// order the payload carried them.
#[derive(Debug, Clone, Default)]
pub struct RawSeries {
    pub entries: Vec<(String, f64)>,
}

impl RawSeries {
    pub fn from_map(map: &HashMap<String, f64>) -> Self {
        Self { entries: map.iter().map(|(k, v)| (k.clone(), *v)).collect() }
    }
}

/// The three output traces. All values lie in [0,1]; `combined` timestamps
/// are strictly increasing.
#[derive(Debug, Clone)]
pub struct FusedSeries {
    pub fusion: Vec<Point>,
    pub cnn: Vec<Point>,
    pub combined: Vec<Point>,
}

/// Parse a raw index value as a timestamp. Accepts epoch seconds, RFC 3339,
/// and the two date-time layouts the service has been seen emitting.
fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Some(secs);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }
    None
}

/// Parse, drop unparseable entries, sort ascending, and collapse duplicate
/// timestamps (first occurrence wins).
fn parse_points(raw: &RawSeries) -> Vec<Point> {
    let mut points: Vec<Point> = raw
        .entries
        .iter()
        .filter_map(|(ts, v)| parse_timestamp(ts).map(|t| (t, *v)))
        .collect();
    points.sort_by_key(|p| p.0);
    points.dedup_by_key(|p| p.0);
    points
}

/// Min-max normalize values into [0,1] in place. A constant or empty series
/// maps every value to 0 instead of dividing by zero; NaN values are treated
/// as degenerate the same way.
pub fn min_max_normalize(points: &mut [Point]) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (_, v) in points.iter() {
        if v.is_nan() {
            continue;
        }
        min = min.min(*v);
        max = max.max(*v);
    }
    let span = max - min;
    if !span.is_finite() || span <= 0.0 {
        for (_, v) in points.iter_mut() {
            *v = 0.0;
        }
        return;
    }
    for (_, v) in points.iter_mut() {
        *v = if v.is_nan() { 0.0 } else { (*v - min) / span };
    }
}

/// Nearest fusion point to `ts`, or `None` when the closest one is more than
/// [`ASOF_TOLERANCE_SECS`] away.
fn nearest_within(fusion: &[Point], ts: i64) -> Option<Point> {
    if fusion.is_empty() {
        return None;
    }
    let idx = fusion.partition_point(|p| p.0 < ts);
    let mut best: Option<Point> = None;
    for candidate in [idx.checked_sub(1).and_then(|i| fusion.get(i)), fusion.get(idx)]
        .into_iter()
        .flatten()
    {
        let dist = (candidate.0 - ts).abs();
        if dist <= ASOF_TOLERANCE_SECS && best.map_or(true, |b| dist < (b.0 - ts).abs()) {
            best = Some(*candidate);
        }
    }
    best
}

/// Build the fused view of the two raw traces.
///
/// Pipeline: parse timestamps (unparseable entries dropped) -> sort -> drop
/// the first cnn sample -> min-max normalize each series -> asof-join cnn
/// onto fusion within one minute -> weight 0.4 cnn + 0.6 fusion.
pub fn combine(fusion_raw: &RawSeries, cnn_raw: &RawSeries) -> FusedSeries {
    let mut fusion = parse_points(fusion_raw);
    let mut cnn = parse_points(cnn_raw);

    // The upstream service's first cnn sample is a known artifact; dropped
    // unconditionally. Fixed rule tied to the current service version.
    if !cnn.is_empty() {
        cnn.remove(0);
    }

    min_max_normalize(&mut fusion);
    min_max_normalize(&mut cnn);

    let combined: Vec<Point> = cnn
        .iter()
        .filter_map(|&(ts, cnn_v)| {
            nearest_within(&fusion, ts)
                .map(|(_, fusion_v)| (ts, CNN_WEIGHT * cnn_v + FUSION_WEIGHT * fusion_v))
        })
        .collect();

    FusedSeries { fusion, cnn, combined }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(entries: &[(&str, f64)]) -> RawSeries {
        RawSeries { entries: entries.iter().map(|(t, v)| (t.to_string(), *v)).collect() }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("1700000000"), Some(1_700_000_000));
        assert_eq!(parse_timestamp("1970-01-01 00:01:00"), Some(60));
        assert_eq!(parse_timestamp("1970-01-01T00:01:00"), Some(60));
        assert_eq!(parse_timestamp("1970-01-01T00:01:00+00:00"), Some(60));
        assert_eq!(parse_timestamp("not-a-time"), None);
    }

    #[test]
    fn test_unparseable_entries_dropped() {
        let points = parse_points(&raw(&[("10", 1.0), ("garbage", 2.0), ("20", 3.0)]));
        assert_eq!(points, vec![(10, 1.0), (20, 3.0)]);
    }

    #[test]
    fn test_parse_sorts_and_dedups() {
        let points = parse_points(&raw(&[("30", 3.0), ("10", 1.0), ("10", 9.0), ("20", 2.0)]));
        assert_eq!(points, vec![(10, 1.0), (20, 2.0), (30, 3.0)]);
    }

    #[test]
    fn test_normalize_range() {
        let mut points = vec![(0, 10.0), (1, 20.0), (2, 30.0)];
        min_max_normalize(&mut points);
        assert_eq!(points, vec![(0, 0.0), (1, 0.5), (2, 1.0)]);
    }

    #[test]
    fn test_normalize_constant_series_is_zero() {
        let mut points = vec![(0, 7.5), (1, 7.5), (2, 7.5)];
        min_max_normalize(&mut points);
        assert!(points.iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn test_normalize_nan_series_is_zero() {
        let mut points = vec![(0, f64::NAN), (1, f64::NAN)];
        min_max_normalize(&mut points);
        assert!(points.iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn test_normalize_empty_is_noop() {
        let mut points: Vec<Point> = Vec::new();
        min_max_normalize(&mut points);
        assert!(points.is_empty());
    }

    #[test]
    fn test_nearest_within_tolerance() {
        let fusion = vec![(0, 0.1), (120, 0.2), (240, 0.3)];
        assert_eq!(nearest_within(&fusion, 100), Some((120, 0.2)));
        // Exactly 60s on both sides: within tolerance, earlier point wins.
        assert_eq!(nearest_within(&fusion, 60), Some((0, 0.1)));
        // 59s from 240 beats 61s from 120.
        assert_eq!(nearest_within(&fusion, 181), Some((240, 0.3)));
        // 71s past the last point: nothing within a minute.
        assert_eq!(nearest_within(&fusion, 311), None);
        assert_eq!(nearest_within(&[], 0), None);
    }

    #[test]
    fn test_combine_drops_first_cnn_sample() {
        let fusion = raw(&[("0", 0.0), ("60", 1.0), ("120", 2.0), ("180", 3.0)]);
        let cnn = raw(&[("0", 99.0), ("60", 1.0), ("120", 2.0), ("180", 3.0)]);
        let out = combine(&fusion, &cnn);
        assert_eq!(out.cnn.len(), 3);
        assert_eq!(out.cnn[0].0, 60);
    }

    #[test]
    fn test_combine_weighting() {
        let fusion = raw(&[("0", 0.0), ("60", 1.0)]);
        let cnn = raw(&[("-60", 5.0), ("0", 0.0), ("60", 1.0)]);
        let out = combine(&fusion, &cnn);
        // Both series normalize to [0,1]; at ts=60 both are 1.0.
        assert_eq!(out.combined.last().copied(), Some((60, 1.0)));
        // At ts=0 both are 0.0.
        assert_eq!(out.combined[0], (0, 0.0));
    }

    #[test]
    fn test_combine_length_bound_and_monotonic() {
        let fusion = raw(&[("0", 1.0), ("60", 2.0), ("120", 3.0), ("500", 4.0)]);
        let cnn = raw(&[("-60", 0.0), ("10", 1.0), ("70", 2.0), ("300", 3.0)]);
        let out = combine(&fusion, &cnn);
        assert!(out.combined.len() <= out.cnn.len().min(out.fusion.len()));
        for w in out.combined.windows(2) {
            assert!(w[1].0 > w[0].0);
        }
        // ts=300 is 180s from its nearest fusion neighbor, so it is dropped.
        assert!(out.combined.iter().all(|(t, _)| *t != 300));
    }

    #[test]
    fn test_combine_values_in_unit_interval() {
        let fusion = raw(&[("0", -10.0), ("60", 0.0), ("120", 25.0)]);
        let cnn = raw(&[("-60", 1.0), ("0", -3.0), ("60", 8.0), ("120", 2.0)]);
        let out = combine(&fusion, &cnn);
        for series in [&out.fusion, &out.cnn, &out.combined] {
            for (_, v) in series {
                assert!((0.0..=1.0).contains(v), "value out of range: {}", v);
            }
        }
    }
}
