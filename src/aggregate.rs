//! Trail usage aggregation.
//!
//! Turns raw visit rows into one [`TrailUsageSummary`] per trailhead: coordinates
//! are coerced to numbers, unusable rows dropped, visits summed per
//! `(name, latitude, longitude)` and each trailhead's share of all visits derived.

use crate::records::{RawVisitRecord, TrailUsageSummary, TrailVisitRecord};
use crate::region::Bounds;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Parses a coordinate cell. Blank, non-numeric and non-finite values yield `None`.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Returns `part` as a percentage of `total`, or `0.0` when `total` is zero.
pub fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Namespace for the cleaning and aggregation steps.
pub struct TrailUsageAggregator;

impl TrailUsageAggregator {
    /// Keeps only rows whose latitude and longitude both parse.
    pub fn clean(records: Vec<RawVisitRecord>) -> Vec<TrailVisitRecord> {
        let total = records.len();

        let cleaned: Vec<TrailVisitRecord> = records
            .into_iter()
            .filter_map(|r| {
                let latitude = parse_coordinate(&r.latitude);
                let longitude = parse_coordinate(&r.longitude);

                match (latitude, longitude) {
                    (Some(latitude), Some(longitude)) => Some(TrailVisitRecord {
                        name: r.name,
                        latitude,
                        longitude,
                        visits: r.visits,
                    }),
                    _ => {
                        debug!(
                            name = %r.name,
                            latitude = %r.latitude,
                            longitude = %r.longitude,
                            bad_latitude = latitude.is_none(),
                            bad_longitude = longitude.is_none(),
                            "Dropping record with invalid coordinates"
                        );
                        None
                    }
                }
            })
            .collect();

        info!(
            kept = cleaned.len(),
            dropped = total - cleaned.len(),
            "Cleaned coordinates"
        );

        cleaned
    }

    /// Sums visits per distinct `(name, latitude, longitude)`.
    ///
    /// The result is sorted by name, then latitude, then longitude, so it does
    /// not depend on input order. Percentages are left at `0.0`.
    pub fn aggregate(records: &[TrailVisitRecord]) -> Vec<TrailUsageSummary> {
        let mut totals: HashMap<(&str, u64, u64), u64> = HashMap::new();

        for r in records {
            *totals
                .entry((r.name.as_str(), coord_key(r.latitude), coord_key(r.longitude)))
                .or_default() += r.visits;
        }

        let mut summaries: Vec<TrailUsageSummary> = totals
            .into_iter()
            .map(|((name, lat, lon), total_visits)| TrailUsageSummary {
                name: name.to_string(),
                latitude: f64::from_bits(lat),
                longitude: f64::from_bits(lon),
                total_visits,
                usage_percentage: 0.0,
            })
            .collect();

        summaries.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.latitude.total_cmp(&b.latitude))
                .then(a.longitude.total_cmp(&b.longitude))
        });

        debug!(unique_trails = summaries.len(), "Aggregated visits");
        summaries
    }

    /// Fills in each summary's share of all visits.
    ///
    /// When there are no visits at all every percentage is `0.0`.
    pub fn with_percentages(mut summaries: Vec<TrailUsageSummary>) -> Vec<TrailUsageSummary> {
        let total: u64 = summaries.iter().map(|s| s.total_visits).sum();

        if total == 0 && !summaries.is_empty() {
            warn!(trails = summaries.len(), "No visits recorded, percentages set to zero");
        }

        for s in &mut summaries {
            s.usage_percentage = pct(s.total_visits, total);
        }

        summaries
    }

    /// Keeps summaries whose coordinates lie inside both closed intervals.
    pub fn filter_by_region(
        summaries: Vec<TrailUsageSummary>,
        lat_bounds: Bounds,
        lon_bounds: Bounds,
    ) -> Vec<TrailUsageSummary> {
        let expected = summaries.len();

        let kept: Vec<TrailUsageSummary> = summaries
            .into_iter()
            .filter(|s| {
                let inside = lat_bounds.contains(s.latitude) && lon_bounds.contains(s.longitude);
                if !inside {
                    warn!(
                        name = %s.name,
                        latitude = s.latitude,
                        longitude = s.longitude,
                        "Skipping trail outside region bounds"
                    );
                }
                inside
            })
            .collect();

        info!(kept = kept.len(), expected, "Filtered trails by region");
        kept
    }

    /// Runs clean, aggregate and percentage steps in order.
    pub fn summarize(records: Vec<RawVisitRecord>) -> Vec<TrailUsageSummary> {
        let cleaned = Self::clean(records);
        let summaries = Self::aggregate(&cleaned);
        Self::with_percentages(summaries)
    }
}

// -0.0 and 0.0 compare equal, so they must share a key.
fn coord_key(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(name: &str, latitude: f64, longitude: f64, visits: u64) -> TrailVisitRecord {
        TrailVisitRecord {
            name: name.to_string(),
            latitude,
            longitude,
            visits,
        }
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(pct(50, 100), 50.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("40.0"), Some(40.0));
        assert_eq!(parse_coordinate(" -105.27 "), Some(-105.27));
        assert_eq!(parse_coordinate(""), None);
        assert_eq!(parse_coordinate("abc"), None);
        assert_eq!(parse_coordinate("NaN"), None);
        assert_eq!(parse_coordinate("inf"), None);
    }

    #[test]
    fn test_clean_drops_non_numeric_latitude() {
        let records = vec![RawVisitRecord::new("Chautauqua", "abc", 1.0, 3)];
        assert!(TrailUsageAggregator::clean(records).is_empty());
    }

    #[test]
    fn test_clean_drops_when_either_field_fails() {
        let records = vec![
            RawVisitRecord::new("Good", 40.0, -105.0, 1),
            RawVisitRecord::new("NoLon", 40.0, "", 1),
            RawVisitRecord::new("NoLat", "n/a", -105.0, 1),
        ];
        let cleaned = TrailUsageAggregator::clean(records);

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].name, "Good");
        assert_eq!(cleaned[0].latitude, 40.0);
        assert_eq!(cleaned[0].longitude, -105.0);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(TrailUsageAggregator::aggregate(&[]).is_empty());
        assert!(TrailUsageAggregator::with_percentages(vec![]).is_empty());
    }

    #[test]
    fn test_aggregate_groups_by_name_and_coordinates() {
        let records = vec![
            visit("A", 40.0, -105.0, 10),
            visit("A", 40.0, -105.0, 5),
            visit("A", 40.2, -105.0, 1),
            visit("B", 40.0, -105.0, 2),
        ];
        let summaries = TrailUsageAggregator::aggregate(&records);

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].name, "A");
        assert_eq!(summaries[0].latitude, 40.0);
        assert_eq!(summaries[0].total_visits, 15);
        assert_eq!(summaries[1].latitude, 40.2);
        assert_eq!(summaries[1].total_visits, 1);
        assert_eq!(summaries[2].name, "B");
        assert_eq!(summaries[2].total_visits, 2);
    }

    #[test]
    fn test_aggregate_treats_signed_zero_as_equal() {
        let records = vec![visit("Equator", 0.0, 10.0, 1), visit("Equator", -0.0, 10.0, 1)];
        let summaries = TrailUsageAggregator::aggregate(&records);

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_visits, 2);
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let records = vec![
            visit("Mesa", 39.95, -105.28, 7),
            visit("Sanitas", 40.03, -105.30, 3),
            visit("Mesa", 39.95, -105.28, 1),
            visit("Royal Arch", 39.99, -105.29, 4),
            visit("Sanitas", 40.03, -105.30, 9),
        ];
        let mut reversed = records.clone();
        reversed.reverse();
        let mut rotated = records.clone();
        rotated.rotate_left(2);

        let expected = TrailUsageAggregator::aggregate(&records);
        assert_eq!(TrailUsageAggregator::aggregate(&reversed), expected);
        assert_eq!(TrailUsageAggregator::aggregate(&rotated), expected);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let records = vec![
            visit("A", 40.0, -105.0, 3),
            visit("B", 40.1, -105.1, 7),
            visit("C", 40.2, -105.2, 11),
            visit("D", 40.3, -105.3, 13),
        ];
        let summaries =
            TrailUsageAggregator::with_percentages(TrailUsageAggregator::aggregate(&records));

        let sum: f64 = summaries.iter().map(|s| s.usage_percentage).sum();
        assert!((sum - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_percentages_all_zero_visits() {
        let records = vec![visit("A", 40.0, -105.0, 0), visit("B", 40.1, -105.1, 0)];
        let summaries =
            TrailUsageAggregator::with_percentages(TrailUsageAggregator::aggregate(&records));

        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.usage_percentage == 0.0));
    }

    #[test]
    fn test_summarize_end_to_end() {
        let records = vec![
            RawVisitRecord::new("A", 40.0, -105.0, 10),
            RawVisitRecord::new("A", 40.0, -105.0, 5),
            RawVisitRecord::new("B", 40.1, -105.1, 5),
        ];
        let summaries = TrailUsageAggregator::summarize(records);

        assert_eq!(
            summaries,
            vec![
                TrailUsageSummary {
                    name: "A".to_string(),
                    latitude: 40.0,
                    longitude: -105.0,
                    total_visits: 15,
                    usage_percentage: 75.0,
                },
                TrailUsageSummary {
                    name: "B".to_string(),
                    latitude: 40.1,
                    longitude: -105.1,
                    total_visits: 5,
                    usage_percentage: 25.0,
                },
            ]
        );
    }

    #[test]
    fn test_filter_by_region_excludes_outside_point() {
        let summaries = TrailUsageAggregator::with_percentages(TrailUsageAggregator::aggregate(&[
            visit("Inside", 40.0, -105.0, 1),
            visit("North", 41.0, -105.0, 1),
        ]));
        let kept = TrailUsageAggregator::filter_by_region(
            summaries,
            Bounds::new(39.5, 40.5),
            Bounds::new(-106.0, -104.5),
        );

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Inside");
    }

    #[test]
    fn test_filter_by_region_bounds_are_closed() {
        let summaries = TrailUsageAggregator::aggregate(&[
            visit("SW", 39.5, -106.0, 1),
            visit("NE", 40.5, -104.5, 1),
            visit("JustOut", 40.500001, -105.0, 1),
        ]);
        let kept = TrailUsageAggregator::filter_by_region(
            summaries,
            Bounds::new(39.5, 40.5),
            Bounds::new(-106.0, -104.5),
        );

        let names: Vec<_> = kept.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["NE", "SW"]);
    }
}
