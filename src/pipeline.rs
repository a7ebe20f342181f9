//! End-to-end run: raw rows in, laid out [`UsageMap`] out.

use chrono::Utc;
use tracing::{info, warn};

use crate::aggregate::TrailUsageAggregator;
use crate::boundary::resolve_boundary;
use crate::fetch::HttpClient;
use crate::output::UsageMap;
use crate::records::{RawVisitRecord, TrailUsageSummary};
use crate::region::{Extent, RegionConfig, map_center};

/// Cleans, aggregates and region-filters `records`.
///
/// Percentages are shares of every trail in the file, including trails later
/// dropped by the region filter.
pub fn prepare_trails(records: Vec<RawVisitRecord>, config: &RegionConfig) -> Vec<TrailUsageSummary> {
    let summaries = TrailUsageAggregator::summarize(records);
    info!(unique_trails = summaries.len(), "Unique trail locations");

    if let Some(range) = Extent::from_points(summaries.iter().map(|s| (s.longitude, s.latitude))) {
        info!(
            latitude = %format!("{:.4} to {:.4}", range.min_y, range.max_y),
            longitude = %format!("{:.4} to {:.4}", range.min_x, range.max_x),
            "Coordinate ranges"
        );
    }

    TrailUsageAggregator::filter_by_region(summaries, config.latitude, config.longitude)
}

/// Builds the map for `records`: trails, centre, boundary and plot extent.
pub async fn build_usage_map<C: HttpClient>(
    client: &C,
    records: Vec<RawVisitRecord>,
    config: &RegionConfig,
) -> UsageMap {
    let trails = prepare_trails(records, config);

    let center = map_center(&trails, config.default_center);
    if trails.is_empty() {
        warn!("No valid coordinates found, using default centre");
    }

    let (boundary, boundary_status) = resolve_boundary(client, config.boundary.as_ref()).await;
    let extent = config.plot_extent(&trails, boundary.as_ref().map(|b| &b.extent));

    UsageMap {
        title: config.title.clone(),
        trails,
        center,
        extent,
        boundary,
        boundary_status,
        generated_at: Utc::now(),
    }
}
