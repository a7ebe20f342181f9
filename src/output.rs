//! Output formatting and persistence for trail usage.
//!
//! A [`UsageMap`] carries everything a map needs (trails, centre, extent,
//! boundary). [`MapRenderer`] implementations turn it into a file: a GeoJSON
//! marker layer for web maps or a plain CSV table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::Serialize;
use serde_json::json;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::boundary::{Boundary, BoundaryStatus};
use crate::records::TrailUsageSummary;
use crate::region::{Extent, LatLon};
use crate::usage::{MarkerStyle, UsageCategory, classify_usage, legend};

/// A fully laid out trail usage map, ready to be written.
#[derive(Debug, Clone)]
pub struct UsageMap {
    pub title: String,
    pub trails: Vec<TrailUsageSummary>,
    pub center: LatLon,
    /// Plot extent in Web Mercator metres. `None` when there is nothing to plot.
    pub extent: Option<Extent>,
    pub boundary: Option<Boundary>,
    pub boundary_status: BoundaryStatus,
    pub generated_at: DateTime<Utc>,
}

/// Writes a [`UsageMap`] to disk in some format.
pub trait MapRenderer {
    /// Conventional file extension, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, map: &UsageMap, path: &Path) -> Result<()>;
}

/// Renders trails as a GeoJSON `FeatureCollection` of styled point markers.
///
/// Map-level settings (title, centre, extent, legend) are stored as foreign
/// members of the collection.
pub struct GeoJsonRenderer;

impl GeoJsonRenderer {
    pub fn to_feature_collection(&self, map: &UsageMap) -> FeatureCollection {
        let mut features: Vec<Feature> = Vec::new();

        if let Some(boundary) = &map.boundary {
            for f in &boundary.features {
                let mut f = f.clone();
                f.set_property("layer", "boundary");
                features.push(f);
            }
        }

        features.extend(map.trails.iter().map(trail_feature));

        let mut meta = JsonObject::new();
        meta.insert("title".to_string(), json!(map.title));
        meta.insert(
            "center".to_string(),
            json!([map.center.latitude, map.center.longitude]),
        );
        meta.insert("extent_3857".to_string(), json!(map.extent));
        meta.insert("boundary_status".to_string(), json!(map.boundary_status));
        meta.insert("legend".to_string(), json!(legend()));
        meta.insert("generated_at".to_string(), json!(map.generated_at));

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(meta),
        }
    }
}

impl MapRenderer for GeoJsonRenderer {
    fn extension(&self) -> &'static str {
        "geojson"
    }

    #[tracing::instrument(skip(self, map), fields(path = %path.display()))]
    fn render(&self, map: &UsageMap, path: &Path) -> Result<()> {
        let collection = self.to_feature_collection(map);
        let mut file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(&mut file, &collection)?;
        file.flush()?;

        info!(markers = map.trails.len(), "GeoJSON map layer written");
        Ok(())
    }
}

/// Renders the trail table as CSV.
pub struct CsvRenderer;

impl MapRenderer for CsvRenderer {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn render(&self, map: &UsageMap, path: &Path) -> Result<()> {
        write_summaries(path, &map.trails)
    }
}

fn trail_feature(trail: &TrailUsageSummary) -> Feature {
    let style = MarkerStyle::for_percentage(trail.usage_percentage);

    let mut feature = Feature::from(Geometry::new(Value::Point(vec![
        trail.longitude,
        trail.latitude,
    ])));
    feature.set_property("layer", "trails");
    feature.set_property("name", trail.name.clone());
    feature.set_property("total_visits", trail.total_visits);
    feature.set_property("usage_percentage", trail.usage_percentage);
    feature.set_property("category", style.category.as_str());
    feature.set_property("color", style.color);
    feature.set_property("radius", style.radius);
    feature.set_property(
        "popup",
        format!(
            "<b>{}</b><br>Total Visits: {}<br>Usage: {:.1}% of all trail visits",
            trail.name,
            group_thousands(trail.total_visits),
            trail.usage_percentage
        ),
    );
    feature.set_property(
        "tooltip",
        format!("{}: {:.1}%", trail.name, trail.usage_percentage),
    );
    feature
}

/// Formats `n` with comma thousands separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    name: &'a str,
    latitude: f64,
    longitude: f64,
    total_visits: u64,
    usage_percentage: f64,
    category: UsageCategory,
}

/// Writes summaries as a CSV table with a header row, replacing any existing file.
pub fn write_summaries(path: &Path, summaries: &[TrailUsageSummary]) -> Result<()> {
    debug!(path = %path.display(), rows = summaries.len(), "Writing summary CSV");

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for s in summaries {
        writer.serialize(SummaryRow {
            name: &s.name,
            latitude: s.latitude,
            longitude: s.longitude,
            total_visits: s.total_visits,
            usage_percentage: s.usage_percentage,
            category: classify_usage(s.usage_percentage),
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Logs the `n` most visited trails, busiest first.
pub fn log_top_trails(summaries: &[TrailUsageSummary], n: usize) {
    let mut ranked: Vec<&TrailUsageSummary> = summaries.iter().collect();
    ranked.sort_by(|a, b| b.total_visits.cmp(&a.total_visits).then(a.name.cmp(&b.name)));

    for (rank, s) in ranked.into_iter().take(n).enumerate() {
        info!(
            rank = rank + 1,
            name = %s.name,
            visits = s.total_visits,
            usage_percentage = %format!("{:.1}", s.usage_percentage),
            "Top trail"
        );
    }
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
