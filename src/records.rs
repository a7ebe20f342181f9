//! Data types shared by the loading and aggregation pipeline.

use serde::{Deserialize, Serialize};

/// A single row deserialized from the visits CSV.
///
/// Coordinates are kept as text because exports regularly contain blanks or
/// stray labels in the coordinate columns. Unknown columns are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawVisitRecord {
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub visits: u64,
}

impl RawVisitRecord {
    pub fn new(
        name: &str,
        latitude: impl ToString,
        longitude: impl ToString,
        visits: u64,
    ) -> Self {
        Self {
            name: name.to_string(),
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
            visits,
        }
    }
}

/// A visit row whose coordinates parsed as finite numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailVisitRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub visits: u64,
}

/// Visit totals for one trailhead, identified by `(name, latitude, longitude)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailUsageSummary {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_visits: u64,
    pub usage_percentage: f64,
}
