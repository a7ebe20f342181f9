//! Region bounds, map extents and projection helpers.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::path::Path;

use crate::records::TrailUsageSummary;

/// WGS84 semi-major axis used by EPSG:3857.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// A closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }
}

/// An axis-aligned rectangle. `x` is longitude or easting, `y` latitude or northing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Smallest extent containing every `(x, y)` point, or `None` if there are none.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Extent {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(e) => Extent {
                    min_x: e.min_x.min(x),
                    min_y: e.min_y.min(y),
                    max_x: e.max_x.max(x),
                    max_y: e.max_y.max(y),
                },
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Grows every side by `ratio` times the width.
    ///
    /// Both axes use the horizontal span so a single row of points still gets
    /// vertical room.
    pub fn padded(&self, ratio: f64) -> Self {
        let pad = self.width() * ratio;
        Extent {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }

    /// Reprojects a longitude/latitude extent to Web Mercator metres.
    pub fn to_web_mercator(&self) -> Self {
        let (min_x, min_y) = web_mercator(self.min_x, self.min_y);
        let (max_x, max_y) = web_mercator(self.max_x, self.max_y);
        Extent {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

/// Projects EPSG:4326 longitude/latitude in degrees to EPSG:3857 metres.
pub fn web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

/// Mean position of all trails, or `default` when there are none.
pub fn map_center(summaries: &[TrailUsageSummary], default: LatLon) -> LatLon {
    if summaries.is_empty() {
        return default;
    }
    let n = summaries.len() as f64;
    LatLon {
        latitude: summaries.iter().map(|s| s.latitude).sum::<f64>() / n,
        longitude: summaries.iter().map(|s| s.longitude).sum::<f64>() / n,
    }
}

/// Where to find the boundary polygon and which feature to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundarySource {
    /// File path or `http(s)` URL of a GeoJSON dataset.
    pub source: String,
    /// Feature properties that must all match, e.g. `{"NAME": "Boulder"}`.
    #[serde(default, rename = "match")]
    pub properties: BTreeMap<String, String>,
}

/// Region settings for one map.
///
/// Loaded from a JSON file:
/// ```json
/// {
///   "title": "Boulder County Trail Usage Distribution",
///   "latitude": { "min": 39.5, "max": 40.5 },
///   "longitude": { "min": -106.0, "max": -104.5 },
///   "boundary": { "source": "counties.geojson", "match": { "NAME": "Boulder" } }
/// }
/// ```
/// Missing fields take the Boulder County defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub title: String,
    pub latitude: Bounds,
    pub longitude: Bounds,
    pub default_center: LatLon,
    pub boundary: Option<BoundarySource>,
    /// Padding around a loaded boundary, as a fraction of its width.
    pub boundary_padding: f64,
    /// Padding around the trails when no boundary is available.
    pub fallback_padding: f64,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            title: "Boulder County Trail Usage Distribution".to_string(),
            latitude: Bounds::new(39.5, 40.5),
            longitude: Bounds::new(-106.0, -104.5),
            default_center: LatLon {
                latitude: 40.0150,
                longitude: -105.2705,
            },
            boundary: None,
            boundary_padding: 0.05,
            fallback_padding: 0.2,
        }
    }
}

impl RegionConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading region config {}", path.display()))?;
        let config: RegionConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing region config {}", path.display()))?;
        Ok(config)
    }

    /// Map extent in Web Mercator metres.
    ///
    /// Uses the boundary extent (longitude/latitude) when one is given,
    /// otherwise the extent of the trails themselves.
    pub fn plot_extent(
        &self,
        summaries: &[TrailUsageSummary],
        boundary: Option<&Extent>,
    ) -> Option<Extent> {
        match boundary {
            Some(b) => Some(b.to_web_mercator().padded(self.boundary_padding)),
            None => Extent::from_points(
                summaries
                    .iter()
                    .map(|s| web_mercator(s.longitude, s.latitude)),
            )
            .map(|e| e.padded(self.fallback_padding)),
        }
    }
}
