//! Administrative boundary lookup.
//!
//! A boundary is one or more GeoJSON features (a county, a city) selected from
//! a larger dataset by property equality. It only frames the map; trails are
//! never filtered against it. Every failure here is recoverable: callers fall
//! back to the extent of the trails and record why via [`BoundaryStatus`].

use geo::BoundingRect;
use geojson::{Feature, GeoJson};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::fetch::{HttpClient, fetch_bytes, is_remote};
use crate::region::{BoundarySource, Extent};

/// Matched boundary features and their combined longitude/latitude extent.
#[derive(Debug, Clone)]
pub struct Boundary {
    pub features: Vec<Feature>,
    pub extent: Extent,
}

/// Outcome of the boundary lookup for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryStatus {
    Loaded,
    /// The dataset was read but nothing matched the filter.
    NotFound,
    /// The dataset could not be read or downloaded.
    Unavailable,
    /// The dataset was read but is not usable GeoJSON.
    Invalid,
    NotRequested,
}

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("boundary dataset {location} unavailable: {reason}")]
    Unavailable { location: String, reason: String },

    #[error("boundary dataset {location} is not valid GeoJSON: {reason}")]
    Invalid { location: String, reason: String },

    #[error("no feature in {location} matches {filter}")]
    NotFound { location: String, filter: String },
}

impl BoundaryError {
    pub fn status(&self) -> BoundaryStatus {
        match self {
            BoundaryError::Unavailable { .. } => BoundaryStatus::Unavailable,
            BoundaryError::Invalid { .. } => BoundaryStatus::Invalid,
            BoundaryError::NotFound { .. } => BoundaryStatus::NotFound,
        }
    }
}

/// Reads the dataset named by `source` (path or URL) and selects the matching features.
#[tracing::instrument(skip(client), fields(location = %source.source))]
pub async fn load_boundary<C: HttpClient>(
    client: &C,
    source: &BoundarySource,
) -> Result<Boundary, BoundaryError> {
    let location = source.source.as_str();

    let bytes = if is_remote(location) {
        fetch_bytes(client, location).await.map_err(|e| BoundaryError::Unavailable {
            location: location.to_string(),
            reason: e.to_string(),
        })?
    } else {
        std::fs::read(location).map_err(|e| BoundaryError::Unavailable {
            location: location.to_string(),
            reason: e.to_string(),
        })?
    };

    parse_boundary(location, &bytes, &source.properties)
}

/// Parses GeoJSON `bytes` and keeps the features whose properties match `filter`.
///
/// `location` only labels errors. An empty filter matches every feature, and a
/// bare geometry document is accepted only with an empty filter.
pub fn parse_boundary(
    location: &str,
    bytes: &[u8],
    filter: &BTreeMap<String, String>,
) -> Result<Boundary, BoundaryError> {
    let invalid = |reason: String| BoundaryError::Invalid {
        location: location.to_string(),
        reason,
    };

    let text = std::str::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;
    let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| invalid(e.to_string()))?;

    let candidates = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![Feature::from(g)],
    };

    let features: Vec<Feature> = candidates
        .into_iter()
        .filter(|f| feature_matches(f, filter))
        .collect();

    if features.is_empty() {
        return Err(BoundaryError::NotFound {
            location: location.to_string(),
            filter: describe_filter(filter),
        });
    }

    let mut extent: Option<Extent> = None;
    for feature in &features {
        let geometry = feature
            .geometry
            .clone()
            .ok_or_else(|| invalid("matched feature has no geometry".to_string()))?;
        let geometry: geo::Geometry<f64> = geometry
            .try_into()
            .map_err(|e: geojson::Error| invalid(e.to_string()))?;

        if let Some(rect) = geometry.bounding_rect() {
            let corners = [(rect.min().x, rect.min().y), (rect.max().x, rect.max().y)];
            let points = extent
                .into_iter()
                .flat_map(|e| [(e.min_x, e.min_y), (e.max_x, e.max_y)])
                .chain(corners);
            extent = Extent::from_points(points);
        }
    }

    let extent = extent.ok_or_else(|| invalid("matched features have empty geometry".to_string()))?;

    Ok(Boundary { features, extent })
}

/// Loads the boundary if one is configured, logging why it is missing otherwise.
pub async fn resolve_boundary<C: HttpClient>(
    client: &C,
    source: Option<&BoundarySource>,
) -> (Option<Boundary>, BoundaryStatus) {
    let Some(source) = source else {
        return (None, BoundaryStatus::NotRequested);
    };

    match load_boundary(client, source).await {
        Ok(boundary) => {
            info!(
                features = boundary.features.len(),
                location = %source.source,
                "Boundary loaded"
            );
            (Some(boundary), BoundaryStatus::Loaded)
        }
        Err(e) => {
            match &e {
                BoundaryError::NotFound { .. } => {
                    warn!(error = %e, "Boundary not found in dataset, using trail extent")
                }
                BoundaryError::Unavailable { .. } => {
                    warn!(error = %e, "Could not read boundary dataset, using trail extent")
                }
                BoundaryError::Invalid { .. } => {
                    warn!(error = %e, "Boundary dataset unusable, using trail extent")
                }
            }
            (None, e.status())
        }
    }
}

fn feature_matches(feature: &Feature, filter: &BTreeMap<String, String>) -> bool {
    filter.iter().all(|(key, expected)| match feature.property(key) {
        Some(JsonValue::String(s)) => s == expected,
        Some(other) => other.to_string() == *expected,
        None => false,
    })
}

fn describe_filter(filter: &BTreeMap<String, String>) -> String {
    if filter.is_empty() {
        return "any feature".to_string();
    }
    filter
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use std::env;
    use std::fs;

    const COUNTIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "NAME": "Boulder", "STATEFP": "08", "AREA": 740 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-105.7, 39.9], [-105.0, 39.9], [-105.0, 40.3], [-105.7, 40.3], [-105.7, 39.9]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "NAME": "Boulder", "STATEFP": "30", "AREA": 12 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-112.2, 46.2], [-112.0, 46.2], [-112.0, 46.3], [-112.2, 46.2]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "NAME": "Larimer", "STATEFP": "08", "AREA": 2634 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-106.2, 40.2], [-104.9, 40.2], [-104.9, 41.0], [-106.2, 41.0], [-106.2, 40.2]]]
                }
            }
        ]
    }"#;

    fn filter(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_parse_boundary_selects_by_all_properties() {
        let boundary = parse_boundary(
            "counties",
            COUNTIES.as_bytes(),
            &filter(&[("NAME", "Boulder"), ("STATEFP", "08")]),
        )
        .unwrap();

        assert_eq!(boundary.features.len(), 1);
        assert_eq!(
            boundary.extent,
            Extent {
                min_x: -105.7,
                min_y: 39.9,
                max_x: -105.0,
                max_y: 40.3
            }
        );
    }

    #[test]
    fn test_parse_boundary_combines_multiple_matches() {
        let boundary =
            parse_boundary("counties", COUNTIES.as_bytes(), &filter(&[("STATEFP", "08")]))
                .unwrap();

        assert_eq!(boundary.features.len(), 2);
        assert_eq!(boundary.extent.min_x, -106.2);
        assert_eq!(boundary.extent.max_y, 41.0);
        assert_eq!(boundary.extent.min_y, 39.9);
    }

    #[test]
    fn test_parse_boundary_numeric_property() {
        let boundary =
            parse_boundary("counties", COUNTIES.as_bytes(), &filter(&[("AREA", "740")])).unwrap();
        assert_eq!(boundary.features.len(), 1);
    }

    #[test]
    fn test_parse_boundary_not_found() {
        let err = parse_boundary("counties", COUNTIES.as_bytes(), &filter(&[("NAME", "Denver")]))
            .unwrap_err();

        assert_eq!(err.status(), BoundaryStatus::NotFound);
        assert!(err.to_string().contains("NAME=Denver"));
    }

    #[test]
    fn test_parse_boundary_invalid_json() {
        let err = parse_boundary("broken", b"{ not geojson", &BTreeMap::new()).unwrap_err();
        assert_eq!(err.status(), BoundaryStatus::Invalid);
    }

    #[test]
    fn test_parse_boundary_bare_geometry() {
        let geometry = r#"{"type": "Point", "coordinates": [-105.27, 40.01]}"#;
        let boundary = parse_boundary("point", geometry.as_bytes(), &BTreeMap::new()).unwrap();

        assert_eq!(boundary.extent.min_x, -105.27);
        assert_eq!(boundary.extent.max_y, 40.01);

        let err = parse_boundary("point", geometry.as_bytes(), &filter(&[("NAME", "Boulder")]))
            .unwrap_err();
        assert_eq!(err.status(), BoundaryStatus::NotFound);
    }

    #[tokio::test]
    async fn test_load_boundary_from_file() {
        let path = temp_path("trail_usage_mapper_test_counties.geojson");
        fs::write(&path, COUNTIES).unwrap();

        let client = BasicClient::new().unwrap();
        let source = BoundarySource {
            source: path.clone(),
            properties: filter(&[("NAME", "Larimer")]),
        };
        let boundary = load_boundary(&client, &source).await.unwrap();
        assert_eq!(boundary.extent.max_x, -104.9);

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable_not_not_found() {
        let client = BasicClient::new().unwrap();
        let source = BoundarySource {
            source: "/nonexistent/counties.geojson".to_string(),
            properties: filter(&[("NAME", "Boulder")]),
        };

        let err = load_boundary(&client, &source).await.unwrap_err();
        assert_eq!(err.status(), BoundaryStatus::Unavailable);

        let (boundary, status) = resolve_boundary(&client, Some(&source)).await;
        assert!(boundary.is_none());
        assert_eq!(status, BoundaryStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_resolve_boundary_not_requested() {
        let client = BasicClient::new().unwrap();
        let (boundary, status) = resolve_boundary(&client, None).await;

        assert!(boundary.is_none());
        assert_eq!(status, BoundaryStatus::NotRequested);
    }
}
