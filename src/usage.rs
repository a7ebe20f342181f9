//! Usage buckets and marker styling.

use serde::Serialize;

/// Usage bucket for a trailhead's share of visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsageCategory {
    High,
    MediumHigh,
    Medium,
    Low,
}

impl UsageCategory {
    /// All categories, busiest first. Used for legends.
    pub const ALL: [UsageCategory; 4] = [
        UsageCategory::High,
        UsageCategory::MediumHigh,
        UsageCategory::Medium,
        UsageCategory::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UsageCategory::High => "high",
            UsageCategory::MediumHigh => "medium-high",
            UsageCategory::Medium => "medium",
            UsageCategory::Low => "low",
        }
    }

    /// Marker colour name.
    pub fn color(self) -> &'static str {
        match self {
            UsageCategory::High => "red",
            UsageCategory::MediumHigh => "orange",
            UsageCategory::Medium => "yellow",
            UsageCategory::Low => "blue",
        }
    }

    /// Legend label for the bucket's percentage range.
    pub fn label(self) -> &'static str {
        match self {
            UsageCategory::High => ">15%",
            UsageCategory::MediumHigh => "10-15%",
            UsageCategory::Medium => "5-10%",
            UsageCategory::Low => "<5%",
        }
    }
}

/// Converts a usage percentage (0-100) into a [`UsageCategory`].
///
/// | Range          | Category    |
/// |----------------|-------------|
/// | > 15           | high        |
/// | > 10 and <= 15 | medium-high |
/// | > 5 and <= 10  | medium      |
/// | <= 5           | low         |
///
/// Boundary values fall into the lower bucket. `NaN` is `low`.
pub fn classify_usage(pct: f64) -> UsageCategory {
    match pct {
        p if p > 15.0 => UsageCategory::High,
        p if p > 10.0 => UsageCategory::MediumHigh,
        p if p > 5.0 => UsageCategory::Medium,
        _ => UsageCategory::Low,
    }
}

/// Smallest marker radius, so quiet trailheads stay clickable.
pub const MIN_MARKER_RADIUS: f64 = 8.0;

/// Interactive marker radius in pixels.
pub fn marker_radius(pct: f64) -> f64 {
    (pct * 1.5).max(MIN_MARKER_RADIUS)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub category: UsageCategory,
    pub color: &'static str,
    pub radius: f64,
}

impl MarkerStyle {
    pub fn for_percentage(pct: f64) -> Self {
        let category = classify_usage(pct);
        Self {
            category,
            color: category.color(),
            radius: marker_radius(pct),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: &'static str,
    pub label: &'static str,
}

/// Legend rows, busiest bucket first.
pub fn legend() -> Vec<LegendEntry> {
    UsageCategory::ALL
        .iter()
        .map(|c| LegendEntry {
            color: c.color(),
            label: c.label(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify_usage(100.0), UsageCategory::High);
        assert_eq!(classify_usage(15.01), UsageCategory::High);
        assert_eq!(classify_usage(15.0), UsageCategory::MediumHigh);
        assert_eq!(classify_usage(10.01), UsageCategory::MediumHigh);
        assert_eq!(classify_usage(10.0), UsageCategory::Medium);
        assert_eq!(classify_usage(5.01), UsageCategory::Medium);
        assert_eq!(classify_usage(5.0), UsageCategory::Low);
        assert_eq!(classify_usage(0.0), UsageCategory::Low);
    }

    #[test]
    fn test_classify_nan_is_low() {
        assert_eq!(classify_usage(f64::NAN), UsageCategory::Low);
    }

    #[test]
    fn test_marker_radius_has_floor() {
        assert_eq!(marker_radius(0.0), 8.0);
        assert_eq!(marker_radius(5.0), 8.0);
        assert_eq!(marker_radius(20.0), 30.0);
    }

    #[test]
    fn test_marker_style_colors() {
        let style = MarkerStyle::for_percentage(75.0);
        assert_eq!(style.category, UsageCategory::High);
        assert_eq!(style.color, "red");
        assert_eq!(style.radius, 112.5);

        assert_eq!(MarkerStyle::for_percentage(12.0).color, "orange");
        assert_eq!(MarkerStyle::for_percentage(7.0).color, "yellow");
        assert_eq!(MarkerStyle::for_percentage(1.0).color, "blue");
    }

    #[test]
    fn test_legend_order() {
        let labels: Vec<_> = legend().into_iter().map(|e| e.label).collect();
        assert_eq!(labels, vec![">15%", "10-15%", "5-10%", "<5%"]);
    }

    #[test]
    fn test_category_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&UsageCategory::MediumHigh).unwrap(),
            "\"medium-high\""
        );
    }
}
