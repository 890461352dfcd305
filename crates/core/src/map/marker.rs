use geo::Point;
use serde::{Deserialize, Serialize};

use crate::map::icon::IconSpec;

pub const DEFAULT_COLOR: &str = "#3388ff";
pub const DEFAULT_LABEL: &str = "Location";

/// One point to display, as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointDescriptor {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl PointDescriptor {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            color: None,
            label: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Engine-agnostic description of one marker.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerSpec {
    /// x is longitude, y is latitude
    pub position: Point,
    pub icon: IconSpec,
    pub label: String,
}

impl MarkerSpec {
    pub fn lat(&self) -> f64 {
        self.position.y()
    }

    pub fn lng(&self) -> f64 {
        self.position.x()
    }

    pub fn try_from_point(point: &PointDescriptor) -> Result<Self, PointRejection> {
        validate(point.lat, point.lng)?;

        let color = point.color.as_deref().unwrap_or(DEFAULT_COLOR);
        let label = point.label.as_deref().unwrap_or(DEFAULT_LABEL);

        Ok(Self {
            position: Point::new(point.lng, point.lat),
            icon: IconSpec::pin(color),
            label: label.to_string(),
        })
    }
}

fn validate(lat: f64, lng: f64) -> Result<(), PointRejection> {
    if !lat.is_finite() {
        return Err(PointRejection::NonFiniteLatitude);
    }
    if !lng.is_finite() {
        return Err(PointRejection::NonFiniteLongitude);
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(PointRejection::LatitudeOutOfRange(lat));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(PointRejection::LongitudeOutOfRange(lng));
    }
    Ok(())
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkerBatch {
    pub markers: Vec<MarkerSpec>,
    pub rejected: Vec<InvalidPoint>,
}

/// Converts points to markers in input order. Invalid points are set aside
/// in `rejected` and do not affect the rest.
pub fn to_markers(points: &[PointDescriptor]) -> MarkerBatch {
    let mut batch = MarkerBatch::default();

    for (index, point) in points.iter().enumerate() {
        match MarkerSpec::try_from_point(point) {
            Ok(marker) => batch.markers.push(marker),
            Err(reason) => batch.rejected.push(InvalidPoint { index, reason }),
        }
    }

    batch
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointRejection {
    NonFiniteLatitude,
    NonFiniteLongitude,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InvalidPoint {
    /// Position in the caller's list.
    pub index: usize,
    pub reason: PointRejection,
}

impl std::fmt::Display for PointRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointRejection::NonFiniteLatitude => write!(f, "latitude is not finite"),
            PointRejection::NonFiniteLongitude => write!(f, "longitude is not finite"),
            PointRejection::LatitudeOutOfRange(lat) => {
                write!(f, "latitude {} outside [-90, 90]", lat)
            }
            PointRejection::LongitudeOutOfRange(lng) => {
                write!(f, "longitude {} outside [-180, 180]", lng)
            }
        }
    }
}

impl std::fmt::Display for InvalidPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid point #{}: {}", self.index, self.reason)
    }
}

impl std::error::Error for InvalidPoint {}
