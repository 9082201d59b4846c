use geo::{EuclideanDistance, Point};
use serde::Serialize;

use crate::cities::City;
use crate::projection::GeoProjection;
use crate::travel_time::TravelTimes;

/// Pixels per minute of travel at zoom 1
pub const TIME_SCALE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Geo,
    Time,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Geo => ViewMode::Time,
            ViewMode::Time => ViewMode::Geo,
        }
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "geo" => Ok(ViewMode::Geo),
            "time" => Ok(ViewMode::Time),
            other => Err(format!("unknown view mode '{}', expected geo or time", other)),
        }
    }
}

/// A city with both of its layout positions
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub city: City,
    pub geo: Point<f64>,
    pub time: Point<f64>,
    pub minutes: u32,
    /// Planar distance from the center in the geographic layout
    pub geo_distance: f64,
}

impl LayoutNode {
    pub fn position(&self, mode: ViewMode) -> Point<f64> {
        match mode {
            ViewMode::Geo => self.geo,
            ViewMode::Time => self.time,
        }
    }
}

// Function to place a point `radius` away from `origin` along `angle`
fn polar_offset(origin: Point<f64>, angle: f64, radius: f64) -> Point<f64> {
    Point::new(
        origin.x() + angle.cos() * radius,
        origin.y() + angle.sin() * radius,
    )
}

/// Computes the geographic and time-radial positions of every city.
///
/// The time position keeps the city's bearing from the center in projected space
/// and replaces its distance with `minutes * time_scale * zoom`. Cities the
/// projection rejects are left out; if the center itself cannot be projected
/// the layout is empty.
pub fn compute_layout(
    cities: &[City],
    center: &City,
    travel_times: &TravelTimes,
    projection: &dyn GeoProjection,
    time_scale: f64,
    zoom: f64,
) -> Vec<LayoutNode> {
    let Some(center_pos) = projection.project(center.lng, center.lat) else {
        return Vec::new();
    };

    cities
        .iter()
        .filter_map(|city| {
            let geo = projection.project(city.lng, city.lat)?;
            let is_center = city.name == center.name;
            let minutes = if is_center {
                0
            } else {
                travel_times.get(&city.name).copied().unwrap_or(0)
            };

            let time = if is_center {
                center_pos
            } else {
                let angle = (geo.y() - center_pos.y()).atan2(geo.x() - center_pos.x());
                polar_offset(center_pos, angle, minutes as f64 * time_scale * zoom)
            };

            Some(LayoutNode {
                city: city.clone(),
                geo,
                time,
                minutes,
                geo_distance: geo.euclidean_distance(&center_pos),
            })
        })
        .collect()
}
