use geo::{Point, Polygon};
use geojson::{Feature, Geometry, JsonObject, Value};

use crate::cities::City;

// Average high-speed-rail speed and fixed station overhead used for estimates
pub const FALLBACK_SPEED_KPH: f64 = 250.0;
pub const FALLBACK_OVERHEAD_MIN: f64 = 30.0;
// Below this distance two cities count as the same place
pub const SAME_PLACE_KM: f64 = 10.0;

pub fn calculate_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let radius_earth = 6371.0; // Radius of the Earth in kilometers

    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (dlat / 2.0).sin().powi(2) + (dlon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    radius_earth * c
}

/// Synthetic travel time in minutes for a great-circle distance
pub fn minutes_for_distance(distance_km: f64) -> u32 {
    if !distance_km.is_finite() || distance_km < SAME_PLACE_KM {
        return 0;
    }
    (distance_km / FALLBACK_SPEED_KPH * 60.0 + FALLBACK_OVERHEAD_MIN).round() as u32
}

/// Distance-based travel time estimate, used wherever real data is missing
pub fn estimate_travel_time(center: &City, target: &City) -> u32 {
    if center.name == target.name {
        return 0;
    }
    let distance = calculate_distance_km(center.lat, center.lng, target.lat, target.lng);
    minutes_for_distance(distance)
}

pub fn point_to_feature(point: Point<f64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![point.x(), point.y()]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn polygon_to_feature(polygon: &Polygon<f64>, properties: JsonObject) -> Feature {
    let exterior_coords = polygon
        .exterior()
        .0
        .iter()
        .map(|coord| vec![coord.x, coord.y])
        .collect::<Vec<_>>();

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(vec![exterior_coords]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
