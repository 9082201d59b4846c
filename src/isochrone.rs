use geo::{LineString, Point, Polygon};
use std::f64::consts::TAU;

// Used when there is no travel-time data yet, so the ring set is never empty
pub const DEFAULT_MAX_MINUTES: u32 = 600;

/// Reference circle at a whole number of hours from the center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub hour: u32,
    pub center: Point<f64>,
    pub radius: f64,
}

impl Ring {
    /// Approximates the circle with `segments` straight edges
    pub fn to_polygon(&self, segments: usize) -> Polygon<f64> {
        let segments = segments.max(3);
        let mut coords: Vec<(f64, f64)> = (0..segments)
            .map(|i| {
                let angle = TAU * i as f64 / segments as f64;
                (
                    self.center.x() + self.radius * angle.cos(),
                    self.center.y() + self.radius * angle.sin(),
                )
            })
            .collect();
        coords.push(coords[0]);
        Polygon::new(LineString::from(coords), vec![])
    }
}

/// Number of whole-hour rings needed to enclose `max_minutes`
pub fn ring_count(max_minutes: u32) -> u32 {
    max_minutes.div_ceil(60)
}

/// Builds one ring per hour from 1 up to the hour enclosing the largest travel time.
pub fn generate_rings<I>(minutes: I, center: Point<f64>, time_scale: f64, zoom: f64) -> Vec<Ring>
where
    I: IntoIterator<Item = u32>,
{
    let max_minutes = match minutes.into_iter().max() {
        Some(max) if max > 0 => max,
        _ => DEFAULT_MAX_MINUTES,
    };

    (1..=ring_count(max_minutes))
        .map(|hour| Ring {
            hour,
            center,
            radius: hour as f64 * 60.0 * time_scale * zoom,
        })
        .collect()
}
