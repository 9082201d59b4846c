use geo::Point;
use std::f64::consts::FRAC_PI_4;

// Rough geographic center of the covered region (lng, lat)
pub const REGION_CENTER: (f64, f64) = (105.0, 38.0);
// Fraction of the canvas width used as the Mercator scale at zoom 1
pub const SCALE_PER_WIDTH: f64 = 0.8;

/// Maps geographic coordinates onto the layout plane
pub trait GeoProjection {
    /// `None` when the coordinate has no finite planar image
    fn project(&self, lng: f64, lat: f64) -> Option<Point<f64>>;
}

/// Spherical Mercator with y growing downwards, the way screen coordinates do
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mercator {
    /// (lng, lat) placed at `translate`
    pub center: (f64, f64),
    /// Pixels per radian
    pub scale: f64,
    pub translate: (f64, f64),
}

impl Mercator {
    pub fn new(center: (f64, f64), scale: f64, translate: (f64, f64)) -> Self {
        Self {
            center,
            scale,
            translate,
        }
    }

    /// Projection for a canvas of `width` x `height` at the given zoom
    pub fn for_viewport(width: f64, height: f64, zoom: f64) -> Self {
        Self::new(
            REGION_CENTER,
            width * SCALE_PER_WIDTH * zoom,
            (width / 2.0, height / 2.0),
        )
    }
}

fn mercator_y(lat: f64) -> f64 {
    (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln()
}

impl GeoProjection for Mercator {
    fn project(&self, lng: f64, lat: f64) -> Option<Point<f64>> {
        if !lng.is_finite() || !lat.is_finite() || lat.abs() >= 90.0 {
            return None;
        }
        let (center_lng, center_lat) = self.center;
        let x = self.translate.0 + self.scale * (lng - center_lng).to_radians();
        let y = self.translate.1 - self.scale * (mercator_y(lat) - mercator_y(center_lat));

        if x.is_finite() && y.is_finite() {
            Some(Point::new(x, y))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_center_lands_on_canvas_center() {
        let projection = Mercator::for_viewport(800.0, 600.0, 1.0);
        let p = projection.project(105.0, 38.0).unwrap();
        assert!((p.x() - 400.0).abs() < 1e-9);
        assert!((p.y() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn north_is_up_and_east_is_right() {
        let projection = Mercator::for_viewport(800.0, 600.0, 1.0);
        let center = projection.project(105.0, 38.0).unwrap();
        let north_east = projection.project(110.0, 42.0).unwrap();
        assert!(north_east.x() > center.x());
        assert!(north_east.y() < center.y());
    }

    #[test]
    fn poles_and_nan_do_not_project() {
        let projection = Mercator::for_viewport(800.0, 600.0, 1.0);
        assert!(projection.project(0.0, 90.0).is_none());
        assert!(projection.project(0.0, -90.0).is_none());
        assert!(projection.project(f64::NAN, 10.0).is_none());
    }

    #[test]
    fn zoom_scales_offsets_from_canvas_center() {
        let one = Mercator::for_viewport(800.0, 600.0, 1.0);
        let two = Mercator::for_viewport(800.0, 600.0, 2.0);
        let a = one.project(121.47, 31.23).unwrap();
        let b = two.project(121.47, 31.23).unwrap();
        assert!(((b.x() - 400.0) - 2.0 * (a.x() - 400.0)).abs() < 1e-9);
        assert!(((b.y() - 300.0) - 2.0 * (a.y() - 300.0)).abs() < 1e-9);
    }
}
