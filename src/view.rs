use geo::Point;
use geojson::{FeatureCollection, GeoJson, JsonObject};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::cities::{find_city, provincial_capitals, City, DEFAULT_CENTER};
use crate::isochrone::{generate_rings, Ring};
use crate::layout::{compute_layout, LayoutNode, ViewMode, TIME_SCALE};
use crate::projection::Mercator;
use crate::travel_time::{TravelTimeProvider, TravelTimes};
use crate::utils::{point_to_feature, polygon_to_feature};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 5.0;
pub const ZOOM_STEP: f64 = 1.2;
// Edges used when exporting a ring as a polygon
const RING_SEGMENTS: usize = 96;

#[derive(Debug, Error, PartialEq)]
pub enum ViewError {
    #[error("unknown city: {0}")]
    UnknownCity(String),
}

/// Handed out when a new center is selected; results are only applied while
/// the ticket is still current
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub center: String,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone)]
pub struct Scene {
    pub center: String,
    pub mode: ViewMode,
    pub loading: bool,
    pub nodes: Vec<LayoutNode>,
    pub rings: Vec<Ring>,
}

impl Scene {
    pub fn position(&self, node: &LayoutNode) -> Point<f64> {
        node.position(self.mode)
    }

    /// Rings only mean something in the time layout
    pub fn rings_visible(&self) -> bool {
        self.mode == ViewMode::Time
    }

    /// Nodes at their active positions plus, in the time layout, the rings.
    ///
    /// Geometries are in layout-plane pixels, not WGS84 lon/lat; the collection
    /// says so with a `"coordinates": "layout"` member.
    pub fn to_geojson(&self) -> GeoJson {
        let mut features = Vec::with_capacity(self.nodes.len() + self.rings.len());

        for node in &self.nodes {
            let mut properties = JsonObject::new();
            properties.insert("kind".into(), json!("city"));
            properties.insert("name".into(), json!(node.city.name));
            properties.insert("minutes".into(), json!(node.minutes));
            properties.insert("is_center".into(), json!(node.city.name == self.center));
            properties.insert("geo_distance".into(), json!(node.geo_distance));
            features.push(point_to_feature(self.position(node), properties));
        }

        if self.rings_visible() {
            for ring in &self.rings {
                let mut properties = JsonObject::new();
                properties.insert("kind".into(), json!("isochrone"));
                properties.insert("hour".into(), json!(ring.hour));
                properties.insert("radius".into(), json!(ring.radius));
                features.push(polygon_to_feature(&ring.to_polygon(RING_SEGMENTS), properties));
            }
        }

        let mut foreign_members = JsonObject::new();
        foreign_members.insert("coordinates".into(), json!("layout"));
        foreign_members.insert("center".into(), json!(self.center));
        foreign_members.insert("mode".into(), json!(self.mode));
        foreign_members.insert("loading".into(), json!(self.loading));

        GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        })
    }
}

/// Center city, layout mode and zoom of the map
pub struct MapView {
    cities: Vec<City>,
    center: City,
    mode: ViewMode,
    zoom: f64,
    width: f64,
    height: f64,
    loading: bool,
    travel_times: TravelTimes,
    generation: u64,
}

impl MapView {
    pub fn new(width: f64, height: f64) -> Self {
        let cities = provincial_capitals().to_vec();
        let center = find_city(DEFAULT_CENTER)
            .cloned()
            .unwrap_or_else(|| cities[0].clone());
        Self::with_cities(cities, center, width, height)
    }

    pub fn with_cities(cities: Vec<City>, center: City, width: f64, height: f64) -> Self {
        Self {
            cities,
            center,
            mode: ViewMode::Geo,
            zoom: 1.0,
            width,
            height,
            loading: false,
            travel_times: TravelTimes::new(),
            generation: 0,
        }
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn center(&self) -> &City {
        &self.center
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn travel_times(&self) -> &TravelTimes {
        &self.travel_times
    }

    /// Ticket for (re)loading the current center, e.g. on startup
    pub fn reload(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        FetchTicket {
            generation: self.generation,
            center: self.center.name.clone(),
        }
    }

    /// Switches the center city. Returns the ticket for the fetch the caller
    /// must run, or `None` when the center did not change. The layout falls
    /// back to the geographic view so the new center is seen in context.
    pub fn select_center(&mut self, name: &str) -> Result<Option<FetchTicket>, ViewError> {
        let city = self
            .cities
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| ViewError::UnknownCity(name.to_string()))?;

        if city.name == self.center.name {
            return Ok(None);
        }

        self.center = city;
        self.mode = ViewMode::Geo;
        // Times measured from the previous center mean nothing for the new one
        self.travel_times.clear();
        Ok(Some(self.reload()))
    }

    /// Stores fetched travel times unless the center moved on since the
    /// ticket was issued. Returns whether the data was applied.
    pub fn apply_travel_times(&mut self, ticket: &FetchTicket, travel_times: TravelTimes) -> bool {
        if ticket.generation != self.generation {
            debug!(
                stale = %ticket.center,
                current = %self.center.name,
                "discarding stale travel times"
            );
            return false;
        }
        self.travel_times = travel_times;
        self.loading = false;
        true
    }

    /// Runs the fetch for `ticket` and applies it
    pub async fn refresh(&mut self, provider: &TravelTimeProvider, ticket: FetchTicket) -> bool {
        let data = provider.get_travel_times(&ticket.center, &self.cities).await;
        self.apply_travel_times(&ticket, data)
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Jumps straight to a zoom level, clamped like the step actions
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn layout(&self) -> Vec<LayoutNode> {
        let projection = Mercator::for_viewport(self.width, self.height, self.zoom);
        compute_layout(
            &self.cities,
            &self.center,
            &self.travel_times,
            &projection,
            TIME_SCALE,
            self.zoom,
        )
    }

    fn rings_for(&self, nodes: &[LayoutNode]) -> Vec<Ring> {
        let Some(center) = nodes.iter().find(|n| n.city.name == self.center.name) else {
            return Vec::new();
        };
        generate_rings(
            nodes.iter().map(|n| n.minutes),
            center.position(self.mode),
            TIME_SCALE,
            self.zoom,
        )
    }

    pub fn rings(&self) -> Vec<Ring> {
        self.rings_for(&self.layout())
    }

    pub fn scene(&self) -> Scene {
        let nodes = self.layout();
        let rings = self.rings_for(&nodes);
        Scene {
            center: self.center.name.clone(),
            mode: self.mode,
            loading: self.loading,
            nodes,
            rings,
        }
    }
}
