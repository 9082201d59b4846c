//! Geographic and time-radial (isochrone) layouts of China's provincial capitals,
//! driven by high-speed-rail travel times from a center city.

pub mod cache;
pub mod cities;
pub mod config;
pub mod gemini;
pub mod isochrone;
pub mod layout;
pub mod projection;
pub mod travel_time;
pub mod utils;
pub mod view;

#[cfg(feature = "python")]
mod python;

pub use cities::{find_city, provincial_capitals, City};
pub use config::Settings;
pub use isochrone::{generate_rings, Ring};
pub use layout::{compute_layout, LayoutNode, ViewMode, TIME_SCALE};
pub use projection::{GeoProjection, Mercator};
pub use travel_time::{TravelTimeProvider, TravelTimes};
pub use view::{FetchTicket, MapView, Scene};
