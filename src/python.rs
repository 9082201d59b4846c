use pyo3::prelude::*;

use crate::config::Settings;
use crate::layout::ViewMode;
use crate::travel_time::{TravelTimeProvider, TravelTimes};
use crate::view::MapView;

fn runtime_error(err: impl std::fmt::Display) -> PyErr {
    pyo3::PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(err.to_string())
}

fn provider() -> PyResult<TravelTimeProvider> {
    let settings = Settings::load(None).map_err(runtime_error)?;
    Ok(TravelTimeProvider::from_settings(&settings))
}

/// Travel times in minutes from `center` to every city
#[pyfunction]
fn travel_times(center: String) -> PyResult<TravelTimes> {
    if crate::cities::find_city(&center).is_none() {
        return Err(pyo3::PyErr::new::<pyo3::exceptions::PyValueError, _>(
            "Unknown center city",
        ));
    }

    let provider = provider()?;
    let rt = tokio::runtime::Runtime::new().map_err(runtime_error)?;
    Ok(rt.block_on(provider.get_travel_times(&center, crate::cities::provincial_capitals())))
}

/// The map for `center` as a GeoJSON FeatureCollection string
#[pyfunction]
fn scene_geojson(center: String, mode: String, zoom: f64, width: f64, height: f64) -> PyResult<String> {
    let mode_enum: ViewMode = mode
        .parse()
        .map_err(|err: String| pyo3::PyErr::new::<pyo3::exceptions::PyValueError, _>(err))?;

    let mut view = MapView::new(width, height);
    let ticket = match view
        .select_center(&center)
        .map_err(|err| pyo3::PyErr::new::<pyo3::exceptions::PyValueError, _>(err.to_string()))?
    {
        Some(ticket) => ticket,
        None => view.reload(),
    };

    let provider = provider()?;
    let rt = tokio::runtime::Runtime::new().map_err(runtime_error)?;
    rt.block_on(view.refresh(&provider, ticket));

    view.set_mode(mode_enum);
    view.set_zoom(zoom);

    Ok(view.scene().to_geojson().to_string())
}

/// Python module for high-speed-rail isochrone maps
#[pymodule]
fn hsr_isochrone(_py: Python, m: &PyModule) -> pyo3::PyResult<()> {
    m.add_function(wrap_pyfunction!(travel_times, m)?)?;
    m.add_function(wrap_pyfunction!(scene_geojson, m)?)?;
    Ok(())
}
