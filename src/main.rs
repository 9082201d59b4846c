use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hsr_isochrone::cities::DEFAULT_CENTER;
use hsr_isochrone::{provincial_capitals, MapView, Settings, TravelTimeProvider, ViewMode};

/// Prints the high-speed-rail isochrone map of a center city as GeoJSON
#[derive(Debug, Parser)]
#[command(name = "hsr-isochrone", version)]
struct Args {
    /// Center city the travel times are measured from
    #[arg(long, default_value = DEFAULT_CENTER)]
    center: String,

    /// Layout to print: geo or time
    #[arg(long, default_value = "time")]
    mode: ViewMode,

    /// Zoom steps to apply; negative values zoom out
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    zoom_steps: i32,

    #[arg(long, default_value_t = 800.0)]
    width: f64,

    #[arg(long, default_value_t = 600.0)]
    height: f64,

    /// Config file; `hsr_isochrone.toml` is read when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the known cities and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list {
        for city in provincial_capitals() {
            println!("{}\t{:.4}\t{:.4}", city.name, city.lat, city.lng);
        }
        return Ok(());
    }

    let settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    let provider = TravelTimeProvider::from_settings(&settings);

    let mut view = MapView::new(args.width, args.height);
    let ticket = match view.select_center(&args.center)? {
        Some(ticket) => ticket,
        None => view.reload(),
    };
    view.refresh(&provider, ticket).await;
    info!(
        center = %view.center().name,
        cities = view.travel_times().len(),
        queried = provider.has_query_client(),
        "travel times ready"
    );

    view.set_mode(args.mode);
    for _ in 0..args.zoom_steps.unsigned_abs() {
        if args.zoom_steps > 0 {
            view.zoom_in();
        } else {
            view.zoom_out();
        }
    }

    println!("{}", view.scene().to_geojson());
    Ok(())
}
