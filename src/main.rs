use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use mangrove_survey::api::{FirebaseStore, MemoryStore, RemoteStore, TideClient, upload_markers};
use mangrove_survey::config::{FileConfig, MAX_SPACING, MIN_SPACING};
use mangrove_survey::domain::boundary::parse_lat_lon;
use mangrove_survey::domain::tide::format_time;
use mangrove_survey::domain::{
    Boundary, CompassReading, LocationFix, TideExtreme, TideReport, parse_boundary,
};
use mangrove_survey::export::write_geojson;
use mangrove_survey::geometry::{GridShape, LatticeAnchor};
use mangrove_survey::monitor::{CompassStream, LocationStream, Monitor, MonitorOptions, permit};
use mangrove_survey::sensors::ReplaySource;
use mangrove_survey::survey::{Survey, SurveyFeatures};

/// Field survey tool for mangrove and tide mapping
///
/// Examples:
///   # Square grid over a boundary file, written as GeoJSON
///   mangrove grid -b plot.txt -s 0.001 -o plot.geojson
///
///   # Point grid with edges from inline points, anchored to a global lattice
///   mangrove grid -p 10.40,107.10 -p 10.40,107.12 -p 10.42,107.11 --shape point --anchor global
///
///   # Tide extremes for the next 24 hours
///   mangrove tide --lat 10.4 --lon 107.1
///
///   # Replay a recorded walk to the realtime database
///   mangrove monitor --track walk.ndjson --compass compass.ndjson
#[derive(Parser, Debug)]
#[command(name = "mangrove")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (optional, auto-searches mangrove.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decompose a boundary into a covering grid
    Grid(GridArgs),
    /// Fetch tide extremes for a location
    Tide(TideArgs),
    /// Upload boundary markers to the remote store
    Upload(UploadArgs),
    /// Push live location and compass readings to the remote store
    Monitor(MonitorArgs),
}

#[derive(Args, Debug)]
struct BoundaryArgs {
    /// Boundary point as LAT,LON (repeat in drawing order)
    #[arg(short = 'p', long = "point", value_parser = parse_lat_lon, allow_hyphen_values = true)]
    points: Vec<(f64, f64)>,

    /// File with one LAT,LON per line, or a JSON array of {latitude, longitude}
    #[arg(short = 'b', long, conflicts_with = "points")]
    boundary: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GridArgs {
    #[command(flatten)]
    boundary: BoundaryArgs,

    /// Lattice spacing in degrees (0.0001 to 0.01)
    #[arg(short = 's', long, value_parser = parse_spacing)]
    spacing: Option<f64>,

    /// Grid shape: square cells or sample points
    #[arg(long, value_enum)]
    shape: Option<GridShape>,

    /// Lattice alignment: bbox (follows the boundary) or global
    #[arg(long, value_enum)]
    anchor: Option<LatticeAnchor>,

    /// Write the boundary and grid as GeoJSON
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Also upload the boundary markers
    #[arg(long)]
    upload: bool,

    /// Also look up today's tides at the centre of the plot
    #[arg(long)]
    tide: bool,

    /// Use an in-memory store instead of the configured database
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct TideArgs {
    /// Latitude (defaults to [tide].latitude)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude (defaults to [tide].longitude)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
}

#[derive(Args, Debug)]
struct UploadArgs {
    #[command(flatten)]
    boundary: BoundaryArgs,

    /// Use an in-memory store instead of the configured database
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct MonitorArgs {
    /// Recorded location track, one JSON fix per line
    #[arg(long)]
    track: Option<PathBuf>,

    /// Recorded magnetometer samples, one JSON reading per line
    #[arg(long)]
    compass: Option<PathBuf>,

    /// Stop after this many seconds even if the recordings continue
    #[arg(long)]
    duration: Option<u64>,

    /// Pause between replayed readings in milliseconds
    #[arg(long, default_value = "0")]
    pace_ms: u64,

    /// Use an in-memory store instead of the configured database
    #[arg(long)]
    dry_run: bool,
}

fn parse_spacing(s: &str) -> std::result::Result<f64, String> {
    let spacing: f64 = s
        .parse()
        .map_err(|_| format!("invalid spacing '{}'", s))?;
    if !(MIN_SPACING..=MAX_SPACING).contains(&spacing) {
        return Err(format!(
            "spacing must be between {} and {} degrees",
            MIN_SPACING, MAX_SPACING
        ));
    }
    Ok(spacing)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = match cli.config {
        Some(ref path) => FileConfig::from_path(path).context("Failed to load config file")?,
        None => FileConfig::load().unwrap_or_default(),
    };

    init_tracing(cli.verbose || file_config.verbose);

    match cli.command {
        Command::Grid(args) => run_grid(args, &file_config),
        Command::Tide(args) => run_tide(args, &file_config),
        Command::Upload(args) => run_upload(args, &file_config),
        Command::Monitor(args) => run_monitor(args, &file_config),
    }
}

/// Log filter used when `RUST_LOG` is unset
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,mangrove_survey=debug,mangrove=debug"
    } else {
        "info"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_boundary(args: &BoundaryArgs) -> Result<Boundary> {
    let coords = match &args.boundary {
        Some(path) => read_boundary_file(path)?,
        None => args.points.clone(),
    };
    Ok(Boundary::from_coords(coords))
}

fn read_boundary_file(path: &Path) -> Result<Vec<(f64, f64)>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read boundary file: {}", path.display()))?;
    parse_boundary(&contents).with_context(|| format!("Invalid boundary file: {}", path.display()))
}

fn open_store(config: &FileConfig, dry_run: bool) -> Result<Arc<dyn RemoteStore>> {
    if dry_run {
        println!("Dry run: writes go to an in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = FirebaseStore::new(&config.store).context("Failed to set up remote store")?;
    Ok(Arc::new(store))
}

fn run_grid(args: GridArgs, config: &FileConfig) -> Result<()> {
    let mut options = config.grid.options();
    if let Some(spacing) = args.spacing {
        options.spacing = spacing;
    }
    if let Some(shape) = args.shape {
        options.shape = shape;
    }
    if let Some(anchor) = args.anchor {
        options.anchor = anchor;
    }

    let boundary = load_boundary(&args.boundary)?;
    let features = SurveyFeatures {
        upload_markers: args.upload,
        tide_lookup: args.tide,
    };
    let mut survey = Survey::new(options, features);
    for p in boundary.points() {
        survey.add_point(p.latitude, p.longitude);
    }

    if survey.boundary().is_polygon() {
        let spinner = create_spinner("Generating grid...");
        let start = Instant::now();
        let grid = survey
            .generate_grid()
            .context("Failed to generate grid")?
            .clone();
        let result = &grid.result;
        spinner.finish_with_message(format!(
            "Generated {} {} [{:.1}s]",
            result.len(),
            match options.shape {
                GridShape::Square => "cells",
                GridShape::Point => "points",
            },
            start.elapsed().as_secs_f32()
        ));

        println!();
        println!("Markers: {}", survey.boundary().len());
        println!("Grid Size: {:.4} degrees", options.spacing);
        println!("Cell footprint: {:.1}m x {:.1}m", grid.step_m.0, grid.step_m.1);
        if let Some(bounds) = result.bounds() {
            println!(
                "Plot extent: {:.5} x {:.5} degrees ({:.0}m x {:.0}m)",
                bounds.height(),
                bounds.width(),
                grid.extent_m.0,
                grid.extent_m.1
            );
        }
        println!("Polygon Area: {:.2} square meters", grid.area_m2);
        if options.shape == GridShape::Point {
            println!("Grid lines: {}", result.edges().len());
        }

        if let Some(output) = &args.output {
            write_geojson(output, &survey.boundary().coords(), result)
                .context("Failed to write GeoJSON file")?;
            println!("Output: {}", output.display());
        }
    } else {
        println!(
            "Boundary has {} distinct point(s); at least 3 are needed for a grid.",
            survey.boundary().distinct_count()
        );
    }

    if survey.features().tide_lookup {
        let client =
            TideClient::new(config.tide.clone()).context("Failed to set up tide client")?;
        let spinner = create_spinner("Fetching tide data...");
        match survey.lookup_tides(&client) {
            Ok(Some(report)) => {
                spinner.finish_and_clear();
                println!();
                print_tide_report(&report);
            }
            Ok(None) => spinner.finish_with_message("No markers to look up tides for"),
            Err(e) => {
                spinner.finish_and_clear();
                eprintln!("Tide lookup failed: {}", e);
            }
        }
    }

    // Generation is local and already reported; a failed upload only fails the exit status
    if survey.features().upload_markers {
        let store = open_store(config, args.dry_run)?;
        let spinner = create_spinner("Uploading markers...");
        survey
            .publish_markers(store.as_ref())
            .context("Error uploading markers")?;
        spinner.finish_with_message(format!(
            "Markers uploaded successfully! ({} markers)",
            survey.boundary().len()
        ));
    }

    Ok(())
}

fn run_tide(args: TideArgs, config: &FileConfig) -> Result<()> {
    let (lat, lon) = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => match (config.tide.latitude, config.tide.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => bail!("Location not available: pass --lat and --lon or set them under [tide]"),
        },
    };

    let client = TideClient::new(config.tide.clone()).context("Failed to set up tide client")?;

    let spinner = create_spinner("Fetching tide data...");
    let start = Instant::now();
    let report = client.fetch(lat, lon).context("Failed to fetch tide data")?;
    spinner.finish_with_message(format!(
        "Fetched {} tide extremes for ({:.4}, {:.4}) [{:.1}s]",
        report.extremes.len(),
        lat,
        lon,
        start.elapsed().as_secs_f32()
    ));

    println!();
    print_tide_report(&report);

    Ok(())
}

fn print_tide_report(report: &TideReport) {
    println!("{}", report.summary());
    println!();

    let local = chrono::Local;
    let line = |extremes: Vec<&TideExtreme>| {
        extremes
            .iter()
            .map(|t| format!("{}: {} m", format_time(&t.time, &local), t.height))
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("High Tide: {}", line(report.high()));
    println!("Low Tide: {}", line(report.low()));
    if let Some(peak) = report.peak_height() {
        println!("Peak: {} m", peak);
    }
}

fn run_upload(args: UploadArgs, config: &FileConfig) -> Result<()> {
    let boundary = load_boundary(&args.boundary)?;
    let store = open_store(config, args.dry_run)?;

    let spinner = create_spinner("Uploading markers...");
    let start = Instant::now();
    upload_markers(store.as_ref(), &boundary.coordinates()).context("Error uploading markers")?;
    spinner.finish_with_message(format!(
        "Markers uploaded successfully! ({} markers) [{:.1}s]",
        boundary.len(),
        start.elapsed().as_secs_f32()
    ));

    Ok(())
}

fn run_monitor(args: MonitorArgs, config: &FileConfig) -> Result<()> {
    let location: Option<LocationStream> = match &args.track {
        Some(path) => permit(ReplaySource::<LocationFix>::open("location", path))
            .context("Failed to open location track")?
            .map(|s| Box::new(s) as LocationStream),
        None => None,
    };
    let compass: Option<CompassStream> = match &args.compass {
        Some(path) => permit(ReplaySource::<CompassReading>::open("compass", path))
            .context("Failed to open compass recording")?
            .map(|s| Box::new(s) as CompassStream),
        None => None,
    };

    if location.is_none() && compass.is_none() {
        println!("No sensor streams available. Nothing to monitor.");
        return Ok(());
    }

    let store = open_store(config, args.dry_run)?;
    let options = MonitorOptions {
        poll_interval: Duration::from_millis(args.pace_ms),
        ..MonitorOptions::from(&config.monitor)
    };

    let mut monitor =
        Monitor::start(store, location, compass, options).context("Failed to start monitor")?;

    let spinner = create_spinner("Streaming telemetry...");
    let start = Instant::now();
    match args.duration {
        Some(secs) => {
            let limit = Duration::from_secs(secs);
            while !monitor.is_finished() && start.elapsed() < limit {
                std::thread::sleep(Duration::from_millis(100));
            }
            monitor.stop();
        }
        None => monitor.wait(),
    }

    let loc = monitor.location_stats();
    let comp = monitor.compass_stats();
    spinner.finish_with_message(format!(
        "Streamed for {:.1}s",
        start.elapsed().as_secs_f32()
    ));

    println!();
    println!(
        "Location: {} received, {} throttled, {} written, {} failed",
        loc.received, loc.throttled, loc.written, loc.failed
    );
    println!(
        "Compass:  {} received, {} written, {} failed",
        comp.received, comp.written, comp.failed
    );
    if let Some(fix) = monitor.latest_location() {
        println!("Last position: ({:.6}, {:.6})", fix.latitude, fix.longitude);
    }
    if let Some(reading) = monitor.latest_compass() {
        println!(
            "Compass Data: X: {:.2} Y: {:.2} Z: {:.2} (heading {:.0}°)",
            reading.x,
            reading.y,
            reading.z,
            reading.heading_degrees()
        );
    }

    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
