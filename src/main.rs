use anyhow::{Context, Result, bail};
use clap::Parser;
use geo::{Area, BoundingRect, Rect};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use parcelgrid::api::HttpTransport;
use parcelgrid::config::{FileConfig, MAX_PAGE_SIZE};
use parcelgrid::domain::LocalParcel;
use parcelgrid::export::write_geojson;
use parcelgrid::{CancelFlag, ConfigureOptions, IngestOptions, PageProgress, ParcelLoader};

/// Fetch parcel polygons from a municipal open-data API and write them in local grid meters
///
/// Examples:
///   # Fetch a whole dataset
///   parcelgrid -d cadastre -b https://gis.example.org/api -o parcels.geojson
///
///   # Look up one parcel by its global id
///   parcelgrid -d cadastre -b https://gis.example.org/api --target "{0A1B2C3D-...}"
///
///   # Server-side filter, first page only
///   parcelgrid -d cadastre --filter "PNU eq '1111010100'" --single-page
///
///   # Use a config file
///   parcelgrid --config my-settings.toml
#[derive(Parser, Debug)]
#[command(name = "parcelgrid")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches parcelgrid.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset identifier appended to the base URL
    #[arg(short = 'd', long)]
    dataset_id: Option<String>,

    /// API base URL
    #[arg(short = 'b', long)]
    base_url: Option<String>,

    /// API key
    #[arg(long, env = "PARCELGRID_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Server-side filter expression, passed through as `$filter`
    #[arg(long)]
    filter: Option<String>,

    /// Stop once the parcel with this global id is found
    #[arg(short = 't', long)]
    target: Option<String>,

    /// Features per request (capped at 1000)
    #[arg(long)]
    page_size: Option<usize>,

    /// Stop after this many parcels
    #[arg(long)]
    max_features: Option<usize>,

    /// Fetch only the first page
    #[arg(long)]
    single_page: bool,

    /// Output GeoJSON file path (defaults to parcels.geojson)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);
    let total_start = Instant::now();

    let file_config = match args.config {
        Some(ref path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            FileConfig::from_path(path)?
        }
        None => FileConfig::load().unwrap_or_default(),
    };

    let dataset_id = args
        .dataset_id
        .clone()
        .or(file_config.dataset_id.clone())
        .context("No dataset id given; use --dataset-id or set dataset_id in the config file")?;
    let base_url = args
        .base_url
        .clone()
        .or(file_config.base_url.clone())
        .context("No base URL given; use --base-url or set base_url in the config file")?;

    let options = ConfigureOptions {
        dataset_id,
        base_url,
        api_key: args
            .api_key
            .clone()
            .or(file_config.api_key.clone())
            .unwrap_or_default(),
        filter: args.filter.clone().or(file_config.filter.clone()),
        target_global_id: args.target.clone().or(file_config.target_global_id.clone()),
        reset_origin: false,
    };
    let ingest_options = IngestOptions {
        fetch_all: !args.single_page,
        page_size: args.page_size.unwrap_or(file_config.page_size),
        max_features: args.max_features.or(file_config.max_features),
    };
    let output_path = args.output.clone().unwrap_or(file_config.output.clone());

    println!("parcelgrid - Parcel Grid Converter");
    println!("==================================");
    println!();

    let transport =
        HttpTransport::new(&file_config.http).context("Failed to build HTTP client")?;
    let mut loader = ParcelLoader::new(transport);
    loader.configure(&options);

    println!("Source: {}", loader.config().endpoint());
    if let Some(filter) = loader.config().filter() {
        println!("Filter: {}", filter);
    }
    if let Some(target) = loader.config().target_global_id() {
        println!("Target: {}", target);
    }
    if ingest_options.page_size > MAX_PAGE_SIZE {
        println!("Page size capped at {}", MAX_PAGE_SIZE);
    }
    println!();

    let spinner = create_spinner("Fetching parcels...");
    let start = Instant::now();
    let outcome = loader
        .load(
            &ingest_options,
            |p: &PageProgress| {
                spinner.set_message(format!(
                    "Fetched page {} ({} parcels so far)...",
                    p.page, p.matched
                ));
                Ok(())
            },
            &CancelFlag::new(),
        )
        .context("Failed to fetch parcels")?;
    spinner.finish_with_message(format!(
        "Fetched {} parcels in {} pages, {} received, {} skipped ({}) [{:.1}s]",
        outcome.parcels.len(),
        outcome.pages,
        outcome.received,
        outcome.skipped,
        outcome.termination,
        start.elapsed().as_secs_f32()
    ));

    if outcome.parcels.is_empty() {
        bail!("No parcels found. Check the dataset id, filter or target id");
    }

    let spinner = create_spinner("Writing GeoJSON...");
    let start = Instant::now();
    write_geojson(&output_path, &outcome.parcels).context("Failed to write GeoJSON file")?;
    spinner.finish_with_message(format!(
        "Wrote {} [{:.1}s]",
        output_path.display(),
        start.elapsed().as_secs_f32()
    ));

    println!();
    print_summary(&outcome.parcels);
    println!();
    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );

    Ok(())
}

fn print_summary(parcels: &[LocalParcel]) {
    let area: f64 = parcels.iter().map(|p| p.geometry.unsigned_area()).sum();
    println!("Parcels:    {}", parcels.len());
    println!("Total area: {:.1} m²", area);

    if let Some(extent) = extent(parcels) {
        println!(
            "Extent:     x {:.1}..{:.1}, y {:.1}..{:.1} ({:.0}m x {:.0}m)",
            extent.min().x,
            extent.max().x,
            extent.min().y,
            extent.max().y,
            extent.width(),
            extent.height()
        );
    }
}

fn extent(parcels: &[LocalParcel]) -> Option<Rect<f64>> {
    parcels
        .iter()
        .filter_map(|p| p.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
            )
        })
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (_, 0) => Level::WARN,
        (_, 1) => Level::INFO,
        (_, 2) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
