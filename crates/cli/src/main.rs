//! uhimon CLI - urban heat island analysis from Landsat imagery

mod output;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use uhimon_analysis::{
    analyze, search, AnalysisConfig, AnalysisContext, AnalysisRequest, DateRange,
};
use uhimon_cloud::StacCatalog;
use uhimon_core::BoundingBox;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "uhimon")]
#[command(author, version, about = "Urban heat island analysis from Landsat imagery", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List candidate scenes, best first
    Search {
        #[command(flatten)]
        area: AreaArgs,
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        catalog: CatalogArgs,
    },
    /// Compute LST and NDVI overlays, statistics and UHI magnitude
    Analyze {
        #[command(flatten)]
        area: AreaArgs,
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Output pixel size in degrees
        #[arg(long, env = "UHIMON_RESOLUTION_DEG")]
        resolution: Option<f64>,
        /// Output directory for lst.png, ndvi.png and summary.json
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Print the bounding box around a point
    Bbox {
        /// Center as LAT,LON
        #[arg(long, allow_hyphen_values = true)]
        center: Center,
        /// Half-width of the box in kilometres
        #[arg(long, default_value = "5.0")]
        buffer_km: f64,
    },
}

#[derive(Args)]
struct AreaArgs {
    /// Bounding box as WEST,SOUTH,EAST,NORTH
    #[arg(long, allow_hyphen_values = true, conflicts_with = "center", required_unless_present = "center")]
    bbox: Option<BoundingBox>,
    /// Center as LAT,LON, expanded by --buffer-km
    #[arg(long, allow_hyphen_values = true)]
    center: Option<Center>,
    /// Half-width of the box around --center in kilometres
    #[arg(long, default_value = "5.0")]
    buffer_km: f64,
}

impl AreaArgs {
    fn resolve(&self) -> Result<BoundingBox> {
        match (&self.bbox, &self.center) {
            (Some(bbox), _) => Ok(*bbox),
            (None, Some(c)) => BoundingBox::around(c.lat, c.lon, self.buffer_km)
                .context("Invalid area around center"),
            (None, None) => anyhow::bail!("Either --bbox or --center is required"),
        }
    }
}

#[derive(Args)]
struct PeriodArgs {
    /// First acquisition day, YYYY-MM-DD
    #[arg(long)]
    start: String,
    /// Last acquisition day, YYYY-MM-DD (inclusive)
    #[arg(long)]
    end: String,
    /// Maximum scene cloud cover in percent
    #[arg(long, default_value_t = AnalysisRequest::DEFAULT_MAX_CLOUD_COVER)]
    max_cloud: f64,
}

#[derive(Args)]
struct CatalogArgs {
    /// STAC catalog: pc, es, or a STAC API URL
    #[arg(long, env = "UHIMON_CATALOG")]
    catalog: Option<String>,
    /// Overall deadline in seconds
    #[arg(long, env = "UHIMON_DEADLINE_SECS")]
    deadline: Option<u64>,
}

/// `LAT,LON` in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Center {
    lat: f64,
    lon: f64,
}

impl FromStr for Center {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LON, got '{s}'"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("'{}': {e}", v.trim()))
        };
        Ok(Self {
            lat: parse(lat)?,
            lon: parse(lon)?,
        })
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_env("UHIMON_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn build_config(catalog: &CatalogArgs, resolution: Option<f64>) -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::from_env().context("Invalid UHIMON_* configuration")?;
    if let Some(name) = &catalog.catalog {
        config.catalog = match name.parse::<StacCatalog>() {
            Ok(c) => c,
            Err(never) => match never {},
        };
    }
    if let Some(secs) = catalog.deadline {
        anyhow::ensure!(secs > 0, "--deadline must be positive");
        config.deadline = Duration::from_secs(secs);
    }
    if let Some(res) = resolution {
        anyhow::ensure!(res.is_finite() && res > 0.0, "--resolution must be positive");
        config.resolution_deg = res;
    }
    Ok(config)
}

fn build_request(area: &AreaArgs, period: &PeriodArgs) -> Result<AnalysisRequest> {
    let dates = DateRange::parse(&period.start, &period.end)?;
    Ok(AnalysisRequest::new(area.resolve()?, dates, period.max_cloud)?)
}

// ─── Main ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Search {
            area,
            period,
            catalog,
        } => {
            let request = build_request(&area, &period)?;
            let ctx = AnalysisContext::from_config(build_config(&catalog, None)?)?;

            let pb = spinner("Searching catalog...");
            let candidates = search(&ctx, &request).await;
            pb.finish_and_clear();
            let candidates = candidates.context("Scene search failed")?;

            if candidates.is_empty() {
                println!(
                    "No scenes over {} between {} with cloud cover <= {}%",
                    request.bbox(),
                    request.dates(),
                    request.max_cloud_cover()
                );
                return Ok(());
            }
            println!("{:<2}{:<44}{:<12}{:>8}", "", "Scene", "Date", "Cloud %");
            for (i, scene) in candidates.iter().enumerate() {
                let marker = if i == 0 { "*" } else { " " };
                println!(
                    "{:<2}{:<44}{:<12}{:>8.2}",
                    marker,
                    scene.id,
                    scene.acquired.date_naive(),
                    scene.cloud_cover
                );
            }
            println!("\n{} candidate(s); * = selected", candidates.len());
        }

        Commands::Analyze {
            area,
            period,
            catalog,
            resolution,
            out,
        } => {
            let request = build_request(&area, &period)?;
            let ctx = AnalysisContext::from_config(build_config(&catalog, resolution)?)?;
            info!("Area: {}  Period: {}", request.bbox(), request.dates());

            let start = Instant::now();
            let pb = spinner("Searching, loading bands and processing...");
            let result = analyze(&ctx, &request).await;
            pb.finish_and_clear();
            let result = result.context("Analysis failed")?;

            let written = output::write_outputs(&out, &result)?;
            println!(
                "Scene: {} ({}, cloud {:.2}%)",
                result.scene.id, result.scene.date, result.scene.cloud_cover
            );
            for (name, grid) in [("LST (°C)", &result.lst), ("NDVI", &result.ndvi)] {
                let s = &grid.statistics;
                println!(
                    "  {:<9} min {:>8.3}  mean {:>8.3}  max {:>8.3}  std {:>7.3}  valid {}",
                    name, s.min, s.mean, s.max, s.std, s.valid_count
                );
            }
            match result.correlation {
                Some(r) => println!("  LST/NDVI correlation: {:.3}", r),
                None => println!("  LST/NDVI correlation: undefined"),
            }
            println!("  UHI magnitude: {:.2} °C", result.uhi_magnitude);
            println!("  Note: {}", result.uhi_note);
            for path in written {
                println!("Saved: {}", path.display());
            }
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Bbox { center, buffer_km } => {
            let bbox = BoundingBox::around(center.lat, center.lon, buffer_km)?;
            println!("{}", bbox);
            let [[s, w], [n, e]] = bbox.to_leaflet();
            println!("Leaflet bounds: [[{s}, {w}], [{n}, {e}]]");
        }
    }

    Ok(())
}
