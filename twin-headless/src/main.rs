use anyhow::{Context, Result};
use clap::Parser;
use seagrass_twin_core::grid::synthetic::reference_bay;
use seagrass_twin_core::optimizer::filter_sites;
use seagrass_twin_core::{GridDataset, Pipeline, PipelineConfig, PipelineRun, SiteFilter};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Seagrass light twin: suitability, refinement, uncertainty and restoration planning
#[derive(Parser, Debug)]
#[command(name = "seagrass-twin")]
#[command(about = "Run the seagrass light twin pipeline", long_about = None)]
struct Args {
    /// Input dataset (JSON written by the pipeline or a data harvester).
    /// Without it the synthetic reference bay is used.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Pipeline configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for artifacts
    #[arg(short, long, default_value = "twin-output")]
    output: PathBuf,

    /// Latitude cells of the synthetic bay
    #[arg(long, default_value_t = 48)]
    lat_cells: usize,

    /// Longitude cells of the synthetic bay
    #[arg(long, default_value_t = 48)]
    lon_cells: usize,

    /// Base seed for the synthetic bay and every stochastic stage
    #[arg(short, long)]
    seed: Option<u64>,

    /// Small forests and a short search
    #[arg(short, long)]
    quick: bool,

    /// Debug logging (overridden by `RUST_LOG`)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if args.quick => PipelineConfig::quick(),
        None => PipelineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let dataset = match &args.input {
        Some(path) => GridDataset::load(path)
            .with_context(|| format!("loading dataset {}", path.display()))?,
        None => {
            let seed = args.seed.unwrap_or(42);
            println!(
                "Using synthetic reference bay ({}x{}, seed {})",
                args.lat_cells, args.lon_cells, seed
            );
            reference_bay(args.lat_cells, args.lon_cells, seed)
                .context("building the reference bay")?
        }
    };

    println!("=== Seagrass Light Twin ===\n");
    let run = Pipeline::new(config)
        .run_to_dir(dataset, &args.output)
        .context("pipeline run failed")?;

    print_summary(&run);
    println!("\nArtifacts written to {}", args.output.display());
    Ok(())
}

fn print_summary(run: &PipelineRun) {
    let report = &run.report;
    println!("Grid: {}x{} cells, SSI defined on {}", report.n_lat, report.n_lon, report.ssi_cells);

    println!("\n--- Predictive refinement ---");
    println!(
        "Training rows: {}  R2: {:.3}  MAE: {:.4}  SSI/SSI_ML r: {:.3}",
        report.refinement.n_train, report.refinement.r2, report.refinement.mae, report.ssi_ml_correlation
    );
    for item in &report.refinement.importance {
        println!("  {:<12} {:.4}", item.feature, item.mean_abs_contribution);
    }

    println!("\n--- Uncertainty ---");
    let cv = &report.uncertainty.cross_validation;
    let folds: Vec<String> = cv.fold_f1.iter().map(|f| format!("{f:.3}")).collect();
    println!("Fold F1: [{}]  mean {:.3}", folds.join(", "), cv.mean_f1);
    println!(
        "Rows: {}  suitable fraction: {:.2}  mean uncertainty: {:.3}",
        report.uncertainty.n_rows, report.uncertainty.positive_fraction, report.uncertainty.mean_uncertainty
    );
    if !report.uncertainty.synthesized_drivers.is_empty() {
        println!("Synthesized drivers: {}", report.uncertainty.synthesized_drivers.join(", "));
    }

    println!("\n--- Restoration ---");
    let restoration = &report.restoration;
    println!(
        "Candidates: {}  front size: {}  compromise: {}",
        restoration.n_candidates,
        restoration.front_size,
        restoration
            .chosen_index
            .map_or_else(|| "none".to_string(), |i| i.to_string())
    );
    let (_, totals) = filter_sites(&run.restoration.sites, &SiteFilter::default());
    println!(
        "Selected sites: {}  total CO2: {:.3}  mean ALAN: {:.3}  mean uncertainty: {:.3}",
        totals.count, totals.total_co2, totals.mean_alan, totals.mean_uncertainty
    );
    println!("\nCompleted in {:.2}s", report.elapsed_seconds);
}
