#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the spot coordinate correction job.

use std::path::PathBuf;

use clap::Parser;
use spot_coords_correct::config::{ConfigOverrides, parse_window};
use spot_coords_correct::pipeline::{self, CorrectionError, PipelineOptions};
use spot_coords_correct::{CorrectionConfig, paths, report};
use spot_coords_geocoder::map_search::MapSearchResolver;
use spot_coords_geocoder::service_registry::{builtin_service, load_service};
use spot_coords_models::BoundingWindow;

#[derive(Parser)]
#[command(
    name = "spot_coords",
    about = "Correct stored spot coordinates against map search"
)]
struct Cli {
    /// Spots collection (JSON array) to correct in place
    #[arg(long, env = "SPOT_COORDS_INPUT", default_value = paths::DEFAULT_INPUT)]
    input: PathBuf,
    /// TOML file with run settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// TOML map-search service definition (defaults to the built-in one)
    #[arg(long)]
    service: Option<PathBuf>,
    /// Correct records whose lookup lands further away than this (km)
    #[arg(long)]
    threshold_km: Option<f64>,
    /// Lookups in flight at once; also the batch size
    #[arg(long)]
    concurrency: Option<usize>,
    /// Sleep between batches, in milliseconds
    #[arg(long)]
    batch_delay_ms: Option<u64>,
    /// Sleep after each group of lookups, in milliseconds
    #[arg(long)]
    dispatch_pacing_ms: Option<u64>,
    /// Give up on a single lookup after this many seconds
    #[arg(long)]
    task_timeout_secs: Option<u64>,
    /// Accepted area as `MIN_LAT,MAX_LAT,MIN_LNG,MAX_LNG`
    #[arg(long, value_parser = parse_window, allow_hyphen_values = true)]
    window: Option<BoundingWindow>,
    /// Resolve and report without writing the backup or any output
    #[arg(long)]
    dry_run: bool,
    /// Number of corrections to list in the summary
    #[arg(long, default_value = "10")]
    show: usize,
    /// Also write the full report as JSON to this file
    #[arg(long)]
    report_out: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            threshold_km: self.threshold_km,
            concurrency: self.concurrency,
            batch_delay_ms: self.batch_delay_ms,
            dispatch_pacing_ms: self.dispatch_pacing_ms,
            task_timeout_secs: self.task_timeout_secs,
            window: self.window,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = spot_coords_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CorrectionConfig::load(path)?,
        None => CorrectionConfig::default(),
    };
    config.apply_overrides(&cli.overrides());
    config.validate()?;

    let service = match &cli.service {
        Some(path) => load_service(path)?,
        None => builtin_service(),
    };
    log::info!(
        "Using {} (threshold {} km, concurrency {})",
        service.name,
        config.threshold_km,
        config.concurrency
    );
    let resolver = MapSearchResolver::new(service, config.window)?;

    let options = PipelineOptions {
        input_path: cli.input.clone(),
        config,
        dry_run: cli.dry_run,
    };
    let progress = spot_coords_cli_utils::IndicatifProgress::records_bar(&multi, "Correcting");

    let report = match pipeline::run(&resolver, &options, Some(progress)).await {
        Ok(report) => report,
        Err(CorrectionError::Persist { report, source }) => {
            report::log_report(&report, cli.show);
            log::error!("Results were not saved: {source}");
            return Err(source.into());
        }
        Err(e) => {
            log::error!("{e}");
            return Err(e.into());
        }
    };

    report::log_report(&report, cli.show);

    if let Some(path) = &cli.report_out {
        report::write_json(path, &cli.input, &report)?;
    }

    Ok(())
}
