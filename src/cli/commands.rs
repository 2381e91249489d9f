//! Command implementations for the w2-export CLI
//!
//! Sets up logging and configuration, dispatches to the processor and
//! reports the outcome.

use crate::cli::{Args, Commands, ConvertArgs, DiagnoseArgs, PlanArgs};
use crate::config::{ExportConfig, TimeWindow};
use crate::ingest::discover_input_files;
use crate::models::ExportStats;
use crate::path_key::unique_reduced_keys;
use crate::processor::{convert_text_files_selected, diagnose_text_files, read_paths_file};
use anyhow::{Context, Result};
use colored::*;
use indicatif::HumanDuration;
use tracing::{debug, info};

/// Main command runner
pub async fn run(args: Args) -> Result<ExportStats> {
    setup_logging(&args)?;

    info!("Starting w2-export");
    debug!("Command line arguments: {:?}", args);

    let mut config = load_configuration(&args)?;
    if !args.show_progress() {
        config.show_progress = false;
    }

    match &args.command {
        Commands::Convert(convert) => run_convert(convert, config).await,
        Commands::Diagnose(diagnose) => run_diagnose(diagnose, config).await,
        Commands::Plan(plan) => run_plan(plan, config),
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("w2_export={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load the configuration file, if any
fn load_configuration(args: &Args) -> Result<ExportConfig> {
    match &args.config_file {
        Some(path) => info!("Using config file: {}", path.display()),
        None => debug!("Looking for config file at {:?}", ExportConfig::default_path()),
    }

    let config = ExportConfig::load(args.config_file.as_deref())
        .context("Failed to load configuration")?;
    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

/// Apply convert flags over the loaded configuration
fn apply_convert_overrides(config: &mut ExportConfig, args: &ConvertArgs) {
    if let Some(year) = args.year {
        config.reference_year = Some(year);
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(header_lines) = args.header_lines {
        config.header_lines = header_lines;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    let record = &mut config.record;
    if let Some(watershed) = &args.watershed {
        record.watershed = watershed.clone();
    }
    if let Some(location) = &args.location {
        record.location = location.clone();
    }
    if let Some(parameter) = &args.parameter {
        record.parameter = Some(parameter.clone());
    }
    if let Some(interval_label) = &args.interval_label {
        record.interval_label = interval_label.clone();
    }
    if let Some(version) = &args.version {
        record.version = version.clone();
    }
    if let Some(units) = &args.units {
        record.units = units.clone();
    }
    if let Some(data_type) = &args.data_type {
        record.data_type = data_type.clone();
    }
    if let Some(interval) = args.interval {
        record.interval = interval;
    }

    if let (Some(start), Some(end)) = (&args.start, &args.end) {
        config.time_window = Some(TimeWindow::new(start.clone(), end.clone()));
    }
    if args.dry_run {
        config.dry_run = true;
    }
}

async fn run_convert(args: &ConvertArgs, mut config: ExportConfig) -> Result<ExportStats> {
    apply_convert_overrides(&mut config, args);
    config.validate().context("Invalid configuration")?;

    let files = discover_input_files(&args.inputs).context("Failed to resolve input files")?;
    if files.is_empty() {
        anyhow::bail!("No input files found for {}", args.inputs.join(", "));
    }
    info!("Converting {} input files", files.len());

    if config.dry_run {
        info!("Performing dry run - no files will be created");
    }

    let selection = match &args.paths_file {
        Some(paths_file) => {
            let keys = read_paths_file(paths_file)
                .with_context(|| format!("Failed to read {}", paths_file.display()))?;
            info!("Exporting {} listed paths", keys.len());
            Some(keys)
        }
        None => None,
    };

    let stats = convert_text_files_selected(&files, &config, selection.as_deref())
        .await
        .context("Conversion aborted")?;

    print_summary(&stats, config.dry_run);
    Ok(stats)
}

async fn run_diagnose(args: &DiagnoseArgs, mut config: ExportConfig) -> Result<ExportStats> {
    if let Some(header_lines) = args.header_lines {
        config.header_lines = header_lines;
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }

    let files = discover_input_files(&args.inputs).context("Failed to resolve input files")?;
    if files.is_empty() {
        anyhow::bail!("No input files found for {}", args.inputs.join(", "));
    }

    let diagnoses = diagnose_text_files(&files, &config, args.output_dir.is_some())
        .await
        .context("Diagnosis aborted")?;

    let mut stats = ExportStats::default();
    for diagnosis in diagnoses {
        let identity = diagnosis.path.display().to_string();
        match diagnosis.summary {
            Ok(summary) => {
                let status = if summary.is_regular() {
                    "regular".bright_green()
                } else {
                    "irregular".bright_yellow()
                };
                println!(
                    "{} {} samples, steps {} .. {} (mean {}), {} irregular, {} non-increasing [{}]",
                    identity.bright_cyan(),
                    summary.samples,
                    format_step(summary.min_step),
                    format_step(summary.max_step),
                    format_step(summary.mean_step),
                    summary.irregular_steps,
                    summary.non_increasing_steps,
                    status
                );
                match diagnosis.written {
                    Some(Ok(path)) => stats.record_success(path),
                    Some(Err(e)) => {
                        println!("{} {}", identity.bright_cyan(), e.to_string().bright_red());
                        stats.record_failure(identity, e.to_string());
                    }
                    None => stats.records_succeeded += 1,
                }
            }
            Err(e) => {
                println!("{} {}", identity.bright_cyan(), e.to_string().bright_red());
                stats.record_failure(identity, e.to_string());
            }
        }
    }

    Ok(stats)
}

fn format_step(step: Option<f64>) -> String {
    step.map_or_else(|| "-".to_string(), |s| format!("{:.5}", s))
}

fn run_plan(args: &PlanArgs, config: ExportConfig) -> Result<ExportStats> {
    let output_dir = args.output_dir.clone().unwrap_or(config.output_dir);

    let listed = read_paths_file(&args.paths_file)
        .with_context(|| format!("Failed to read {}", args.paths_file.display()))?;
    let keys = unique_reduced_keys(listed.iter().map(ToString::to_string))
        .context("Failed to reduce record paths")?;

    println!(
        "{} {} listed paths, {} series",
        "Plan:".bright_green().bold(),
        listed.len(),
        keys.len()
    );

    let mut stats = ExportStats::default();
    for key in keys {
        let destination = output_dir.join(key.to_filename());
        println!("  {} -> {}", key.to_string().bright_cyan(), destination.display());
        stats.record_success(destination);
    }

    Ok(stats)
}

/// Print the end-of-run summary
fn print_summary(stats: &ExportStats, dry_run: bool) {
    let title = if dry_run {
        "W2 export dry run complete"
    } else {
        "W2 export complete"
    };

    println!("\n{}", title.bright_green().bold());
    println!(
        "   Records exported: {}",
        stats.records_succeeded.to_string().bright_cyan()
    );

    if stats.records_failed > 0 {
        println!(
            "   {}",
            format!("Records failed: {}", stats.records_failed).bright_red()
        );
        for failure in &stats.failures {
            println!("     {} {}", failure.identity.yellow(), failure.message);
        }
    }

    if !stats.files_written.is_empty() {
        let verb = if dry_run { "Would write" } else { "Wrote" };
        println!("   {} {} files", verb, stats.files_written.len());
    }
    println!("   Elapsed: {}", HumanDuration(stats.elapsed));
}
