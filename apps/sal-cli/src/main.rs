use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use sal_app::{
    AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, export_timeline,
    get_run_summary, list_runs, load_project, load_run, validate_project,
};
use sal_cascade::CascadeEvent;
use sal_plant::canonical_pond_name;
use sal_results::RunStore;
use tracing::Level;

#[derive(Parser)]
#[command(name = "salina")]
#[command(about = "Evaporation pond cascade driver for PHREEQC", long_about = None)]
struct Cli {
    /// Workspace root; relative paths in the config resolve against it
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,
    /// Run configuration YAML
    #[arg(short, long, global = true, default_value = "env.yaml")]
    config: PathBuf,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load inputs and check parameters without running the solver
    Validate,
    /// Run the cascade, or reuse a cached run with the same inputs
    Run {
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
        /// Look for a PHREEQC install under this directory if the
        /// configured solver paths do not exist
        #[arg(long)]
        discover: Option<PathBuf>,
    },
    /// List stored runs
    Runs,
    /// Show stages and transfers of a stored run
    ShowRun {
        /// Run id or unique prefix
        run_id: String,
    },
    /// Export one pond's absolute-day timeline as CSV
    ExportTimeline {
        /// Run id or unique prefix
        run_id: String,
        /// Pond name, e.g. "Pond 2" or "pond2"
        pond: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(io::stderr)
        .init();

    let config_path = resolve(&cli.workspace, &cli.config);
    match cli.command {
        Commands::Validate => cmd_validate(&config_path, &cli.workspace),
        Commands::Run { no_cache, discover } => {
            cmd_run(&config_path, &cli.workspace, !no_cache, discover)
        }
        Commands::Runs => cmd_runs(&config_path, &cli.workspace),
        Commands::ShowRun { run_id } => cmd_show_run(&config_path, &cli.workspace, &run_id),
        Commands::ExportTimeline { run_id, pond, out } => {
            cmd_export_timeline(&config_path, &cli.workspace, &run_id, &pond, out.as_deref())
        }
    }
}

fn resolve(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

fn work_dir(config_path: &Path, workspace: &Path) -> AppResult<PathBuf> {
    Ok(load_project(config_path, workspace)?.paths.work_dir)
}

fn cmd_validate(config_path: &Path, workspace: &Path) -> AppResult<()> {
    println!("Validating workspace: {}", config_path.display());
    let project = load_project(config_path, workspace)?;
    let summary = validate_project(&project)?;

    println!("Ponds:");
    for pond in &summary.ponds {
        let capacity = pond
            .capacity_m3
            .map(|c| format!("{c:.1} m3"))
            .unwrap_or_else(|| "uncapped".to_string());
        println!("  {:<8} area {:>9.1} m2  capacity {}", pond.name, pond.area_m2, capacity);
    }
    match (summary.schedule_days, summary.constant_rate) {
        (Some(days), _) => println!("Evaporation: daily schedule, {days} days"),
        (None, Some(rate)) => println!("Evaporation: constant {rate} mol/L/day"),
        (None, None) => println!("Evaporation: none configured"),
    }
    println!(
        "Target mineral: {}  stage length: {} days  max stages: {}  policy: {}",
        summary.target_mineral,
        summary.nsteps_default_days,
        summary.max_stages,
        summary.transfer_policy.label()
    );
    println!("✓ Workspace is valid");
    Ok(())
}

fn cmd_run(
    config_path: &Path,
    workspace: &Path,
    use_cache: bool,
    discover_root: Option<PathBuf>,
) -> AppResult<()> {
    let request = RunRequest {
        config_path,
        workspace,
        options: RunOptions {
            use_cache,
            discover_root,
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = sal_app::ensure_run_with_progress(
        &request,
        Some(&mut |event: RunProgressEvent| {
            let changed = last_stage.as_ref() != Some(&event.stage);
            if changed || event.cascade.is_some() || last_emit.elapsed().as_millis() >= 100 {
                render_cli_progress(&event);
                last_stage = Some(event.stage.clone());
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Cascade completed: {} ({:.2}s)", response.run_id, response.elapsed_s);
    }
    println!("  {}", response.manifest.termination.describe());
    println!("  Stages: {}", response.manifest.stages.len());
    println!("  Transfers: {}", response.manifest.transfers.len());
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.cascade) {
        (RunStage::RunningCascade, Some(CascadeEvent::StageSubmitted { label, absolute_start_day, step_count, .. })) => {
            clear_progress_line();
            print!(
                "\r> {label}  days {absolute_start_day}..{}  elapsed={:.1}s",
                absolute_start_day + step_count,
                event.elapsed_wall_s
            );
        }
        (_, Some(CascadeEvent::TransferApplied { source, destination, allowed_m3, discarded_m3, .. })) => {
            clear_progress_line();
            println!(
                "\r  transfer {source} -> {destination}: {allowed_m3:.1} m3 moved, {discarded_m3:.1} m3 discarded"
            );
        }
        (_, Some(_)) => return,
        (stage, None) => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {msg}"));
            }
            print!("{line}");
        }
    }
    let _ = io::stdout().flush();
}

fn cmd_runs(config_path: &Path, workspace: &Path) -> AppResult<()> {
    let runs = list_runs(&work_dir(config_path, workspace)?)?;

    if runs.is_empty() {
        println!("No stored runs");
    } else {
        println!("Stored runs:");
        for manifest in runs {
            println!(
                "  {} ({})  {} stages  {}",
                manifest.run_id,
                manifest.timestamp,
                manifest.stages.len(),
                manifest.termination.describe()
            );
        }
    }
    Ok(())
}

fn cmd_show_run(config_path: &Path, workspace: &Path, run_id: &str) -> AppResult<()> {
    let work_dir = work_dir(config_path, workspace)?;
    let manifest = load_run(&work_dir, run_id)?;
    let store = RunStore::for_work_dir(&work_dir)?;
    let summary = get_run_summary(&store, &manifest.run_id)?;

    println!("Run {}", summary.run_id);
    println!("  Solver: {}", manifest.solver_version);
    println!("  {}", summary.termination.describe());
    println!("  Simulated days: {}", summary.total_days);

    println!("\nStages:");
    for stage in &manifest.stages {
        let mut line = format!(
            "  {:<14} {:<28} days {:>4}..{:<4}",
            stage.table_id,
            stage.label,
            stage.absolute_start_day,
            stage.absolute_end_day()
        );
        if stage.padded_days > 0 {
            line.push_str(&format!("  padded {}", stage.padded_days));
        }
        if let Some(from) = stage.truncated_from {
            line.push_str(&format!("  truncated from {from}"));
        }
        println!("{line}");
    }

    println!("\nTransfers:");
    for t in &manifest.transfers {
        let extent = if t.extent_check.consistent { "" } else { "  extent mismatch" };
        println!(
            "  {} day {:>4}  {} -> {}  remaining {:.1} m3  moved {:.1} m3  discarded {:.1} m3{extent}",
            t.index, t.absolute_day, t.source, t.destination, t.remaining_m3, t.allowed_m3, t.discarded_m3
        );
    }

    println!("\nPonds:");
    for pond in &summary.ponds {
        println!(
            "  {:<8} days {:>4}..{:<4} {} = {:.4} mol  ({})",
            pond.pond, pond.first_day, pond.last_day, manifest.target_mineral, pond.final_target_moles, pond.description
        );
    }
    Ok(())
}

fn cmd_export_timeline(
    config_path: &Path,
    workspace: &Path,
    run_id: &str,
    pond: &str,
    out: Option<&Path>,
) -> AppResult<()> {
    let store = RunStore::for_work_dir(&work_dir(config_path, workspace)?)?;
    let pond = canonical_pond_name(pond);
    let csv = export_timeline(&store, run_id, &pond, out)?;

    if let Some(path) = out {
        println!(
            "✓ Exported {} rows for {pond} to {}",
            csv.lines().count().saturating_sub(1),
            path.display()
        );
    } else {
        print!("{csv}");
    }
    Ok(())
}
