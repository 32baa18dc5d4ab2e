//! Swift Ring Supervisor
//!
//! Builds and rebalances the Swift rings of one control plane.
//!
//! ```text
//! swiftlm-ring-supervisor --cloud C --control-plane P --make-delta
//! swiftlm-ring-supervisor --cloud C --control-plane P --report [--detail full]
//! swiftlm-ring-supervisor --cloud C --control-plane P --rebalance [--dry-run]
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use swiftlm::config::DEFAULT_ETC;
use swiftlm::controller::DEFAULT_SIZE_TO_WEIGHT;
use swiftlm::domain::RING_BUILDER_PROGRAM;
use swiftlm::{DeltaFormat, ReportDetail, RingSupervisor, SupervisorOptions, SwiftRingBuilderCli};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Swift ring supervisor - reconcile the cloud model with the Swift rings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration root (one directory per cloud and control plane)
    #[arg(long, env = "SWIFTLM_ETC", default_value = DEFAULT_ETC)]
    etc: PathBuf,

    /// Name of the cloud
    #[arg(long, env = "SWIFTLM_CLOUD")]
    cloud: String,

    /// Name of the control plane
    #[arg(long, env = "SWIFTLM_CONTROL_PLANE")]
    control_plane: String,

    /// Ring delta file (output of --make-delta, input otherwise); "-" writes to stdout
    #[arg(long)]
    ring_delta: Option<String>,

    /// Ring delta file format (yaml or json)
    #[arg(long, default_value = "yaml")]
    format: DeltaFormat,

    /// Level of detail of --report (summary or full)
    #[arg(long, default_value = "summary")]
    detail: ReportDetail,

    /// Explain what the ring delta represents
    #[arg(long)]
    report: bool,

    /// Show the proposed swift-ring-builder commands
    #[arg(long)]
    dry_run: bool,

    /// Make a ring delta file
    #[arg(long)]
    make_delta: bool,

    /// Build (or rebalance) rings
    #[arg(long)]
    rebalance: bool,

    /// Run pretend_min_part_hours_passed on each existing ring before rebalancing
    #[arg(long)]
    pretend_min_part_hours_passed: bool,

    /// Limit actions to this ring
    #[arg(long)]
    limit_ring: Option<String>,

    /// Bytes per unit of weight (default: 1GiB has a weight of 1)
    #[arg(long, default_value_t = DEFAULT_SIZE_TO_WEIGHT)]
    size_to_weight: f64,

    /// Change weights by at most this much; overrides the ring specification
    #[arg(long)]
    weight_step: Option<f64>,

    /// Allow devices on drives split into several partitions
    #[arg(long)]
    allow_partitions: bool,

    /// With --make-delta, fail on model mismatch warnings too
    #[arg(long)]
    stop_on_warnings: bool,

    /// Ring builder program
    #[arg(long, env = "SWIFTLM_RING_BUILDER", default_value = RING_BUILDER_PROGRAM)]
    ring_builder: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            etc: self.etc.clone(),
            cloud: self.cloud.clone(),
            control_plane: self.control_plane.clone(),
            ring_delta: self.ring_delta.clone(),
            format: self.format,
            detail: self.detail,
            report: self.report,
            dry_run: self.dry_run,
            make_delta: self.make_delta,
            rebalance: self.rebalance,
            limit_ring: self.limit_ring.clone(),
            size_to_weight: self.size_to_weight,
            weight_step: self.weight_step,
            allow_partitions: self.allow_partitions,
            stop_on_warnings: self.stop_on_warnings,
            pretend_min_part_hours_passed: self.pretend_min_part_hours_passed,
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let options = args.supervisor_options();
    info!(
        cloud = %options.cloud,
        control_plane = %options.control_plane,
        etc = %options.etc.display(),
        "Starting ring supervisor"
    );
    debug!(?options, "Supervisor options");

    let tool = Arc::new(SwiftRingBuilderCli::with_program(&args.ring_builder));
    let supervisor = RingSupervisor::new(options, tool);

    let mut stdout = std::io::stdout();
    let summary = supervisor.run(&mut stdout).await?;
    stdout.flush().context("Cannot write to standard output")?;

    if !summary.warnings.is_empty() {
        info!(warnings = summary.warnings.len(), "Ring delta made with model warnings");
    }
    if let Some(execution) = &summary.execution {
        info!(
            commands = execution.commands.len(),
            warnings = execution.soft_failures(),
            "Ring commands finished"
        );
    }
    Ok(())
}

// =============================================================================
// Logging
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
