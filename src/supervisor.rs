//! Ring supervisor actions
//!
//! ```text
//! --make-delta:  model + builder files + drive sizes ──▶ reconcile ──▶ ring-delta.yml
//! --report:      ring-delta.yml ──▶ report
//! --rebalance:   ring-delta.yml ──▶ emit ──▶ swift-ring-builder
//! ```
//!
//! `--make-delta --rebalance` writes the delta and reads it back before
//! running any command, so both paths act on exactly what is on disk.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::builder::BuilderState;
use crate::config::{load_drive_configurations, CloudModel, SiteLayout, DEFAULT_ETC};
use crate::controller::{ReconcileOptions, Reconciler, DEFAULT_SIZE_TO_WEIGHT};
use crate::delta::{DeltaFormat, ReportDetail, ReportOptions, RingDelta};
use crate::domain::RingBuilderTool;
use crate::error::{Error, Result};
use crate::migrator::{EmitOptions, ExecutionReport, ExecutorConfig, RingExecutor};
use crate::model::SiteId;

/// `--ring-delta` value meaning standard output
pub const STDOUT_MARKER: &str = "-";

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub etc: PathBuf,
    pub cloud: String,
    pub control_plane: String,
    /// Delta file; `-` writes to standard output
    pub ring_delta: Option<String>,
    pub format: DeltaFormat,
    pub detail: ReportDetail,
    pub report: bool,
    pub dry_run: bool,
    pub make_delta: bool,
    pub rebalance: bool,
    pub limit_ring: Option<String>,
    pub size_to_weight: f64,
    pub weight_step: Option<f64>,
    pub allow_partitions: bool,
    pub stop_on_warnings: bool,
    pub pretend_min_part_hours_passed: bool,
}

impl SupervisorOptions {
    pub fn new(cloud: impl Into<String>, control_plane: impl Into<String>) -> Self {
        Self {
            etc: PathBuf::from(DEFAULT_ETC),
            cloud: cloud.into(),
            control_plane: control_plane.into(),
            ring_delta: None,
            format: DeltaFormat::default(),
            detail: ReportDetail::default(),
            report: false,
            dry_run: false,
            make_delta: false,
            rebalance: false,
            limit_ring: None,
            size_to_weight: DEFAULT_SIZE_TO_WEIGHT,
            weight_step: None,
            allow_partitions: false,
            stop_on_warnings: false,
            pretend_min_part_hours_passed: false,
        }
    }

    pub fn site(&self) -> SiteId {
        SiteId::new(self.cloud.clone(), self.control_plane.clone())
    }

    fn delta_to_stdout(&self) -> bool {
        self.ring_delta.as_deref() == Some(STDOUT_MARKER)
    }

    /// Reject flag combinations that cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.cloud.is_empty() || self.control_plane.is_empty() {
            return Err(Error::Config(
                "Must specify both --cloud and --control-plane".to_string(),
            ));
        }
        if !(self.make_delta || self.report || self.rebalance) {
            return Err(Error::Config(
                "Missing an option to perform some action".to_string(),
            ));
        }
        if self.report && (self.make_delta || self.rebalance) {
            return Err(Error::Config(
                "Do not mix --report with other actions".to_string(),
            ));
        }
        if (self.report || self.rebalance) && self.delta_to_stdout() {
            return Err(Error::Config(
                "--ring-delta - is invalid (read from stdin not supported)".to_string(),
            ));
        }
        if self.size_to_weight <= 0.0 {
            return Err(Error::Config(
                "--size-to-weight must be positive".to_string(),
            ));
        }
        if matches!(self.weight_step, Some(step) if step <= 0.0) {
            return Err(Error::Config("--weight-step must be positive".to_string()));
        }
        Ok(())
    }

    fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            size_to_weight: self.size_to_weight,
            weight_step: self.weight_step,
            allow_partitions: self.allow_partitions,
            stop_on_warnings: self.stop_on_warnings,
        }
    }

    fn report_options(&self) -> ReportOptions {
        ReportOptions {
            limit_ring: self.limit_ring.clone(),
            detail: self.detail,
            size_to_weight: self.size_to_weight,
        }
    }

    fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            limit_ring: self.limit_ring.clone(),
            pretend_min_part_hours_passed: self.pretend_min_part_hours_passed,
        }
    }
}

// =============================================================================
// Run Summary
// =============================================================================

/// What one invocation did
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Model warnings found while making the delta
    pub warnings: Vec<String>,
    /// Present when `--rebalance` ran
    pub execution: Option<ExecutionReport>,
}

// =============================================================================
// Supervisor
// =============================================================================

pub struct RingSupervisor {
    options: SupervisorOptions,
    tool: Arc<dyn RingBuilderTool>,
}

impl RingSupervisor {
    pub fn new(options: SupervisorOptions, tool: Arc<dyn RingBuilderTool>) -> Self {
        Self { options, tool }
    }

    /// Run the requested actions; delta listings, reports and dry-run
    /// commands go to `out`.
    #[instrument(skip_all, fields(cloud = %self.options.cloud, control_plane = %self.options.control_plane))]
    pub async fn run(&self, out: &mut (dyn Write + Send)) -> Result<RunSummary> {
        self.options.validate()?;
        let layout = SiteLayout::discover(&self.options.etc, self.options.site()).await?;
        let delta_file = self.delta_file(&layout);
        let builder_dir = layout.local_paths().builder_dir.clone();
        let mut summary = RunSummary::default();

        if self.options.make_delta {
            let (delta, warnings) = self.make_delta(&layout).await?;
            summary.warnings = warnings;
            match &delta_file {
                Some(path) => self.write_delta(&delta, path).await?,
                None => delta.write_to(&mut *out, self.options.format)?,
            }
        }

        if !(self.options.report || self.options.rebalance) {
            return Ok(summary);
        }
        let path = delta_file.ok_or_else(|| {
            Error::Config("--ring-delta - is invalid (read from stdin not supported)".to_string())
        })?;
        let delta = self.read_delta(&path).await?;

        if self.options.report {
            let report = delta.report(&self.options.report_options());
            writeln!(out, "{}", report.trim_end())?;
        }

        if self.options.rebalance {
            let executor = RingExecutor::new(
                ExecutorConfig {
                    dry_run: self.options.dry_run,
                },
                self.tool.clone(),
            );
            let execution = executor
                .rebalance(&delta, &builder_dir, &self.options.emit_options(), out)
                .await?;
            summary.execution = Some(execution);
        }
        Ok(summary)
    }

    /// `None` means standard output
    fn delta_file(&self, layout: &SiteLayout) -> Option<PathBuf> {
        match self.options.ring_delta.as_deref() {
            Some(STDOUT_MARKER) => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(layout.local_paths().ring_delta.clone()),
        }
    }

    async fn make_delta(&self, layout: &SiteLayout) -> Result<(RingDelta, Vec<String>)> {
        let model = CloudModel::load(layout).await?;
        let builder =
            BuilderState::read(&layout.local_paths().builder_dir, true, self.tool.as_ref()).await?;
        let drives = load_drive_configurations(layout).await?;
        let sites = layout.sites();

        let reconciler = Reconciler {
            site: layout.local(),
            sites: &sites,
            ring_specifications: &model.ring_specifications,
            servers: &model.servers,
            builder: &builder,
            drives: &drives,
        };
        let outcome = reconciler.reconcile(&self.options.reconcile_options())?;
        info!(
            rings = outcome.delta.rings.len(),
            devices = outcome.delta.devices.len(),
            "Made ring delta"
        );
        Ok((outcome.delta, outcome.warnings))
    }

    async fn write_delta(&self, delta: &RingDelta, path: &Path) -> Result<()> {
        let text = delta.dump(self.options.format)?;
        tokio::fs::write(path, text)
            .await
            .map_err(|e| Error::read_file(path, e))?;
        info!(path = %path.display(), "Wrote ring delta");
        Ok(())
    }

    async fn read_delta(&self, path: &Path) -> Result<RingDelta> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::read_file(path, e))?;
        RingDelta::load(&text, self.options.format).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn options() -> SupervisorOptions {
        SupervisorOptions::new("my_cloud", "my_control_plane")
    }

    #[test]
    fn test_an_action_is_required() {
        assert_matches!(options().validate(), Err(Error::Config(msg)) if msg == "Missing an option to perform some action");
    }

    #[test]
    fn test_report_is_exclusive() {
        let mut opts = options();
        opts.report = true;
        assert!(opts.validate().is_ok());
        opts.rebalance = true;
        assert_matches!(opts.validate(), Err(Error::Config(msg)) if msg == "Do not mix --report with other actions");
    }

    #[test]
    fn test_stdout_delta_cannot_be_read() {
        let mut opts = options();
        opts.make_delta = true;
        opts.ring_delta = Some("-".to_string());
        assert!(opts.validate().is_ok());

        opts.rebalance = true;
        assert_matches!(opts.validate(), Err(Error::Config(msg)) if msg.starts_with("--ring-delta -"));
    }

    #[test]
    fn test_site_is_required() {
        let mut opts = SupervisorOptions::new("my_cloud", "");
        opts.make_delta = true;
        assert_matches!(opts.validate(), Err(Error::Config(_)));
    }

    #[test]
    fn test_numeric_flags() {
        let mut opts = options();
        opts.make_delta = true;
        opts.weight_step = Some(0.0);
        assert_matches!(opts.validate(), Err(Error::Config(_)));
        opts.weight_step = Some(10.0);
        opts.size_to_weight = -1.0;
        assert_matches!(opts.validate(), Err(Error::Config(_)));
    }
}
