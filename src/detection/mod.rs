pub mod sweep;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use indicatif::ProgressBar;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::types::ReportHandle;

pub use self::sweep::{format_resolution, parse_resolution, report_file_name, ResolutionSweep};

pub const DEFAULT_DETECTION_TOOL: &str = "molti-console";

/// External multiplex community-detection tool.
///
/// One call writes exactly one membership report for one resolution. The call
/// either succeeds with the report on disk or fails; there is no partial output.
pub trait CommunityDetector: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, layers: &[PathBuf], resolution: f64, destination: &Path) -> Result<()>;
}

/// Runs the MolTi console binary as a child process.
#[derive(Debug, Clone)]
pub struct MoltiDetector {
    binary: String,
}

impl Default for MoltiDetector {
    fn default() -> Self {
        Self { binary: DEFAULT_DETECTION_TOOL.to_string() }
    }
}

impl MoltiDetector {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl CommunityDetector for MoltiDetector {
    fn name(&self) -> &str {
        &self.binary
    }

    fn detect(&self, layers: &[PathBuf], resolution: f64, destination: &Path) -> Result<()> {
        let status = Command::new(&self.binary)
            .arg("-o")
            .arg(destination)
            .arg("-p")
            .arg(format_resolution(resolution))
            .args(layers)
            .stdout(Stdio::null())
            .status()
            .map_err(|e| Error::detection(format!("Failed to launch {}: {}", self.binary, e)))?;

        if !status.success() {
            return Err(Error::detection(format!(
                "{} exited with {} at resolution {}", self.binary, status, format_resolution(resolution)
            )));
        }
        if !destination.exists() {
            return Err(Error::detection(format!(
                "{} reported success but wrote no report at {:?}", self.binary, destination
            )));
        }
        Ok(())
    }
}

/// Make sure `dir` holds one report per resolution of the sweep.
///
/// A resolution whose report already exists is never regenerated, so re-running
/// against a populated directory costs nothing.
pub fn detect_communities(
    detector: &dyn CommunityDetector,
    layers: &[PathBuf],
    sweep: &ResolutionSweep,
    dir: &Path,
    progress: &ProgressBar,
) -> Result<Vec<ReportHandle>> {
    if layers.is_empty() {
        return Err(Error::config("At least one network layer is required"));
    }
    fs::create_dir_all(dir)?;

    let resolutions = sweep.values();
    progress.set_length(resolutions.len() as u64);

    let start = Instant::now();
    let mut generated = 0usize;
    let mut handles = Vec::with_capacity(resolutions.len());

    for resolution in resolutions {
        let destination = dir.join(report_file_name(resolution));
        if destination.exists() {
            debug!("Report for resolution {} already present, skipping", format_resolution(resolution));
        } else {
            progress.set_message(format!("gamma = {}", format_resolution(resolution)));
            debug!("Running {} at resolution {}", detector.name(), format_resolution(resolution));
            detector.detect(layers, resolution, &destination)?;
            generated += 1;
        }
        handles.push(ReportHandle::new(destination, Some(resolution)));
        progress.inc(1);
    }

    info!(
        "Community detection: {} reports generated, {} reused ({})",
        generated,
        handles.len() - generated,
        crate::utils::format_elapsed(start.elapsed())
    );
    Ok(handles)
}
