//! End-to-end CmmD run: detection (when needed), report parsing, trajectory analysis.
//!
//! Every argument is checked before the first filesystem access, so a bad
//! metric or resolution range never leaves half-written reports behind.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressIterator};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::config::CmmdConfig;
use crate::detection::{detect_communities, CommunityDetector, ResolutionSweep};
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::parser::{list_reports, ReportParser};
use crate::parser::report::DEFAULT_CLUSTER_MARKER;
use crate::trajectory::analyzer::DEFAULT_MINKOWSKI_P;
use crate::trajectory::TrajectoryAnalyzer;
use crate::types::{AnalysisResult, Clustering, EntityId, ReportHandle};
use crate::utils::format_elapsed;

/// Arguments of a full CmmD run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmmdRequest {
    /// Restrict the output to these entities.
    pub nodelist: Option<BTreeSet<EntityId>>,
    pub input_layers: Vec<PathBuf>,
    pub gamma_min: f64,
    pub gamma_max: f64,
    pub gamma_step: f64,
    pub distmethod: String,
    pub n_jobs: usize,
    pub path_to_communities: PathBuf,
    pub minkowski_p: f64,
    pub cluster_marker: String,
    pub artifact_separator: String,
    pub parallel_parsing: bool,
}

impl CmmdRequest {
    pub fn new(
        input_layers: Vec<PathBuf>,
        gamma_min: f64,
        gamma_max: f64,
        gamma_step: f64,
        path_to_communities: impl Into<PathBuf>,
    ) -> Self {
        Self {
            nodelist: None,
            input_layers,
            gamma_min,
            gamma_max,
            gamma_step,
            distmethod: DistanceMetric::Hamming.as_str().to_string(),
            n_jobs: 1,
            path_to_communities: path_to_communities.into(),
            minkowski_p: DEFAULT_MINKOWSKI_P,
            cluster_marker: DEFAULT_CLUSTER_MARKER.to_string(),
            artifact_separator: "_".to_string(),
            parallel_parsing: true,
        }
    }

    pub fn from_config(config: &CmmdConfig, nodelist: Option<BTreeSet<EntityId>>) -> Self {
        let analysis = &config.analysis;
        Self {
            nodelist,
            input_layers: config.detection.layers.clone(),
            gamma_min: config.detection.gamma_min,
            gamma_max: config.detection.gamma_max,
            gamma_step: config.detection.gamma_step,
            distmethod: analysis.distance_metric.as_str().to_string(),
            n_jobs: analysis.worker_count(),
            path_to_communities: config.files.communities_dir.clone(),
            minkowski_p: analysis.minkowski_p,
            cluster_marker: analysis.cluster_marker.clone(),
            artifact_separator: analysis.artifact_separator.clone(),
            parallel_parsing: analysis.parallel_parsing,
        }
    }

    pub fn with_nodelist(mut self, nodelist: BTreeSet<EntityId>) -> Self {
        self.nodelist = Some(nodelist);
        self
    }

    pub fn with_distmethod(mut self, distmethod: impl Into<String>) -> Self {
        self.distmethod = distmethod.into();
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Check every argument; nothing touches the filesystem.
    pub fn validate(&self) -> Result<(ResolutionSweep, AnalysisSettings)> {
        if self.input_layers.is_empty() {
            return Err(Error::config("input_layers must list at least 1 network file"));
        }
        let sweep = ResolutionSweep::new(self.gamma_min, self.gamma_max, self.gamma_step)?;
        if self.path_to_communities.as_os_str().is_empty() {
            return Err(Error::config("path_to_communities must not be empty"));
        }
        let settings = AnalysisSettings {
            metric: self.distmethod.parse()?,
            n_jobs: self.n_jobs,
            minkowski_p: self.minkowski_p,
            cluster_marker: self.cluster_marker.clone(),
            artifact_separator: self.artifact_separator.clone(),
            parallel_parsing: self.parallel_parsing,
        };
        settings.validate()?;
        Ok((sweep, settings))
    }
}

/// Validated knobs of the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub metric: DistanceMetric,
    pub n_jobs: usize,
    pub minkowski_p: f64,
    pub cluster_marker: String,
    pub artifact_separator: String,
    pub parallel_parsing: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Hamming,
            n_jobs: 1,
            minkowski_p: DEFAULT_MINKOWSKI_P,
            cluster_marker: DEFAULT_CLUSTER_MARKER.to_string(),
            artifact_separator: "_".to_string(),
            parallel_parsing: true,
        }
    }
}

impl AnalysisSettings {
    pub fn from_config(config: &CmmdConfig) -> Self {
        let analysis = &config.analysis;
        Self {
            metric: analysis.distance_metric,
            n_jobs: analysis.worker_count(),
            minkowski_p: analysis.minkowski_p,
            cluster_marker: analysis.cluster_marker.clone(),
            artifact_separator: analysis.artifact_separator.clone(),
            parallel_parsing: analysis.parallel_parsing,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_jobs == 0 {
            return Err(Error::config("n_jobs must be a positive number of workers"));
        }
        if !(self.minkowski_p > 0.0) {
            return Err(Error::config(format!("minkowski_p must be positive, got {}", self.minkowski_p)));
        }
        if self.cluster_marker.trim().is_empty() {
            return Err(Error::config("cluster_marker must not be empty"));
        }
        Ok(())
    }
}

/// Run detection for any missing resolution, then analyse the report directory.
pub fn cmmd(request: &CmmdRequest, detector: &dyn CommunityDetector) -> Result<AnalysisResult> {
    cmmd_with_progress(request, detector, &ProgressBar::hidden())
}

pub fn cmmd_with_progress(
    request: &CmmdRequest,
    detector: &dyn CommunityDetector,
    progress: &ProgressBar,
) -> Result<AnalysisResult> {
    let (sweep, settings) = request.validate()?;
    let start = Instant::now();

    info!(
        "CmmD run: {} layers, {} resolutions, metric {}, {} workers",
        request.input_layers.len(), sweep.len(), settings.metric, settings.n_jobs
    );

    progress.reset();
    progress.set_message("community detection");
    let expected =
        detect_communities(detector, &request.input_layers, &sweep, &request.path_to_communities, progress)?;

    let result = run_analysis(
        &request.path_to_communities,
        request.nodelist.as_ref(),
        &settings,
        Some(expected.as_slice()),
        progress,
    )?;

    info!("CmmD run finished in {}", format_elapsed(start.elapsed()));
    Ok(result)
}

/// Analyse a directory that already holds the membership reports.
pub fn analyze_directory(
    dir: &Path,
    nodelist: Option<&BTreeSet<EntityId>>,
    settings: &AnalysisSettings,
) -> Result<AnalysisResult> {
    analyze_directory_with_progress(dir, nodelist, settings, &ProgressBar::hidden())
}

pub fn analyze_directory_with_progress(
    dir: &Path,
    nodelist: Option<&BTreeSet<EntityId>>,
    settings: &AnalysisSettings,
    progress: &ProgressBar,
) -> Result<AnalysisResult> {
    run_analysis(dir, nodelist, settings, None, progress)
}

fn run_analysis(
    dir: &Path,
    nodelist: Option<&BTreeSet<EntityId>>,
    settings: &AnalysisSettings,
    expected: Option<&[ReportHandle]>,
    progress: &ProgressBar,
) -> Result<AnalysisResult> {
    settings.validate()?;
    // Build the worker pool before any report is read.
    let analyzer = TrajectoryAnalyzer::new(settings.metric, settings.n_jobs)?
        .with_minkowski_p(settings.minkowski_p);
    let parser = ReportParser::new(settings.cluster_marker.clone())?;

    if !dir.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("report directory {:?} does not exist", dir),
        )));
    }
    let reports = list_reports(dir, &settings.artifact_separator)?;
    if reports.is_empty() {
        warn!("No membership reports found in {:?}", dir);
    }
    if let Some(expected) = expected {
        let (extra, missing) = sweep_mismatch(&reports, expected);
        if !extra.is_empty() {
            warn!("Reports outside the requested sweep become extra columns: {}", extra.join(", "));
        }
        if !missing.is_empty() {
            warn!("Reports of the requested sweep were not listed: {}", missing.join(", "));
        }
    }

    progress.reset();
    progress.set_message("parsing reports");
    let clusterings = parse_reports(&parser, &reports, settings.parallel_parsing, progress)?;

    progress.reset();
    progress.set_message("pairwise distances");
    analyzer.analyze_with_progress(&clusterings, nodelist, progress)
}

/// File names listed but not produced by the sweep, and produced but not listed.
fn sweep_mismatch(listed: &[ReportHandle], expected: &[ReportHandle]) -> (Vec<String>, Vec<String>) {
    let listed: BTreeSet<String> = listed.iter().map(ReportHandle::file_name).collect();
    let expected: BTreeSet<String> = expected.iter().map(ReportHandle::file_name).collect();
    (
        listed.difference(&expected).cloned().collect(),
        expected.difference(&listed).cloned().collect(),
    )
}

/// Parse reports into clusterings, keeping the order of `reports`.
pub fn parse_reports(
    parser: &ReportParser,
    reports: &[ReportHandle],
    parallel: bool,
    progress: &ProgressBar,
) -> Result<Vec<Clustering>> {
    let start = Instant::now();
    progress.set_length(reports.len() as u64);

    let clusterings = if parallel {
        reports
            .par_iter()
            .progress_with(progress.clone())
            .map(|report| parser.parse_report(report))
            .collect::<std::result::Result<Vec<_>, _>>()?
    } else {
        reports
            .iter()
            .progress_with(progress.clone())
            .map(|report| parser.parse_report(report))
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    info!("Parsed {} reports in {}", clusterings.len(), format_elapsed(start.elapsed()));
    Ok(clusterings)
}

/// Read an allow-list: one entity id per line, blank lines and `#` comments skipped.
pub fn read_nodelist(path: &Path) -> Result<BTreeSet<EntityId>> {
    let content = fs::read_to_string(path)?;
    let nodes: BTreeSet<EntityId> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();
    info!("Loaded {} entities from node list {:?}", nodes.len(), path);
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CmmdRequest {
        CmmdRequest::new(vec![PathBuf::from("layer.tsv")], 0.5, 1.5, 0.5, "/nonexistent/cmmd/reports")
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let (sweep, settings) = request().validate().unwrap();
        assert_eq!(sweep.len(), 3);
        assert_eq!(settings.metric, DistanceMetric::Hamming);
    }

    #[test]
    fn test_validate_rejects_each_bad_argument() {
        let mut r = request();
        r.input_layers.clear();
        assert!(r.validate().unwrap_err().is_config());

        let mut r = request();
        r.gamma_min = 2.0;
        assert!(r.validate().unwrap_err().is_config());

        let mut r = request();
        r.gamma_step = f64::NAN;
        assert!(r.validate().unwrap_err().is_config());

        assert!(request().with_distmethod("manhattan").validate().unwrap_err().is_config());
        assert!(request().with_n_jobs(0).validate().unwrap_err().is_config());

        let mut r = request();
        r.gamma_step = 1e-320;
        assert!(r.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_sweep_mismatch_names_leftover_reports() {
        let handle = |name: &str| ReportHandle::new(PathBuf::from("/reports").join(name), None);
        let listed = vec![handle("0.5.csv"), handle("0.7.csv"), handle("1.0.csv")];
        let expected = vec![handle("0.5.csv"), handle("1.0.csv"), handle("1.5.csv")];

        let (extra, missing) = sweep_mismatch(&listed, &expected);
        assert_eq!(extra, vec!["0.7.csv"]);
        assert_eq!(missing, vec!["1.5.csv"]);
        assert_eq!(sweep_mismatch(&expected, &expected), (vec![], vec![]));
    }

    #[test]
    fn test_read_nodelist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.txt");
        fs::write(&path, "# genes\nTP53\n\n BRCA1 \nTP53\n").unwrap();
        let nodes = read_nodelist(&path).unwrap();
        assert_eq!(nodes.into_iter().collect::<Vec<_>>(), vec!["BRCA1", "TP53"]);
    }
}
