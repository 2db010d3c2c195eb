// src/config/subsystems/analysis.rs

use serde::{Serialize, Deserialize};
use log::LevelFilter;
use crate::error::{Error, Result};
use crate::config::FromIni;
use crate::distance::DistanceMetric;
use crate::parser::report::DEFAULT_CLUSTER_MARKER;
use crate::trajectory::analyzer::DEFAULT_MINKOWSKI_P;
use crate::utils::parse_log_level;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub distance_metric: DistanceMetric,
    /// Distance workers; 0 uses every available core.
    pub n_jobs: usize,
    pub minkowski_p: f64,
    /// Token that marks the first line of a cluster block.
    pub cluster_marker: String,
    /// Report names containing this are secondary artifacts and skipped.
    pub artifact_separator: String,
    pub parallel_parsing: bool,
    pub log_level: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            distance_metric: DistanceMetric::Hamming,
            n_jobs: 1,
            minkowski_p: DEFAULT_MINKOWSKI_P,
            cluster_marker: DEFAULT_CLUSTER_MARKER.to_string(),
            artifact_separator: "_".to_string(),
            parallel_parsing: true,
            log_level: "info".to_string(),
        }
    }
}

impl FromIni for AnalysisConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "analysis" {
            return None;
        }

        let value = value.trim_matches('"');
        match key {
            "distance_metric" | "distmethod" => {
                Some(value.parse::<DistanceMetric>().map(|m| self.distance_metric = m))
            },
            "n_jobs" => {
                match value.parse() {
                    Ok(jobs) => {
                        self.n_jobs = jobs;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid n_jobs (must be a non-negative integer): {}", value)
                    ))),
                }
            },
            "minkowski_p" => {
                match value.parse::<f64>() {
                    Ok(p) if p > 0.0 => {
                        self.minkowski_p = p;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid minkowski_p (must be positive): {}", value)
                    ))),
                }
            },
            "cluster_marker" => {
                self.cluster_marker = value.to_string();
                Some(Ok(()))
            },
            "artifact_separator" => {
                self.artifact_separator = value.to_string();
                Some(Ok(()))
            },
            "parallel_parsing" => {
                match value.parse() {
                    Ok(flag) => {
                        self.parallel_parsing = flag;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid parallel_parsing value (must be true/false): {}", value)
                    ))),
                }
            },
            "log_level" => {
                if parse_log_level(value).is_none() {
                    return Some(Err(Error::Config(format!("Invalid log_level: {}", value))));
                }
                self.log_level = value.to_string();
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl AnalysisConfig {
    pub fn get_log_level(&self) -> LevelFilter {
        parse_log_level(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    /// Worker count with 0 resolved to the number of cores.
    pub fn worker_count(&self) -> usize {
        if self.n_jobs == 0 {
            num_cpus::get().max(1)
        } else {
            self.n_jobs
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cluster_marker.trim().is_empty() {
            return Err(Error::Config("cluster_marker must not be empty".to_string()));
        }
        if !(self.minkowski_p > 0.0) {
            return Err(Error::Config(
                format!("minkowski_p must be positive, got {}", self.minkowski_p)
            ));
        }
        Ok(())
    }
}
