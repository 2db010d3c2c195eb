// src/config/subsystems/detection.rs

use serde::{Serialize, Deserialize};
use std::path::PathBuf;
use crate::error::{Error, Result};
use crate::config::FromIni;
use crate::detection::{ResolutionSweep, DEFAULT_DETECTION_TOOL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Edge-list files, one per network layer.
    pub layers: Vec<PathBuf>,
    pub gamma_min: f64,
    pub gamma_max: f64,
    pub gamma_step: f64,
    /// Detection binary invoked once per resolution.
    pub tool: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            gamma_min: 0.5,
            gamma_max: 1.5,
            gamma_step: 0.5,
            tool: DEFAULT_DETECTION_TOOL.to_string(),
        }
    }
}

fn parse_gamma(key: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::Config(format!("Invalid {} (must be a number): {}", key, value)))
}

impl FromIni for DetectionConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "detection" {
            return None;
        }

        let value = value.trim_matches('"');
        match key {
            "layers" => {
                self.layers = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect();
                Some(Ok(()))
            },
            "gamma_min" => Some(parse_gamma(key, value).map(|v| self.gamma_min = v)),
            "gamma_max" => Some(parse_gamma(key, value).map(|v| self.gamma_max = v)),
            "gamma_step" => Some(parse_gamma(key, value).map(|v| self.gamma_step = v)),
            "tool" => {
                if value.is_empty() {
                    return Some(Err(Error::Config("tool must not be empty".to_string())));
                }
                self.tool = value.to_string();
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl DetectionConfig {
    pub fn sweep(&self) -> Result<ResolutionSweep> {
        ResolutionSweep::new(self.gamma_min, self.gamma_max, self.gamma_step)
    }

    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::Config(
                "At least one network layer file is required".to_string()
            ));
        }
        self.sweep()?;
        Ok(())
    }
}
