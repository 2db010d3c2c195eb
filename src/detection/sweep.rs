// src/detection/sweep.rs

use std::path::Path;
use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};

const RESOLUTION_DECIMALS: i32 = 10;
const REPORT_EXTENSION: &str = "csv";
/// Upper bound on resolutions in one sweep; each one is a detection run.
pub const MAX_RESOLUTIONS: usize = 10_000;

/// Arithmetic sequence of resolution values, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionSweep {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ResolutionSweep {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self> {
        let sweep = Self { min, max, step };
        sweep.validate()?;
        Ok(sweep)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(Error::config(format!(
                "Resolution bounds must be finite numbers (gamma_min={}, gamma_max={})",
                self.min, self.max
            )));
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(Error::config(format!(
                "gamma_step must be a positive number, got {}", self.step
            )));
        }
        if self.min > self.max {
            return Err(Error::config(format!(
                "gamma_min ({}) must not exceed gamma_max ({})", self.min, self.max
            )));
        }
        let count = self.count();
        if !count.is_finite() || count > MAX_RESOLUTIONS as f64 {
            return Err(Error::config(format!(
                "gamma_step {} over [{}, {}] gives more than {} resolutions",
                self.step, self.min, self.max, MAX_RESOLUTIONS
            )));
        }
        Ok(())
    }

    fn count(&self) -> f64 {
        // Tolerance keeps `max` inside the sweep when (max - min) / step lands just under an integer.
        ((self.max - self.min) / self.step + 1e-9).floor() + 1.0
    }

    /// Number of resolutions in the sweep.
    pub fn len(&self) -> usize {
        self.count().min(MAX_RESOLUTIONS as f64) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| round_resolution(self.min + i as f64 * self.step))
            .collect()
    }
}

fn round_resolution(value: f64) -> f64 {
    let scale = 10f64.powi(RESOLUTION_DECIMALS);
    (value * scale).round() / scale
}

/// Render a resolution the way report files are named: integral values keep one decimal.
pub fn format_resolution(value: f64) -> String {
    let value = round_resolution(value);
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

pub fn report_file_name(resolution: f64) -> String {
    format!("{}.{}", format_resolution(resolution), REPORT_EXTENSION)
}

/// Resolution encoded in a report file name, if the name is numeric.
pub fn parse_resolution(file_name: &str) -> Option<f64> {
    let parse = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite());
    parse(file_name).or_else(|| {
        Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(parse)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_is_inclusive() {
        let sweep = ResolutionSweep::new(0.5, 1.5, 0.5).unwrap();
        assert_eq!(sweep.values(), vec![0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_sweep_avoids_float_drift() {
        let sweep = ResolutionSweep::new(0.1, 0.3, 0.1).unwrap();
        assert_eq!(sweep.values(), vec![0.1, 0.2, 0.3]);
        let single = ResolutionSweep::new(2.0, 2.0, 1.0).unwrap();
        assert_eq!(single.values(), vec![2.0]);
    }

    #[test]
    fn test_sweep_rejects_bad_bounds() {
        assert!(ResolutionSweep::new(2.0, 1.0, 0.5).unwrap_err().is_config());
        assert!(ResolutionSweep::new(0.0, 1.0, 0.0).is_err());
        assert!(ResolutionSweep::new(0.0, 1.0, -0.5).is_err());
        assert!(ResolutionSweep::new(f64::NAN, 1.0, 0.5).is_err());
    }

    #[test]
    fn test_sweep_rejects_runaway_step() {
        assert!(ResolutionSweep::new(0.0, 1.0, 1e-320).unwrap_err().is_config());
        assert!(ResolutionSweep::new(0.0, 1.0, 1e-12).unwrap_err().is_config());

        let widest = ResolutionSweep::new(0.0, (MAX_RESOLUTIONS - 1) as f64, 1.0).unwrap();
        assert_eq!(widest.len(), MAX_RESOLUTIONS);
        assert!(ResolutionSweep::new(0.0, MAX_RESOLUTIONS as f64, 1.0).is_err());
    }

    #[test]
    fn test_len_is_bounded_without_validation() {
        let raw = ResolutionSweep { min: 0.0, max: 1.0, step: 1e-320 };
        assert_eq!(raw.len(), MAX_RESOLUTIONS);
    }

    #[test]
    fn test_report_names_round_trip() {
        assert_eq!(report_file_name(1.0), "1.0.csv");
        assert_eq!(report_file_name(0.30000000000000004), "0.3.csv");
        assert_eq!(parse_resolution("0.5.csv"), Some(0.5));
        assert_eq!(parse_resolution("12"), Some(12.0));
        assert_eq!(parse_resolution("layers.csv"), None);
    }
}
