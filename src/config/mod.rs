pub mod file;
pub mod subsystems;

use serde::{Serialize, Deserialize};
use std::path::Path;
use std::fs;
use crate::error::{Error, Result};
use log::{trace, warn};

pub trait FromIni {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CmmdConfig {
    pub files: file::FileConfig,
    pub detection: subsystems::DetectionConfig,
    pub analysis: subsystems::AnalysisConfig,
}

impl CmmdConfig {
    /// Everything a full run (detection plus analysis) needs.
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.detection.validate()?;
        self.files.validate()?;
        Ok(())
    }

    /// Everything analysing an existing report directory needs.
    pub fn validate_analysis(&self) -> Result<()> {
        self.analysis.validate()?;
        self.files.validate()?;
        Ok(())
    }

    pub fn from_ini<P: AsRef<Path>>(path: P) -> Result<Self> {
        trace!("Loading configuration from: {:?}", path.as_ref());
        let content = fs::read_to_string(&path)?;
        Self::from_ini_str(&content)
    }

    /// Parse INI text. Unknown keys are reported and skipped; bad values fail the load.
    pub fn from_ini_str(content: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut current_section = String::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len()-1].trim().to_string();
                trace!("  Line {}: Found section: [{}]", line_num + 1, current_section);
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();

                let handled = match current_section.as_str() {
                    "files" => config.files.from_ini_section(&current_section, key, value),
                    "detection" => config.detection.from_ini_section(&current_section, key, value),
                    "analysis" => config.analysis.from_ini_section(&current_section, key, value),
                    _ => None,
                };

                match handled {
                    Some(Ok(())) => {},
                    Some(Err(e)) => {
                        return Err(Error::Config(format!("line {}: {}", line_num + 1, e)));
                    },
                    None => {
                        warn!("Unrecognized config key: {}={} in section [{}]", key, value, current_section);
                    },
                }
            }
        }

        Ok(config)
    }
}
