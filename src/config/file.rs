// src/config/file.rs

use serde::{Serialize, Deserialize};
use std::path::PathBuf;
use crate::error::{Error, Result};
use super::FromIni;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Where the detection tool writes one membership report per resolution.
    pub communities_dir: PathBuf,
    /// Where the result matrices are written.
    pub output_dir: PathBuf,
    /// Optional allow-list, one entity id per line.
    pub nodelist_file: Option<PathBuf>,
    /// Log to a timestamped file here instead of stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            communities_dir: PathBuf::from("Output"),
            output_dir: PathBuf::from("results"),
            nodelist_file: None,
            log_dir: None,
        }
    }
}

impl FromIni for FileConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "files" {
            return None;
        }

        let value = value.trim_matches('"');
        match key {
            "communities_dir" => {
                self.communities_dir = PathBuf::from(value);
                Some(Ok(()))
            },
            "output_dir" => {
                self.output_dir = PathBuf::from(value);
                Some(Ok(()))
            },
            "nodelist_file" => {
                self.nodelist_file = (!value.is_empty()).then(|| PathBuf::from(value));
                Some(Ok(()))
            },
            "log_dir" => {
                self.log_dir = (!value.is_empty()).then(|| PathBuf::from(value));
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.communities_dir.as_os_str().is_empty() {
            return Err(Error::Config("communities_dir must not be empty".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::Config("output_dir must not be empty".to_string()));
        }
        if let Some(path) = &self.nodelist_file {
            if !path.is_file() {
                return Err(Error::Config(
                    format!("Node list file does not exist: {:?}", path)
                ));
            }
        }
        Ok(())
    }
}
