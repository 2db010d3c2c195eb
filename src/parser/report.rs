// src/parser/report.rs

use std::fs;
use std::path::Path;
use log::{debug, trace, warn};

use crate::types::{Cluster, Clustering, ReportHandle};
use super::{ParserError, Result};

/// Literal token that opens every cluster block.
pub const DEFAULT_CLUSTER_MARKER: &str = "Cluster";

/// Blank separator lines trailing every block but the last.
const INTERIOR_FOOTER_LINES: usize = 2;
/// The last block is only followed by the final newline.
const FINAL_FOOTER_LINES: usize = 1;

/// Splits a membership report into its clusters.
///
/// A block starts at a marker line and runs up to the next marker (or EOF).
/// The marker line itself is never an entity. Up to two trailing blank lines
/// are dropped from interior blocks and one from the last block; identifier
/// lines are never treated as footer.
#[derive(Debug, Clone)]
pub struct ReportParser {
    marker: String,
}

impl Default for ReportParser {
    fn default() -> Self {
        Self { marker: DEFAULT_CLUSTER_MARKER.to_string() }
    }
}

impl ReportParser {
    pub fn new(marker: impl Into<String>) -> Result<Self> {
        let marker = marker.into();
        if marker.trim().is_empty() {
            return Err(ParserError::ConfigError(
                "cluster marker must not be empty".to_string(),
            ));
        }
        Ok(Self { marker })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Parse the lines of one report. A report without markers gives an empty clustering.
    pub fn parse_lines<S: AsRef<str>>(&self, lines: &[S]) -> Clustering {
        let lines: Vec<&str> = lines.iter().map(|l| l.as_ref()).collect();
        let starts: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(self.marker.as_str()))
            .map(|(i, _)| i)
            .collect();

        let mut clusters = Vec::with_capacity(starts.len());
        for (j, &start) in starts.iter().enumerate() {
            let is_last = j + 1 == starts.len();
            let end = if is_last { lines.len() } else { starts[j + 1] };
            let footer = if is_last { FINAL_FOOTER_LINES } else { INTERIOR_FOOTER_LINES };

            let body = trim_footer(&lines[start + 1..end], footer);
            let cluster: Cluster = body
                .iter()
                .map(|line| line.trim())
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();

            trace!("Block {} at line {}: {} entities", j + 1, start + 1, cluster.len());
            clusters.push(cluster);
        }

        Clustering::new(String::new(), clusters)
    }

    pub fn parse_str(&self, text: &str) -> Clustering {
        let lines: Vec<&str> = text.lines().collect();
        self.parse_lines(lines.as_slice())
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Clustering> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ParserError::InvalidReport {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let clustering = self.parse_str(&content);
        if clustering.is_empty() {
            warn!("No '{}' markers found in {:?}; report yields no clusters", self.marker, path);
        } else {
            debug!("Parsed {} clusters from {:?}", clustering.len(), path);
        }
        Ok(clustering)
    }

    /// Parse a report and name its column after the handle.
    pub fn parse_report(&self, handle: &ReportHandle) -> Result<Clustering> {
        Ok(self.parse_file(&handle.path)?.with_label(handle.column_label()))
    }
}

fn trim_footer<'a>(body: &'a [&'a str], max_lines: usize) -> &'a [&'a str] {
    let mut end = body.len();
    let floor = body.len().saturating_sub(max_lines);
    while end > floor && body[end - 1].trim().is_empty() {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blocks_without_separators() {
        let parser = ReportParser::default();
        let c = parser.parse_lines(&["Cluster 1", "g1", "g2", "Cluster 2", "g3"]);
        assert_eq!(c.clusters(), &[set(&["g1", "g2"]), set(&["g3"])]);
    }

    #[test]
    fn test_blocks_with_separators() {
        let parser = ReportParser::default();
        let c = parser.parse_lines(&["Cluster 1", "g1", "", "Cluster 2", "g2", ""]);
        assert_eq!(c.clusters(), &[set(&["g1"]), set(&["g2"])]);
    }

    #[test]
    fn test_double_separator_interior_footer() {
        let text = "ClusterID:1||\ng1\ng2\n\n\nClusterID:2||\ng3\n\n";
        let c = ReportParser::default().parse_str(text);
        assert_eq!(c.clusters(), &[set(&["g1", "g2"]), set(&["g3"])]);
    }

    #[test]
    fn test_no_markers_is_empty() {
        let c = ReportParser::default().parse_lines(&["g1", "g2"]);
        assert!(c.is_empty());
    }

    #[test]
    fn test_lines_before_first_marker_are_ignored() {
        let c = ReportParser::default().parse_lines(&["header", "Cluster 1", "g1"]);
        assert_eq!(c.clusters(), &[set(&["g1"])]);
    }

    #[test]
    fn test_custom_marker() {
        let parser = ReportParser::new("Community").unwrap();
        let c = parser.parse_lines(&["Community A", "x", "Community B", "y"]);
        assert_eq!(c.len(), 2);
        assert!(ReportParser::new("  ").is_err());
    }

    #[test]
    fn test_entities_are_trimmed() {
        let c = ReportParser::default().parse_str("Cluster 1\r\n g1 \r\ng2\r\n");
        assert_eq!(c.clusters(), &[set(&["g1", "g2"])]);
    }
}
