use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use log::{debug, info};

use crate::detection::parse_resolution;
use crate::types::ReportHandle;
use super::Result;

/// Collect the membership reports of a directory in column order.
///
/// Names containing `separator` are side artifacts of the detection tool and
/// are skipped. Reports are ordered by the resolution encoded in their name,
/// then by name; reports without a numeric name sort after the rest.
pub fn list_reports(dir: &Path, separator: &str) -> Result<Vec<ReportHandle>> {
    let mut reports = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !separator.is_empty() && name.contains(separator) {
            debug!("Skipping secondary artifact {}", name);
            continue;
        }
        reports.push(ReportHandle::new(entry.path(), parse_resolution(&name)));
    }

    sort_reports(&mut reports);
    info!("Found {} membership reports in {:?}", reports.len(), dir);
    Ok(reports)
}

pub fn sort_reports(reports: &mut [ReportHandle]) {
    reports.sort_by(|a, b| {
        let by_resolution = match (a.resolution, b.resolution) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_resolution.then_with(|| a.file_name().cmp(&b.file_name()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_reports_sorted_numerically_and_artifacts_skipped() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["1.0.csv", "0.5.csv", "10.0.csv", "2.0.csv", "1.0.csv_affiliation", "notes.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let reports = list_reports(dir.path(), "_").unwrap();
        let names: Vec<String> = reports.iter().map(|r| r.file_name()).collect();
        assert_eq!(names, vec!["0.5.csv", "1.0.csv", "2.0.csv", "10.0.csv", "notes.txt"]);
        assert_eq!(reports[0].resolution, Some(0.5));
        assert_eq!(reports[4].resolution, None);
    }

    #[test]
    fn test_empty_separator_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("0.5_x.csv")).unwrap();
        assert_eq!(list_reports(dir.path(), "").unwrap().len(), 1);
    }
}
