use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use cmmd::detection::format_resolution;
use cmmd::{
    analyze_directory, cmmd, output, AnalysisSettings, CmmdRequest, CommunityDetector,
    DistanceMetric, Error, Result,
};

/// Writes fixed reports: A and B always together, C and D always alone.
struct ScriptedDetector {
    calls: AtomicUsize,
}

impl ScriptedDetector {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn report(clusters: &[&[&str]]) -> String {
    let mut text = String::new();
    for (i, cluster) in clusters.iter().enumerate() {
        text.push_str(&format!("ClusterID:{}||\n", i + 1));
        for id in *cluster {
            text.push_str(id);
            text.push('\n');
        }
        if i + 1 < clusters.len() {
            text.push_str("\n\n");
        }
    }
    text.push('\n');
    text
}

fn scripted_report(resolution: f64) -> String {
    match format_resolution(resolution).as_str() {
        "0.5" => report(&[&["A", "B"], &["C"], &["D"]]),
        "1.0" => report(&[&["C"], &["B", "A"], &["D"]]),
        _ => report(&[&["D"], &["C"], &["A", "B"]]),
    }
}

impl CommunityDetector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn detect(&self, _layers: &[PathBuf], resolution: f64, destination: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        fs::write(destination, scripted_report(resolution))?;
        Ok(())
    }
}

/// Fails the test if the pipeline ever reaches detection.
struct UnreachableDetector;

impl CommunityDetector for UnreachableDetector {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn detect(&self, _layers: &[PathBuf], _resolution: f64, _destination: &Path) -> Result<()> {
        panic!("detection must not run");
    }
}

fn request(dir: &Path) -> CmmdRequest {
    CmmdRequest::new(vec![PathBuf::from("ppi.tsv"), PathBuf::from("coexp.tsv")], 0.5, 1.5, 0.5, dir)
}

fn ids(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_end_to_end_co_clustering() {
    let tmp = tempfile::tempdir().unwrap();
    let reports = tmp.path().join("communities");
    let detector = ScriptedDetector::new();

    let result = cmmd(&request(&reports).with_n_jobs(2), &detector).unwrap();
    assert_eq!(detector.calls(), 3);

    let m = &result.gene_community_matrix;
    assert_eq!(m.nrows(), 4);
    assert_eq!(m.ncols(), 3);
    assert_eq!(m.columns(), &["0.5", "1.0", "1.5"]);
    assert_eq!(m.trajectory("A"), Some(&[1, 2, 3][..]));
    assert_eq!(m.trajectory("C"), Some(&[2, 1, 2][..]));

    assert_eq!(result.l_constant.len(), 3);
    assert!(result.l_constant.values().any(|g| *g == ids(&["A", "B"])));
    assert!(result.l_constant.values().any(|g| *g == ids(&["C"])));
    assert!(result.l_constant.values().any(|g| *g == ids(&["D"])));

    let d = &result.distance_matrix;
    assert_eq!(d.between("A", "B"), Some(0.0));
    assert!(d.between("C", "D").unwrap() > 0.0);
    for i in 0..d.len() {
        assert_eq!(d.get(i, i), 0.0);
        for j in 0..d.len() {
            assert_eq!(d.get(i, j), d.get(j, i));
        }
    }
}

#[test]
fn test_existing_reports_are_reused() {
    let tmp = tempfile::tempdir().unwrap();
    let detector = ScriptedDetector::new();

    let first = cmmd(&request(tmp.path()), &detector).unwrap();
    let second = cmmd(&request(tmp.path()), &detector).unwrap();
    assert_eq!(detector.calls(), 3);
    assert_eq!(first, second);
}

#[test]
fn test_unknown_metric_fails_before_any_io() {
    let tmp = tempfile::tempdir().unwrap();
    let reports = tmp.path().join("never-created");

    let err = cmmd(&request(&reports).with_distmethod("manhattan"), &UnreachableDetector).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(!reports.exists());
}

#[test]
fn test_column_order_independent_of_creation_order() {
    let forward = tempfile::tempdir().unwrap();
    let backward = tempfile::tempdir().unwrap();
    let resolutions = [0.5, 1.0, 1.5];

    for r in resolutions {
        fs::write(forward.path().join(format!("{}.csv", format_resolution(r))), scripted_report(r)).unwrap();
    }
    for r in resolutions.iter().rev() {
        fs::write(backward.path().join(format!("{}.csv", format_resolution(*r))), scripted_report(*r)).unwrap();
    }
    // side artifacts of the detection tool are ignored
    fs::write(backward.path().join("1.0.csv_modularity"), "Cluster junk\nX\n").unwrap();

    let settings = AnalysisSettings { metric: DistanceMetric::Hamming, n_jobs: 3, ..Default::default() };
    let a = analyze_directory(forward.path(), None, &settings).unwrap();
    let b = analyze_directory(backward.path(), None, &settings).unwrap();
    assert_eq!(a, b);
    assert!(a.gene_community_matrix.trajectory("X").is_none());
}

#[test]
fn test_nodelist_restricts_every_output() {
    let tmp = tempfile::tempdir().unwrap();
    let detector = ScriptedDetector::new();
    let req = request(tmp.path()).with_nodelist(ids(&["A", "C", "D", "Z"]));

    let result = cmmd(&req, &detector).unwrap();
    assert_eq!(result.gene_community_matrix.entities(), &["A", "C", "D"]);
    assert_eq!(result.distance_matrix.len(), 3);
    assert!(result.l_constant.values().all(|g| !g.contains("B")));
}

#[test]
fn test_report_without_markers_degrades_to_unassigned() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("0.5.csv"), report(&[&["A", "B"], &["C"]])).unwrap();
    fs::write(tmp.path().join("1.0.csv"), "no clusters here\n").unwrap();

    let result = analyze_directory(tmp.path(), None, &AnalysisSettings::default()).unwrap();
    assert_eq!(result.gene_community_matrix.ncols(), 2);
    assert_eq!(result.gene_community_matrix.trajectory("C"), Some(&[2, 0][..]));
}

#[test]
fn test_empty_directory_is_empty_universe() {
    let tmp = tempfile::tempdir().unwrap();
    let err = analyze_directory(tmp.path(), None, &AnalysisSettings::default()).unwrap_err();
    assert!(matches!(err, Error::EmptyUniverse(_)));
}

#[test]
fn test_missing_directory_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = analyze_directory(&tmp.path().join("absent"), None, &AnalysisSettings::default()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_results_written_to_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let detector = ScriptedDetector::new();
    let result = cmmd(&request(&tmp.path().join("reports")), &detector).unwrap();

    let out = tmp.path().join("out");
    let written = output::write_results(&out, &result).unwrap();

    let labels = fs::read_to_string(&written.label_matrix).unwrap();
    let mut lines = labels.lines();
    assert_eq!(lines.next(), Some("entity,0.5,1.0,1.5"));
    assert_eq!(lines.next(), Some("A,1,2,3"));

    let distances = fs::read_to_string(&written.distance_matrix).unwrap();
    assert_eq!(distances.lines().next(), Some("entity,A,B,C,D"));
    assert_eq!(distances.lines().count(), 5);

    let groups: serde_json::Value = serde_json::from_str(&fs::read_to_string(&written.groups).unwrap()).unwrap();
    assert_eq!(groups["1_2_3"], serde_json::json!(["A", "B"]));

    let json_path = out.join("result.json");
    output::write_json(&json_path, &result).unwrap();
    let back = output::read_json(&json_path).unwrap();
    assert_eq!(back.gene_community_matrix, result.gene_community_matrix);
    assert_eq!(back.l_constant, result.l_constant);
    assert_eq!(back.distance_matrix.len(), 4);
}

#[test]
fn test_unreadable_report_fails_the_analysis() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("0.5.csv"), report(&[&["A", "B"], &["C"]])).unwrap();
    fs::write(tmp.path().join("1.0.csv"), b"ClusterID:1||\n\xff\xfe\x00A\n").unwrap();

    for parallel_parsing in [true, false] {
        let settings = AnalysisSettings { parallel_parsing, ..Default::default() };
        let err = analyze_directory(tmp.path(), None, &settings).unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "parallel_parsing = {}: {:?}", parallel_parsing, err);
    }
}

#[test]
fn test_sequential_and_parallel_parsing_agree() {
    let tmp = tempfile::tempdir().unwrap();
    for r in [0.5, 1.0, 1.5, 2.0] {
        fs::write(tmp.path().join(format!("{}.csv", format_resolution(r))), scripted_report(r)).unwrap();
    }

    let parallel = AnalysisSettings { n_jobs: 2, parallel_parsing: true, ..Default::default() };
    let sequential = AnalysisSettings { parallel_parsing: false, ..parallel.clone() };
    let a = analyze_directory(tmp.path(), None, &parallel).unwrap();
    let b = analyze_directory(tmp.path(), None, &sequential).unwrap();

    assert_eq!(a, b);
    assert_eq!(b.gene_community_matrix.columns(), &["0.5", "1.0", "1.5", "2.0"]);
}

#[test]
fn test_leftover_reports_join_the_analysis() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("0.7.csv"), report(&[&["A", "B", "C", "D"]])).unwrap();
    let detector = ScriptedDetector::new();

    let result = cmmd(&request(tmp.path()), &detector).unwrap();
    assert_eq!(detector.calls(), 3);
    assert_eq!(result.gene_community_matrix.columns(), &["0.5", "0.7", "1.0", "1.5"]);
}
