use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use serde::{Serialize, Deserialize};

/// Identifier of a node/gene as it appears in a membership report.
pub type EntityId = String;

/// One community at one resolution.
pub type Cluster = BTreeSet<EntityId>;

/// Label used in the matrix for an entity that no cluster of a resolution holds.
pub const UNASSIGNED: i64 = 0;

/// The partition of entities produced for a single resolution.
///
/// Clusters keep report order; their 1-based position is the label an entity
/// receives in the [`LabelMatrix`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clustering {
    /// Column name in the label matrix (the resolution, or the report's file stem).
    pub label: String,
    clusters: Vec<Cluster>,
}

impl Clustering {
    pub fn new(label: impl Into<String>, clusters: Vec<Cluster>) -> Self {
        Self { label: label.into(), clusters }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Every entity held by any cluster.
    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.clusters.iter().flat_map(|c| c.iter())
    }
}

/// A membership report on disk, tagged with the resolution parsed from its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportHandle {
    pub path: PathBuf,
    pub resolution: Option<f64>,
}

impl ReportHandle {
    pub fn new(path: impl Into<PathBuf>, resolution: Option<f64>) -> Self {
        Self { path: path.into(), resolution }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Column name: the resolution value when known, otherwise the file stem.
    pub fn column_label(&self) -> String {
        match self.resolution {
            Some(r) => crate::detection::format_resolution(r),
            None => self
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// Entity × resolution matrix of cluster labels, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMatrix {
    entities: Vec<EntityId>,
    columns: Vec<String>,
    data: Vec<i64>,
}

impl LabelMatrix {
    pub(crate) fn from_parts(entities: Vec<EntityId>, columns: Vec<String>, data: Vec<i64>) -> Self {
        debug_assert_eq!(entities.len() * columns.len(), data.len());
        Self { entities, columns, data }
    }

    pub fn nrows(&self) -> usize {
        self.entities.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row(&self, i: usize) -> &[i64] {
        let n = self.ncols();
        &self.data[i * n..(i + 1) * n]
    }

    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.data[row * self.ncols() + col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[i64]> {
        (0..self.nrows()).map(move |i| self.row(i))
    }

    /// Row index of an entity.
    pub fn position(&self, entity: &str) -> Option<usize> {
        self.entities.binary_search_by(|e| e.as_str().cmp(entity)).ok()
    }

    /// Label trajectory of a named entity.
    pub fn trajectory(&self, entity: &str) -> Option<&[i64]> {
        self.position(entity).map(|i| self.row(i))
    }
}

/// Joined label sequence of one row; entities sharing it share a trajectory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrajectoryKey(String);

impl TrajectoryKey {
    pub fn from_labels(labels: &[i64]) -> Self {
        let joined = labels
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("_");
        Self(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrajectoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entities grouped by identical trajectory.
pub type TrajectoryGroups = BTreeMap<TrajectoryKey, BTreeSet<EntityId>>;

/// Symmetric entity × entity distance matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    entities: Vec<EntityId>,
    data: Vec<f64>,
}

impl DistanceMatrix {
    pub(crate) fn from_parts(entities: Vec<EntityId>, data: Vec<f64>) -> Self {
        debug_assert_eq!(entities.len() * entities.len(), data.len());
        Self { entities, data }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.len() + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.len();
        &self.data[i * n..(i + 1) * n]
    }

    /// Distance between two named entities.
    pub fn between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.entities.binary_search_by(|e| e.as_str().cmp(a)).ok()?;
        let j = self.entities.binary_search_by(|e| e.as_str().cmp(b)).ok()?;
        Some(self.get(i, j))
    }
}

/// Everything a single analysis call produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub gene_community_matrix: LabelMatrix,
    pub l_constant: TrajectoryGroups,
    pub distance_matrix: DistanceMatrix,
}

impl AnalysisResult {
    /// The group holding `entity`, if it is part of the universe.
    pub fn group_of(&self, entity: &str) -> Option<&BTreeSet<EntityId>> {
        let row = self.gene_community_matrix.trajectory(entity)?;
        self.l_constant.get(&TrajectoryKey::from_labels(row))
    }
}
