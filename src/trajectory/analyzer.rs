// src/trajectory/analyzer.rs

use std::collections::BTreeSet;
use std::time::Instant;
use ahash::AHashMap;
use indicatif::ProgressBar;
use log::{debug, info, warn};

use crate::distance::{DistanceEngine, DistanceMetric};
use crate::error::{Error, Result};
use crate::types::{
    AnalysisResult, Clustering, EntityId, LabelMatrix, TrajectoryGroups, TrajectoryKey, UNASSIGNED,
};

pub const DEFAULT_MINKOWSKI_P: f64 = 2.0;

/// Turns the clusterings of a resolution sweep into trajectories and their distances.
pub struct TrajectoryAnalyzer {
    metric: DistanceMetric,
    minkowski_p: f64,
    engine: DistanceEngine,
}

impl TrajectoryAnalyzer {
    pub fn new(metric: DistanceMetric, n_jobs: usize) -> Result<Self> {
        if metric.is_boolean() {
            info!("{} only distinguishes assigned from unassigned labels", metric);
        } else if !metric.is_categorical() {
            info!("{} reads cluster labels as numbers", metric);
        }
        Ok(Self {
            metric,
            minkowski_p: DEFAULT_MINKOWSKI_P,
            engine: DistanceEngine::new(n_jobs)?,
        })
    }

    pub fn with_minkowski_p(mut self, p: f64) -> Self {
        self.minkowski_p = p;
        self
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn analyze(
        &self,
        clusterings: &[Clustering],
        allowlist: Option<&BTreeSet<EntityId>>,
    ) -> Result<AnalysisResult> {
        self.analyze_with_progress(clusterings, allowlist, &ProgressBar::hidden())
    }

    pub fn analyze_with_progress(
        &self,
        clusterings: &[Clustering],
        allowlist: Option<&BTreeSet<EntityId>>,
        progress: &ProgressBar,
    ) -> Result<AnalysisResult> {
        let start = Instant::now();

        if clusterings.is_empty() {
            return Err(Error::EmptyUniverse("no clusterings were supplied".to_string()));
        }
        let universe = entity_universe(clusterings, allowlist);
        if universe.is_empty() {
            return Err(Error::EmptyUniverse(match allowlist {
                Some(list) => format!("none of the {} allowed entities occur in any report", list.len()),
                None => "the reports contain no entities".to_string(),
            }));
        }
        info!("Entity universe: {} entities across {} resolutions", universe.len(), clusterings.len());

        let gene_community_matrix = build_label_matrix(clusterings, universe);
        let l_constant = group_trajectories(&gene_community_matrix);
        info!("{} distinct trajectories", l_constant.len());

        let distance_matrix = self.engine.compute(
            &gene_community_matrix,
            self.metric,
            self.minkowski_p,
            progress,
        )?;

        info!("Trajectory analysis finished in {}", crate::utils::format_elapsed(start.elapsed()));
        Ok(AnalysisResult { gene_community_matrix, l_constant, distance_matrix })
    }
}

/// Sorted union of every clustered entity, restricted to `allowlist` when one is given.
pub fn entity_universe(
    clusterings: &[Clustering],
    allowlist: Option<&BTreeSet<EntityId>>,
) -> Vec<EntityId> {
    let all: BTreeSet<&EntityId> = clusterings.iter().flat_map(|c| c.entities()).collect();
    all.into_iter()
        .filter(|e| allowlist.map_or(true, |list| list.contains(*e)))
        .cloned()
        .collect()
}

/// One row per distinct entity of `universe` in sorted order, one column per clustering.
///
/// An entity held by no cluster of a clustering gets [`UNASSIGNED`] there.
pub fn build_label_matrix(clusterings: &[Clustering], mut universe: Vec<EntityId>) -> LabelMatrix {
    // Row lookups binary-search the entity list.
    universe.sort_unstable();
    universe.dedup();
    let (rows, cols) = (universe.len(), clusterings.len());
    let mut data = vec![UNASSIGNED; rows * cols];

    for (j, clustering) in clusterings.iter().enumerate() {
        let mut labels: AHashMap<&str, i64> = AHashMap::new();
        for (k, cluster) in clustering.clusters().iter().enumerate() {
            for entity in cluster {
                if let Some(previous) = labels.insert(entity.as_str(), k as i64 + 1) {
                    warn!(
                        "Entity {} listed in clusters {} and {} of {}; keeping the later one",
                        entity, previous, k + 1, clustering.label
                    );
                }
            }
        }

        let mut unassigned = 0usize;
        for (i, entity) in universe.iter().enumerate() {
            match labels.get(entity.as_str()) {
                Some(&label) => data[i * cols + j] = label,
                None => unassigned += 1,
            }
        }
        if unassigned > 0 {
            warn!("{} entities are unassigned at resolution {}", unassigned, clustering.label);
        }
        debug!("Column {} ({}): {} clusters", j, clustering.label, clustering.len());
    }

    let columns = clusterings.iter().map(|c| c.label.clone()).collect();
    LabelMatrix::from_parts(universe, columns, data)
}

pub fn group_trajectories(matrix: &LabelMatrix) -> TrajectoryGroups {
    let mut groups = TrajectoryGroups::new();
    for (entity, row) in matrix.entities().iter().zip(matrix.rows()) {
        groups
            .entry(TrajectoryKey::from_labels(row))
            .or_default()
            .insert(entity.clone());
    }
    groups
}
