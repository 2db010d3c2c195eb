use std::time::Instant;
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{debug, info};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::types::{DistanceMatrix, LabelMatrix};
use super::{DistanceMetric, PreparedMetric};

/// Computes full distance matrices on a dedicated worker pool.
///
/// Each worker owns whole rows of the upper triangle and only reads the label
/// matrix; the triangle is mirrored once every row is back.
#[derive(Debug)]
pub struct DistanceEngine {
    thread_pool: rayon::ThreadPool,
    workers: usize,
}

impl DistanceEngine {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::config("n_jobs must be at least 1"));
        }
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("distance-worker-{}", i))
            .build()?;
        Ok(Self { thread_pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn compute(
        &self,
        matrix: &LabelMatrix,
        metric: DistanceMetric,
        minkowski_p: f64,
        progress: &ProgressBar,
    ) -> Result<DistanceMatrix> {
        let start = Instant::now();
        let n = matrix.nrows();
        let prepared = PreparedMetric::prepare(metric, matrix, minkowski_p)?;

        info!("Computing {} pairwise {} distances on {} workers", n * n.saturating_sub(1) / 2, metric, self.workers);
        progress.set_length(n as u64);

        let upper: Vec<Vec<f64>> = self.thread_pool.install(|| {
            (0..n)
                .into_par_iter()
                .progress_with(progress.clone())
                .map(|i| {
                    let u = matrix.row(i);
                    ((i + 1)..n)
                        .map(|j| prepared.distance(u, matrix.row(j)))
                        .collect::<Result<Vec<f64>>>()
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut data = vec![0.0; n * n];
        for (i, row) in upper.iter().enumerate() {
            for (offset, &d) in row.iter().enumerate() {
                let j = i + 1 + offset;
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }

        debug!("Distance matrix ready in {}", crate::utils::format_elapsed(start.elapsed()));
        Ok(DistanceMatrix::from_parts(matrix.entities().to_vec(), data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[i64]]) -> LabelMatrix {
        let entities = (0..rows.len()).map(|i| format!("e{:02}", i)).collect();
        let columns = (0..rows[0].len()).map(|j| j.to_string()).collect();
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        LabelMatrix::from_parts(entities, columns, data)
    }

    #[test]
    fn test_symmetric_with_zero_diagonal() {
        let m = matrix(&[&[1, 1, 2], &[1, 2, 2], &[2, 3, 1], &[1, 1, 2]]);
        let engine = DistanceEngine::new(3).unwrap();
        for metric in [DistanceMetric::Hamming, DistanceMetric::Euclidean, DistanceMetric::CityBlock] {
            let d = engine.compute(&m, metric, 2.0, &ProgressBar::hidden()).unwrap();
            for i in 0..4 {
                assert_eq!(d.get(i, i), 0.0);
                for j in 0..4 {
                    assert_eq!(d.get(i, j), d.get(j, i));
                }
            }
            assert_eq!(d.get(0, 3), 0.0);
        }
    }

    #[test]
    fn test_worker_count_does_not_change_result() {
        let m = matrix(&[&[1, 2, 3], &[3, 2, 1], &[1, 1, 1], &[2, 2, 2], &[1, 2, 1]]);
        let one = DistanceEngine::new(1).unwrap().compute(&m, DistanceMetric::Hamming, 2.0, &ProgressBar::hidden()).unwrap();
        let four = DistanceEngine::new(4).unwrap().compute(&m, DistanceMetric::Hamming, 2.0, &ProgressBar::hidden()).unwrap();
        assert_eq!(one, four);
        assert!((one.get(0, 1) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(DistanceEngine::new(0).unwrap_err().is_config());
    }

    #[test]
    fn test_pair_errors_propagate() {
        let m = matrix(&[&[0, 0], &[0, 0]]);
        let engine = DistanceEngine::new(2).unwrap();
        assert!(engine.compute(&m, DistanceMetric::SokalSneath, 2.0, &ProgressBar::hidden()).is_err());
    }
}
