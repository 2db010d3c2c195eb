// src/distance/metrics.rs

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::types::LabelMatrix;
use super::DistanceMetric;

/// A metric bound to whatever it needs from the whole matrix.
///
/// `seuclidean` needs the per-column sample variance and `mahalanobis` the
/// inverse sample covariance; both are computed once here, before any pair.
#[derive(Debug, Clone)]
pub struct PreparedMetric {
    metric: DistanceMetric,
    minkowski_p: f64,
    variances: Vec<f64>,
    inverse_covariance: Option<DMatrix<f64>>,
}

impl PreparedMetric {
    pub fn prepare(metric: DistanceMetric, matrix: &LabelMatrix, minkowski_p: f64) -> Result<Self> {
        if metric == DistanceMetric::Minkowski && !(minkowski_p > 0.0) {
            return Err(Error::config(format!("minkowski p must be positive, got {}", minkowski_p)));
        }

        let mut prepared = Self {
            metric,
            minkowski_p,
            variances: Vec::new(),
            inverse_covariance: None,
        };

        match metric {
            DistanceMetric::SEuclidean => {
                prepared.variances = column_variances(matrix);
            },
            DistanceMetric::Mahalanobis => {
                let (m, n) = (matrix.nrows(), matrix.ncols());
                if m <= n {
                    return Err(Error::distance(format!(
                        "mahalanobis needs more entities than resolutions ({} entities, {} resolutions); \
                         the covariance matrix is singular",
                        m, n
                    )));
                }
                prepared.inverse_covariance = Some(inverse_covariance(matrix)?);
                debug!("Prepared {}x{} inverse covariance for mahalanobis", n, n);
            },
            _ => {},
        }
        Ok(prepared)
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn distance(&self, u: &[i64], v: &[i64]) -> Result<f64> {
        if u.len() != v.len() {
            return Err(Error::distance(format!(
                "trajectory lengths differ ({} vs {})", u.len(), v.len()
            )));
        }

        let d: f64 = match self.metric {
            DistanceMetric::BrayCurtis => {
                let num: f64 = pairs(u, v).map(|(a, b)| (a - b).abs()).sum();
                let den: f64 = pairs(u, v).map(|(a, b)| (a + b).abs()).sum();
                num / den
            },
            DistanceMetric::Canberra => pairs(u, v)
                .map(|(a, b)| {
                    let den = a.abs() + b.abs();
                    if den == 0.0 { 0.0 } else { (a - b).abs() / den }
                })
                .sum(),
            DistanceMetric::Chebyshev => pairs(u, v).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max),
            DistanceMetric::CityBlock => pairs(u, v).map(|(a, b)| (a - b).abs()).sum(),
            DistanceMetric::Correlation => centered_cosine(u, v, true),
            DistanceMetric::Cosine => centered_cosine(u, v, false),
            DistanceMetric::Euclidean => squared_euclidean(u, v).sqrt(),
            DistanceMetric::SqEuclidean => squared_euclidean(u, v),
            DistanceMetric::Hamming | DistanceMetric::Matching => {
                let differing = u.iter().zip(v).filter(|(a, b)| a != b).count();
                differing as f64 / u.len() as f64
            },
            DistanceMetric::Jaccard => {
                let nonzero = u.iter().zip(v).filter(|(a, b)| **a != 0 || **b != 0).count();
                let unequal = u
                    .iter()
                    .zip(v)
                    .filter(|(a, b)| (**a != 0 || **b != 0) && a != b)
                    .count();
                if nonzero == 0 { 0.0 } else { unequal as f64 / nonzero as f64 }
            },
            DistanceMetric::JensenShannon => jensen_shannon(u, v),
            DistanceMetric::Minkowski => {
                if self.minkowski_p.is_infinite() {
                    pairs(u, v).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max)
                } else {
                    let p = self.minkowski_p;
                    pairs(u, v).map(|(a, b)| (a - b).abs().powf(p)).sum::<f64>().powf(1.0 / p)
                }
            },
            DistanceMetric::SEuclidean => pairs(u, v)
                .zip(&self.variances)
                .map(|((a, b), var)| (a - b).powi(2) / var)
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Mahalanobis => {
                let vi = self.inverse_covariance.as_ref().ok_or_else(|| {
                    Error::distance("mahalanobis used without a prepared inverse covariance")
                })?;
                let delta = DVector::from_iterator(u.len(), pairs(u, v).map(|(a, b)| a - b));
                delta.dot(&(vi * &delta)).sqrt()
            },
            DistanceMetric::Dice
            | DistanceMetric::Kulczynski1
            | DistanceMetric::RogersTanimoto
            | DistanceMetric::RussellRao
            | DistanceMetric::SokalMichener
            | DistanceMetric::SokalSneath
            | DistanceMetric::Yule => boolean_distance(self.metric, &BoolCounts::new(u, v))?,
        };
        Ok(d)
    }
}

fn pairs<'a>(u: &'a [i64], v: &'a [i64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    u.iter().zip(v).map(|(a, b)| (*a as f64, *b as f64))
}

fn squared_euclidean(u: &[i64], v: &[i64]) -> f64 {
    pairs(u, v).map(|(a, b)| (a - b).powi(2)).sum()
}

/// `1 - cos(u, v)`, optionally after removing each row's mean; clipped to [0, 2].
fn centered_cosine(u: &[i64], v: &[i64], centered: bool) -> f64 {
    let n = u.len() as f64;
    let (mu, mv) = if centered {
        (
            u.iter().map(|&x| x as f64).sum::<f64>() / n,
            v.iter().map(|&x| x as f64).sum::<f64>() / n,
        )
    } else {
        (0.0, 0.0)
    };

    let (mut uv, mut uu, mut vv) = (0.0, 0.0, 0.0);
    for (a, b) in pairs(u, v) {
        let (a, b) = (a - mu, b - mv);
        uv += a * b;
        uu += a * a;
        vv += b * b;
    }
    // NaN passes through clamp untouched.
    (1.0 - uv / (uu * vv).sqrt()).clamp(0.0, 2.0)
}

fn jensen_shannon(u: &[i64], v: &[i64]) -> f64 {
    let su: f64 = u.iter().map(|&x| x as f64).sum();
    let sv: f64 = v.iter().map(|&x| x as f64).sum();

    let mut js = 0.0;
    for (a, b) in pairs(u, v) {
        let (p, q) = (a / su, b / sv);
        let m = (p + q) / 2.0;
        js += relative_entropy(p, m) + relative_entropy(q, m);
    }
    (js / 2.0).sqrt()
}

fn relative_entropy(x: f64, y: f64) -> f64 {
    if x > 0.0 && y > 0.0 {
        x * (x / y).ln()
    } else if x == 0.0 && y >= 0.0 {
        0.0
    } else if x.is_nan() || y.is_nan() {
        f64::NAN
    } else {
        f64::INFINITY
    }
}

/// Agreement counts after reading every nonzero label as `true`.
#[derive(Debug, Default, Clone, Copy)]
struct BoolCounts {
    tt: f64,
    tf: f64,
    ft: f64,
    ff: f64,
}

impl BoolCounts {
    fn new(u: &[i64], v: &[i64]) -> Self {
        let mut c = Self::default();
        for (a, b) in u.iter().zip(v) {
            match (*a != 0, *b != 0) {
                (true, true) => c.tt += 1.0,
                (true, false) => c.tf += 1.0,
                (false, true) => c.ft += 1.0,
                (false, false) => c.ff += 1.0,
            }
        }
        c
    }

    fn total(&self) -> f64 {
        self.tt + self.tf + self.ft + self.ff
    }
}

fn boolean_distance(metric: DistanceMetric, c: &BoolCounts) -> Result<f64> {
    let mismatched = c.tf + c.ft;
    let d = match metric {
        DistanceMetric::Dice => mismatched / (2.0 * c.tt + mismatched),
        DistanceMetric::Kulczynski1 => c.tt / mismatched,
        DistanceMetric::RogersTanimoto | DistanceMetric::SokalMichener => {
            let r = 2.0 * mismatched;
            r / (c.tt + c.ff + r)
        },
        DistanceMetric::RussellRao => (c.total() - c.tt) / c.total(),
        DistanceMetric::SokalSneath => {
            let r = 2.0 * mismatched;
            let den = c.tt + r;
            if den == 0.0 {
                return Err(Error::distance(
                    "sokal-sneath is undefined for two trajectories with no assigned labels",
                ));
            }
            r / den
        },
        DistanceMetric::Yule => {
            let half_r = c.tf * c.ft;
            if half_r == 0.0 { 0.0 } else { 2.0 * half_r / (c.tt * c.ff + half_r) }
        },
        other => {
            return Err(Error::distance(format!("{} is not a boolean metric", other)));
        },
    };
    Ok(d)
}

/// Sample variance (ddof = 1) of every column.
fn column_variances(matrix: &LabelMatrix) -> Vec<f64> {
    let (m, n) = (matrix.nrows(), matrix.ncols());
    let means = column_means(matrix);
    (0..n)
        .map(|j| {
            let ss: f64 = matrix.rows().map(|r| (r[j] as f64 - means[j]).powi(2)).sum();
            ss / (m as f64 - 1.0)
        })
        .collect()
}

fn column_means(matrix: &LabelMatrix) -> Vec<f64> {
    let (m, n) = (matrix.nrows(), matrix.ncols());
    let mut means = vec![0.0; n];
    for row in matrix.rows() {
        for (mean, &x) in means.iter_mut().zip(row) {
            *mean += x as f64;
        }
    }
    means.iter_mut().for_each(|x| *x /= m as f64);
    means
}

/// Sample covariance (ddof = 1) between the columns.
fn covariance(matrix: &LabelMatrix) -> DMatrix<f64> {
    let (m, n) = (matrix.nrows(), matrix.ncols());
    let means = column_means(matrix);
    let centered = DMatrix::from_fn(m, n, |i, j| matrix.get(i, j) as f64 - means[j]);
    centered.tr_mul(&centered) / (m as f64 - 1.0)
}

fn inverse_covariance(matrix: &LabelMatrix) -> Result<DMatrix<f64>> {
    covariance(matrix)
        .try_inverse()
        .filter(|inv| inv.iter().all(|x| x.is_finite()))
        .ok_or_else(|| {
            Error::distance("covariance of the label matrix is singular; mahalanobis is undefined")
        })
}
