//! Pairwise distances between label trajectories.
//!
//! [`DistanceMetric`] names one of the standard pairwise metrics. The
//! [`metrics`] module evaluates a metric on two label rows and
//! [`pairwise`] spreads the upper triangle of the matrix over a worker pool.

pub mod metrics;
pub mod pairwise;

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use crate::error::Error;

pub use self::metrics::PreparedMetric;
pub use self::pairwise::DistanceEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DistanceMetric {
    BrayCurtis,
    Canberra,
    Chebyshev,
    CityBlock,
    Correlation,
    Cosine,
    Dice,
    Euclidean,
    Hamming,
    Jaccard,
    JensenShannon,
    Kulczynski1,
    Mahalanobis,
    Matching,
    Minkowski,
    RogersTanimoto,
    RussellRao,
    SEuclidean,
    SokalMichener,
    SokalSneath,
    SqEuclidean,
    Yule,
}

impl DistanceMetric {
    pub const ALL: [DistanceMetric; 22] = [
        Self::BrayCurtis,
        Self::Canberra,
        Self::Chebyshev,
        Self::CityBlock,
        Self::Correlation,
        Self::Cosine,
        Self::Dice,
        Self::Euclidean,
        Self::Hamming,
        Self::Jaccard,
        Self::JensenShannon,
        Self::Kulczynski1,
        Self::Mahalanobis,
        Self::Matching,
        Self::Minkowski,
        Self::RogersTanimoto,
        Self::RussellRao,
        Self::SEuclidean,
        Self::SokalMichener,
        Self::SokalSneath,
        Self::SqEuclidean,
        Self::Yule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrayCurtis => "bray-curtis",
            Self::Canberra => "canberra",
            Self::Chebyshev => "chebyshev",
            Self::CityBlock => "cityblock",
            Self::Correlation => "correlation",
            Self::Cosine => "cosine",
            Self::Dice => "dice",
            Self::Euclidean => "euclidean",
            Self::Hamming => "hamming",
            Self::Jaccard => "jaccard",
            Self::JensenShannon => "jensen-shannon",
            Self::Kulczynski1 => "kulczynski1",
            Self::Mahalanobis => "mahalanobis",
            Self::Matching => "matching",
            Self::Minkowski => "minkowski",
            Self::RogersTanimoto => "rogers-tanimoto",
            Self::RussellRao => "russell-rao",
            Self::SEuclidean => "seuclidean",
            Self::SokalMichener => "sokal-michener",
            Self::SokalSneath => "sokal-sneath",
            Self::SqEuclidean => "sq-euclidean",
            Self::Yule => "yule",
        }
    }

    /// Metrics that only look at whether a label is nonzero.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Self::Dice
                | Self::Kulczynski1
                | Self::RogersTanimoto
                | Self::RussellRao
                | Self::SokalMichener
                | Self::SokalSneath
                | Self::Yule
        )
    }

    /// Metrics that give 0 for identical rows and treat labels as categories.
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Hamming | Self::Matching | Self::Jaccard)
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|m| m.as_str()).collect()
    }
}

impl Default for DistanceMetric {
    fn default() -> Self {
        Self::Hamming
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    /// Accepts the hyphenated names as well as the compact ones (`braycurtis`, `sqeuclidean`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .trim_matches('"')
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().replace('-', "") == normalized)
            .ok_or_else(|| Error::config(format!(
                "Unsupported distance metric '{}'; expected one of: {}",
                s,
                Self::names().join(", ")
            )))
    }
}

impl TryFrom<String> for DistanceMetric {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DistanceMetric> for String {
    fn from(metric: DistanceMetric) -> Self {
        metric.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_both_spellings() {
        assert_eq!("bray-curtis".parse::<DistanceMetric>().unwrap(), DistanceMetric::BrayCurtis);
        assert_eq!("braycurtis".parse::<DistanceMetric>().unwrap(), DistanceMetric::BrayCurtis);
        assert_eq!("SQEUCLIDEAN".parse::<DistanceMetric>().unwrap(), DistanceMetric::SqEuclidean);
        assert_eq!("jensenshannon".parse::<DistanceMetric>().unwrap(), DistanceMetric::JensenShannon);
        assert_eq!("kulczynski1".parse::<DistanceMetric>().unwrap(), DistanceMetric::Kulczynski1);
    }

    #[test]
    fn test_every_name_round_trips() {
        for metric in DistanceMetric::ALL {
            assert_eq!(metric.as_str().parse::<DistanceMetric>().unwrap(), metric);
        }
    }

    #[test]
    fn test_unknown_metric_is_config_error() {
        let err = "levenshtein".parse::<DistanceMetric>().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&DistanceMetric::RogersTanimoto).unwrap();
        assert_eq!(json, "\"rogers-tanimoto\"");
        let back: DistanceMetric = serde_json::from_str("\"rogerstanimoto\"").unwrap();
        assert_eq!(back, DistanceMetric::RogersTanimoto);
    }
}
