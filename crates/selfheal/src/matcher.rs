//! Nearest-neighbor retrieval over encoded rows.
//!
//! [`SimilarityIndex`] is the seam the healer searches through; [`CosineKnn`]
//! is the exhaustive cosine backend used by default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encoder::FeatureMatrix;
use crate::result::{HealError, HealResult};

/// Neighbor search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborAlgorithm {
    /// Let the backend choose; exhaustive search for cosine
    #[default]
    Auto,
    /// Exhaustive search
    Brute,
    /// k-d tree; requires a true metric, so not usable with cosine
    KdTree,
    /// Ball tree; requires a true metric, so not usable with cosine
    BallTree,
}

impl NeighborAlgorithm {
    /// Name as used in configuration
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Brute => "brute",
            Self::KdTree => "kd_tree",
            Self::BallTree => "ball_tree",
        }
    }

    /// Whether the strategy can search under cosine distance
    #[must_use]
    pub const fn supports_cosine(self) -> bool {
        matches!(self, Self::Auto | Self::Brute)
    }
}

impl fmt::Display for NeighborAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NeighborAlgorithm {
    type Err = HealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "brute" => Ok(Self::Brute),
            "kd_tree" | "kdtree" => Ok(Self::KdTree),
            "ball_tree" | "balltree" => Ok(Self::BallTree),
            other => Err(HealError::invalid_config(format!(
                "unknown neighbor algorithm '{other}'"
            ))),
        }
    }
}

/// A retrieved row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row index in the fitted matrix
    pub index: usize,
    /// Distance to the query
    pub distance: f64,
}

impl Neighbor {
    /// Cosine similarity, `1 - distance`
    #[must_use]
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

/// Fit/query capability behind the healer
pub trait SimilarityIndex {
    /// Fitted state
    type Index;

    /// Build an index over `rows`
    fn fit(&self, rows: &FeatureMatrix) -> HealResult<Self::Index>;

    /// Up to `k` nearest rows to `vector`, closest first. `k` larger than
    /// the index is clamped.
    fn query(&self, index: &Self::Index, vector: &[f64], k: usize) -> HealResult<Vec<Neighbor>>;
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Cosine distance in `[0, 2]`; a zero vector on either side is at
/// distance `1`
#[must_use]
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let (na, nb) = (norm(a), norm(b));
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (1.0 - dot / (na * nb)).clamp(0.0, 2.0)
}

/// Exhaustive cosine nearest-neighbor search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CosineKnn {
    algorithm: NeighborAlgorithm,
}

impl CosineKnn {
    /// Backend using `algorithm`; tree strategies are rejected
    pub fn new(algorithm: NeighborAlgorithm) -> HealResult<Self> {
        if !algorithm.supports_cosine() {
            return Err(HealError::invalid_config(format!(
                "neighbor algorithm '{algorithm}' does not support the cosine metric"
            )));
        }
        Ok(Self { algorithm })
    }

    /// Configured strategy
    #[must_use]
    pub const fn algorithm(&self) -> NeighborAlgorithm {
        self.algorithm
    }
}

/// Rows fitted by [`CosineKnn`]
#[derive(Debug, Clone)]
pub struct CosineIndex {
    rows: Vec<Vec<f64>>,
    width: usize,
}

impl CosineIndex {
    /// Number of indexed rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when nothing is indexed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl SimilarityIndex for CosineKnn {
    type Index = CosineIndex;

    fn fit(&self, rows: &FeatureMatrix) -> HealResult<CosineIndex> {
        if rows.is_empty() {
            return Err(HealError::matching("cannot fit an index on zero rows"));
        }
        Ok(CosineIndex {
            rows: rows.rows().to_vec(),
            width: rows.width(),
        })
    }

    fn query(&self, index: &CosineIndex, vector: &[f64], k: usize) -> HealResult<Vec<Neighbor>> {
        if vector.len() != index.width {
            return Err(HealError::matching(format!(
                "query has {} features, index has {}",
                vector.len(),
                index.width
            )));
        }
        let k = k.min(index.len());
        if k == 0 {
            return Err(HealError::matching("no neighbors requested"));
        }

        let mut neighbors = Vec::with_capacity(index.len());
        for (i, row) in index.rows.iter().enumerate() {
            let distance = cosine_distance(row, vector);
            if !distance.is_finite() {
                return Err(HealError::matching(format!(
                    "non-finite distance to row {i}"
                )));
            }
            neighbors.push(Neighbor { index: i, distance });
        }
        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }
}

/// Fit `backend` on `page` and return the row closest to `element`
pub fn nearest<S: SimilarityIndex>(
    backend: &S,
    page: &FeatureMatrix,
    element: &[f64],
    k: usize,
) -> HealResult<Neighbor> {
    let index = backend.fit(page)?;
    backend
        .query(&index, element, k)?
        .into_iter()
        .next()
        .ok_or_else(|| HealError::matching("index returned no neighbors"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[f64]]) -> FeatureMatrix {
        let width = rows.first().map_or(0, |r| r.len());
        FeatureMatrix::new(width, rows.iter().map(|r| r.to_vec()).collect()).unwrap()
    }

    mod distance_tests {
        use super::*;

        #[test]
        fn test_identical_vectors_have_zero_distance() {
            assert!(cosine_distance(&[1.0, 0.0, 1.0], &[1.0, 0.0, 1.0]).abs() < 1e-12);
        }

        #[test]
        fn test_orthogonal_vectors_have_unit_distance() {
            assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
        }

        #[test]
        fn test_zero_vector_is_unit_distance_not_nan() {
            let d = cosine_distance(&[0.0, 0.0], &[1.0, 0.0]);
            assert!((d - 1.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_partial_overlap() {
            // two of three features shared
            let d = cosine_distance(&[1.0, 1.0, 0.0], &[1.0, 1.0, 1.0]);
            let expected = 1.0 - 2.0 / (2.0_f64.sqrt() * 3.0_f64.sqrt());
            assert!((d - expected).abs() < 1e-12);
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_nearest_picks_closest_row() {
            let page = matrix(&[&[1.0, 0.0, 0.0], &[0.0, 1.0, 1.0], &[0.0, 1.0, 0.0]]);
            let best = nearest(&CosineKnn::default(), &page, &[0.0, 1.0, 1.0], 1).unwrap();
            assert_eq!(best.index, 1);
            assert!((best.similarity() - 1.0).abs() < 1e-12);
        }

        #[test]
        fn test_k_is_clamped_to_row_count() {
            let page = matrix(&[&[1.0, 0.0], &[0.0, 1.0]]);
            let knn = CosineKnn::default();
            let index = knn.fit(&page).unwrap();
            let found = knn.query(&index, &[1.0, 0.0], 10).unwrap();
            assert_eq!(found.len(), 2);
            assert_eq!(found[0].index, 0);
        }

        #[test]
        fn test_ties_prefer_lower_row() {
            let page = matrix(&[&[0.0, 1.0], &[1.0, 0.0], &[1.0, 0.0]]);
            let best = nearest(&CosineKnn::default(), &page, &[1.0, 0.0], 1).unwrap();
            assert_eq!(best.index, 1);
        }

        #[test]
        fn test_zero_query_matches_first_row_with_zero_similarity() {
            let page = matrix(&[&[0.0, 1.0], &[1.0, 0.0]]);
            let best = nearest(&CosineKnn::default(), &page, &[0.0, 0.0], 1).unwrap();
            assert_eq!(best.index, 0);
            assert!(best.similarity().abs() < f64::EPSILON);
        }

        #[test]
        fn test_empty_matrix_fails() {
            let empty = FeatureMatrix::new(3, Vec::new()).unwrap();
            let err = CosineKnn::default().fit(&empty).unwrap_err();
            assert!(matches!(err, HealError::Matching { .. }));
        }

        #[test]
        fn test_zero_k_fails() {
            let page = matrix(&[&[1.0]]);
            let knn = CosineKnn::default();
            let index = knn.fit(&page).unwrap();
            assert!(knn.query(&index, &[1.0], 0).is_err());
        }

        #[test]
        fn test_dimension_mismatch_fails() {
            let page = matrix(&[&[1.0, 0.0]]);
            assert!(nearest(&CosineKnn::default(), &page, &[1.0], 1).is_err());
        }

        #[test]
        fn test_nan_input_fails() {
            let page = matrix(&[&[f64::NAN, 1.0]]);
            assert!(nearest(&CosineKnn::default(), &page, &[1.0, 1.0], 1).is_err());
        }
    }

    mod algorithm_tests {
        use super::*;

        #[test]
        fn test_parse_names() {
            assert_eq!("auto".parse::<NeighborAlgorithm>().unwrap(), NeighborAlgorithm::Auto);
            assert_eq!("BRUTE".parse::<NeighborAlgorithm>().unwrap(), NeighborAlgorithm::Brute);
            assert_eq!(
                "kd_tree".parse::<NeighborAlgorithm>().unwrap(),
                NeighborAlgorithm::KdTree
            );
            assert!("lsh".parse::<NeighborAlgorithm>().is_err());
        }

        #[test]
        fn test_tree_algorithms_reject_cosine() {
            assert!(CosineKnn::new(NeighborAlgorithm::Auto).is_ok());
            assert!(CosineKnn::new(NeighborAlgorithm::Brute).is_ok());
            let err = CosineKnn::new(NeighborAlgorithm::BallTree).unwrap_err();
            assert!(err.to_string().contains("cosine"));
        }

        #[test]
        fn test_serde_snake_case() {
            let json = serde_json::to_string(&NeighborAlgorithm::KdTree).unwrap();
            assert_eq!(json, "\"kd_tree\"");
        }
    }
}
