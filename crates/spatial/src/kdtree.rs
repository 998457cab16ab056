use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use std::num::NonZero;
use tabletop_core::PointCloud;

/// A kd-tree for spatial queries over a 3D point cloud.
///
/// Built on kiddo's `ImmutableKdTree`: the tree is constructed once from
/// the cloud and queried read-only afterwards, which matches the
/// frame-scoped lifecycle of everything in this pipeline. Stored items are
/// `u32` indices back into the source cloud.
#[derive(Debug, Clone)]
pub struct KdTree {
    tree: ImmutableKdTree<f64, u32, 3, 32>,
    num_points: usize,
}

impl KdTree {
    pub fn build(cloud: &PointCloud) -> Self {
        let n = cloud.len();
        if n == 0 {
            return Self {
                tree: ImmutableKdTree::new_from_slice(&[]),
                num_points: 0,
            };
        }

        let points: Vec<[f64; 3]> = cloud.iter_points().collect();
        let tree = ImmutableKdTree::new_from_slice(&points);

        Self {
            tree,
            num_points: n,
        }
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Indices of the `k` nearest neighbours of `query`, nearest first.
    ///
    /// Returns empty if `k == 0`, the tree is empty, or the query is not
    /// finite. If `k` exceeds the point count, all points are returned.
    pub fn knn_indices(&self, query: &[f64; 3], k: usize) -> Vec<usize> {
        if k == 0 || self.is_empty() || !query.iter().all(|v| v.is_finite()) {
            return Vec::new();
        }

        let nz_k = NonZero::new(k).unwrap();
        let results = self.tree.nearest_n::<SquaredEuclidean>(query, nz_k);

        results.iter().map(|nn| nn.item as usize).collect()
    }

    /// Indices of all points within Euclidean `radius` of `query`
    /// (boundary inclusive), sorted ascending for deterministic output.
    pub fn radius_search(&self, query: &[f64; 3], radius: f64) -> Vec<usize> {
        if self.is_empty()
            || radius <= 0.0
            || !radius.is_finite()
            || !query.iter().all(|v| v.is_finite())
        {
            return Vec::new();
        }

        let radius_sq = radius * radius;

        // kiddo's `within_unsorted` uses strict `<`; widen the query by an
        // epsilon and post-filter with `<=` so boundary points are kept.
        let query_radius_sq = radius_sq + f64::EPSILON * radius_sq.max(1.0);

        let results = self
            .tree
            .within_unsorted::<SquaredEuclidean>(query, query_radius_sq);

        let mut indices: Vec<usize> = results
            .into_iter()
            .filter(|nn| nn.distance <= radius_sq)
            .map(|nn| nn.item as usize)
            .collect();

        indices.sort_unstable();

        indices
    }
}
