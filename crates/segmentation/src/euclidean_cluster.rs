use std::collections::VecDeque;
use tabletop_core::PointCloud;
use tabletop_spatial::KdTree;

/// Partition a point cloud into Euclidean connected components.
///
/// Points whose pairwise distance is at most `tolerance` are connected;
/// each component forms a cluster, grown by breadth-first expansion over
/// kd-tree radius queries. Components smaller than `min_size` are dropped
/// entirely.
///
/// Clusters are returned in **discovery order**: components are seeded
/// from the lowest-index unvisited point, so the outer ordering follows
/// the index of each component's first point. Callers that take the first
/// N clusters depend on this ordering; do not re-sort it. Indices within
/// each cluster are sorted ascending (membership only, no shape implied).
pub fn euclidean_cluster(cloud: &PointCloud, tolerance: f64, min_size: usize) -> Vec<Vec<usize>> {
    if cloud.is_empty() || tolerance <= 0.0 || min_size == 0 {
        return Vec::new();
    }

    let tree = KdTree::build(cloud);
    let n = cloud.len();
    let mut visited = vec![false; n];
    let mut clusters = Vec::new();

    for i in 0..n {
        if visited[i] {
            continue;
        }

        let mut cluster = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(i);
        visited[i] = true;

        while let Some(current) = queue.pop_front() {
            cluster.push(current);

            let query = cloud.point(current);
            let neighbors = tree.radius_search(&query, tolerance);

            for neighbor in neighbors {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        if cluster.len() >= min_size {
            cluster.sort_unstable();
            clusters.push(cluster);
        }
    }

    clusters
}
