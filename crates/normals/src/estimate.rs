use rayon::prelude::*;
use tabletop_core::{Normals, PointCloud};
use tabletop_spatial::KdTree;

/// Estimate a surface normal per point from its `k` nearest neighbors.
///
/// For each point the neighborhood covariance is built and the eigenvector
/// of its smallest eigenvalue taken as the normal. Normals are unit length
/// and oriented to face the sensor origin; downstream consumers compare
/// them through absolute dot products, so the residual sign ambiguity of
/// PCA is harmless.
///
/// A point whose neighborhood has fewer than `k` members, or whose
/// neighborhood is too degenerate to define a plane, gets `valid = false`
/// and must be skipped by the plane fitter. This is the only effect of a
/// normal-estimation gap; it never fails the frame by itself.
///
/// The per-point computation is parallelized with rayon.
pub fn estimate_normals(cloud: &PointCloud, k: usize) -> Normals {
    estimate_normals_with_viewpoint(cloud, k, [0.0, 0.0, 0.0])
}

/// Same as [`estimate_normals`] but orients normals toward the given
/// viewpoint instead of the origin.
pub fn estimate_normals_with_viewpoint(
    cloud: &PointCloud,
    k: usize,
    viewpoint: [f64; 3],
) -> Normals {
    if cloud.is_empty() || k == 0 {
        return Normals {
            nx: vec![],
            ny: vec![],
            nz: vec![],
            valid: vec![],
        };
    }

    let tree = KdTree::build(cloud);
    let n = cloud.len();

    let points: Vec<[f64; 3]> = cloud.iter_points().collect();

    let normals_vec: Vec<([f64; 3], bool)> = points
        .par_iter()
        .map(|point| {
            let indices = tree.knn_indices(point, k);

            if indices.len() < k {
                return ([0.0, 0.0, 1.0], false);
            }

            let count = indices.len() as f64;

            // Centroid of the neighborhood
            let mut cx = 0.0f64;
            let mut cy = 0.0f64;
            let mut cz = 0.0f64;
            for &idx in &indices {
                cx += points[idx][0];
                cy += points[idx][1];
                cz += points[idx][2];
            }
            cx /= count;
            cy /= count;
            cz /= count;

            // Upper triangle of the 3x3 covariance matrix (symmetric)
            let mut c00 = 0.0f64;
            let mut c01 = 0.0f64;
            let mut c02 = 0.0f64;
            let mut c11 = 0.0f64;
            let mut c12 = 0.0f64;
            let mut c22 = 0.0f64;
            for &idx in &indices {
                let dx = points[idx][0] - cx;
                let dy = points[idx][1] - cy;
                let dz = points[idx][2] - cz;
                c00 += dx * dx;
                c01 += dx * dy;
                c02 += dx * dz;
                c11 += dy * dy;
                c12 += dy * dz;
                c22 += dz * dz;
            }

            let Some((mut nnx, mut nny, mut nnz)) =
                smallest_eigenvector_3x3(c00, c01, c02, c11, c12, c22)
            else {
                return ([0.0, 0.0, 1.0], false);
            };

            let len = (nnx * nnx + nny * nny + nnz * nnz).sqrt();
            if len < 1e-12 {
                return ([0.0, 0.0, 1.0], false);
            }
            nnx /= len;
            nny /= len;
            nnz /= len;

            // Orient toward viewpoint
            let vx = viewpoint[0] - point[0];
            let vy = viewpoint[1] - point[1];
            let vz = viewpoint[2] - point[2];
            let dot = nnx * vx + nny * vy + nnz * vz;
            if dot < 0.0 {
                nnx = -nnx;
                nny = -nny;
                nnz = -nnz;
            }

            ([nnx, nny, nnz], true)
        })
        .collect();

    let mut nx = Vec::with_capacity(n);
    let mut ny = Vec::with_capacity(n);
    let mut nz = Vec::with_capacity(n);
    let mut valid = Vec::with_capacity(n);
    for (normal, ok) in &normals_vec {
        nx.push(normal[0]);
        ny.push(normal[1]);
        nz.push(normal[2]);
        valid.push(*ok);
    }

    Normals { nx, ny, nz, valid }
}

/// Eigenvector of the smallest eigenvalue of a 3x3 symmetric matrix, via
/// Cardano's formula for the eigenvalues and a cross-product of rows of
/// `A - λI` for the null-space direction.
///
/// The matrix is:
///   | a00  a01  a02 |
///   | a01  a11  a12 |
///   | a02  a12  a22 |
///
/// Returns `None` when the matrix is too close to a multiple of the
/// identity for the eigenvector to be meaningful (fully degenerate
/// neighborhood, e.g. a single repeated point).
#[inline]
fn smallest_eigenvector_3x3(
    a00: f64,
    a01: f64,
    a02: f64,
    a11: f64,
    a12: f64,
    a22: f64,
) -> Option<(f64, f64, f64)> {
    let m = (a00 + a11 + a22) / 3.0; // trace / 3

    // Shift: B = A - mI
    let b00 = a00 - m;
    let b11 = a11 - m;
    let b22 = a22 - m;

    // q = det(B) / 2
    let q = (b00 * (b11 * b22 - a12 * a12) - a01 * (a01 * b22 - a12 * a02)
        + a02 * (a01 * a12 - b11 * a02))
        / 2.0;

    // p = sum of squares of B entries / 6
    let p = (b00 * b00 + b11 * b11 + b22 * b22 + 2.0 * (a01 * a01 + a02 * a02 + a12 * a12)) / 6.0;

    let pp = p.max(0.0); // guard against tiny negatives from floating point

    if pp < 1e-30 {
        return None;
    }

    let det_ratio = (q / (pp * pp.sqrt())).clamp(-1.0, 1.0);
    let phi = det_ratio.acos() / 3.0;

    // Eigenvalues (eig0 <= eig1 <= eig2)
    let sqrt_p = pp.sqrt();
    let eig0 = m + 2.0 * sqrt_p * (phi + 2.0 * std::f64::consts::FRAC_PI_3).cos();
    let eig2 = m + 2.0 * sqrt_p * phi.cos();
    let eig1 = 3.0 * m - eig0 - eig2; // trace identity

    let lambda = if eig0.abs() <= eig1.abs() && eig0.abs() <= eig2.abs() {
        eig0
    } else if eig1.abs() <= eig2.abs() {
        eig1
    } else {
        eig2
    };

    // (A - λI) has rank <= 2; a cross product of two of its rows spans the
    // null space, i.e. the eigenvector.
    let r00 = a00 - lambda;
    let r11 = a11 - lambda;
    let r22 = a22 - lambda;

    let candidates = [
        (
            a01 * a12 - r11 * a02,
            a02 * a01 - a12 * r00,
            r00 * r11 - a01 * a01,
        ),
        (
            a01 * r22 - a12 * a02,
            a02 * a02 - r22 * r00,
            r00 * a12 - a01 * a02,
        ),
        (
            r11 * r22 - a12 * a12,
            a12 * a02 - r22 * a01,
            a01 * a12 - r11 * a02,
        ),
    ];

    for (ex, ey, ez) in candidates {
        let len2 = ex * ex + ey * ey + ez * ez;
        if len2 >= 1e-30 {
            let inv = 1.0 / len2.sqrt();
            return Some((ex * inv, ey * inv, ez * inv));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use tabletop_core::PointCloud;

    /// Grid of points on the z~=0 plane.
    ///
    /// A tiny deterministic per-point perturbation keeps kiddo's
    /// bucket-based tree happy when many points share an axis value.
    fn xy_plane_cloud(grid_size: usize, spacing: f64) -> PointCloud {
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut z = Vec::new();
        let mut idx = 0u32;
        for i in 0..grid_size {
            for j in 0..grid_size {
                x.push(i as f64 * spacing);
                y.push(j as f64 * spacing);
                z.push(idx as f64 * 1e-9);
                idx += 1;
            }
        }
        PointCloud::from_xyz(x, y, z)
    }

    #[test]
    fn normals_of_xy_plane() {
        let cloud = xy_plane_cloud(10, 1.0);
        let normals = estimate_normals(&cloud, 10);

        assert_eq!(normals.len(), cloud.len());

        for i in 0..cloud.len() {
            assert!(normals.is_valid(i));
            let nz_abs = normals.nz[i].abs();
            assert!(
                nz_abs > 0.9,
                "Point {}: normal z component is {} (expected ~1.0), full normal = {:?}",
                i,
                nz_abs,
                normals.normal(i)
            );
        }
    }

    #[test]
    fn normals_are_unit_length() {
        let cloud = xy_plane_cloud(5, 1.0);
        let normals = estimate_normals(&cloud, 5);

        for i in 0..cloud.len() {
            let [nx, ny, nz] = normals.normal(i);
            let len = (nx * nx + ny * ny + nz * nz).sqrt();
            assert_abs_diff_eq!(len, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn normals_empty_cloud() {
        let normals = estimate_normals(&PointCloud::new(), 10);
        assert!(normals.is_empty());
    }

    #[test]
    fn too_few_neighbors_marks_invalid() {
        // 3 points but k = 5: every neighborhood is short, so every
        // normal is a gap.
        let cloud = PointCloud::from_xyz(
            vec![0.0, 1.0, 2.0],
            vec![0.0, 0.1, 0.2],
            vec![0.0, 0.2, 0.4],
        );
        let normals = estimate_normals(&cloud, 5);
        assert_eq!(normals.len(), 3);
        for i in 0..3 {
            assert!(!normals.is_valid(i));
        }
    }

    #[test]
    fn k_zero_returns_empty() {
        let cloud = PointCloud::from_xyz(vec![1.0], vec![2.0], vec![3.0]);
        let normals = estimate_normals(&cloud, 0);
        assert!(normals.is_empty());
    }

    #[test]
    fn viewpoint_flips_direction() {
        // Plane at z ~ 5. Viewpoint above => +z normals; below => -z.
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut z = Vec::new();
        let mut idx = 0u32;
        for i in 0..10 {
            for j in 0..10 {
                x.push(i as f64);
                y.push(j as f64);
                z.push(5.0 + idx as f64 * 1e-9);
                idx += 1;
            }
        }
        let cloud = PointCloud::from_xyz(x, y, z);

        let above = estimate_normals_with_viewpoint(&cloud, 10, [5.0, 5.0, 100.0]);
        let below = estimate_normals_with_viewpoint(&cloud, 10, [5.0, 5.0, -100.0]);

        for i in [44, 45, 55, 54] {
            assert!(
                above.nz[i] > 0.9,
                "viewpoint above: normal z at {} is {}",
                i,
                above.nz[i]
            );
            assert!(
                below.nz[i] < -0.9,
                "viewpoint below: normal z at {} is {}",
                i,
                below.nz[i]
            );
        }
    }

    proptest! {
        #[test]
        fn valid_normals_are_unit_length(
            pts in prop::collection::vec(
                (-10.0f64..10.0, -10.0f64..10.0, -10.0f64..10.0),
                5..50
            )
        ) {
            let cloud = PointCloud::from_xyz(
                pts.iter().map(|p| p.0).collect(),
                pts.iter().map(|p| p.1).collect(),
                pts.iter().map(|p| p.2).collect(),
            );
            let normals = estimate_normals(&cloud, 5);
            prop_assert_eq!(normals.len(), cloud.len());

            for i in 0..cloud.len() {
                if !normals.is_valid(i) {
                    continue;
                }
                let [nx, ny, nz] = normals.normal(i);
                let len = (nx * nx + ny * ny + nz * nz).sqrt();
                prop_assert!(
                    (len - 1.0).abs() < 1e-6,
                    "normal at index {} has length {}", i, len
                );
            }
        }
    }
}
