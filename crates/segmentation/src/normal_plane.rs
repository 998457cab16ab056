use nalgebra::Matrix3;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tabletop_core::{Normals, PointCloud};

/// A 3D plane model in the form `n . x + d = 0`, where `n` is a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneModel {
    pub normal: [f64; 3],
    pub d: f64,
}

impl PlaneModel {
    /// Signed distance from a point to this plane. Positive on the side
    /// the normal points to. Assumes `normal` is a unit vector.
    #[inline]
    pub fn signed_distance(&self, point: &[f64; 3]) -> f64 {
        self.normal[0] * point[0] + self.normal[1] * point[1] + self.normal[2] * point[2] + self.d
    }

    /// Absolute distance from a point to this plane.
    #[inline]
    pub fn distance_to_point(&self, point: &[f64; 3]) -> f64 {
        self.signed_distance(point).abs()
    }

    /// Orthogonal projection of a point onto this plane.
    #[inline]
    pub fn project(&self, point: &[f64; 3]) -> [f64; 3] {
        let dist = self.signed_distance(point);
        [
            point[0] - dist * self.normal[0],
            point[1] - dist * self.normal[1],
            point[2] - dist * self.normal[2],
        ]
    }
}

impl Default for PlaneModel {
    fn default() -> Self {
        Self {
            normal: [0.0, 0.0, 1.0],
            d: 0.0,
        }
    }
}

/// Parameters for the normal-constrained RANSAC plane search.
#[derive(Debug, Clone, Copy)]
pub struct NormalPlaneParams {
    /// Inlier threshold on the blended point/normal distance.
    pub distance_threshold: f64,
    /// Hard iteration budget.
    pub max_iterations: usize,
    /// Target confidence for adaptive early termination, in (0, 1).
    pub probability: f64,
    /// Blend factor in [0, 1]: 0 uses only point-to-plane distance, 1 only
    /// the angle between the point normal and the hypothesis normal.
    pub normal_distance_weight: f64,
    /// Orientation prior: the fitted plane normal must lie within
    /// `eps_angle` of this axis, comparing through absolute dot products
    /// so either orientation of the normal is acceptable.
    pub axis: [f64; 3],
    /// Max angular deviation from `axis`, in radians.
    pub eps_angle: f64,
}

impl Default for NormalPlaneParams {
    fn default() -> Self {
        Self {
            distance_threshold: 0.03,
            max_iterations: 500,
            probability: 0.99,
            normal_distance_weight: 0.1,
            axis: [0.0, 0.0, 1.0],
            eps_angle: 15.0_f64.to_radians(),
        }
    }
}

/// Orientation prior for a sensor pitched about its x axis by `tilt`
/// radians: the sensor-frame +z axis rotated by `tilt + 90°`, with
/// absolute-valued components (the prior is orientation-insensitive).
pub fn axis_from_tilt(tilt: f64) -> [f64; 3] {
    let a = tilt + std::f64::consts::FRAC_PI_2;
    // Rotating (0, 0, 1) about +x by a gives (0, -sin a, cos a).
    [0.0, a.sin().abs(), a.cos().abs()]
}

/// Fits an axis-constrained plane with a seed drawn from the thread RNG.
/// For reproducible results use [`segment_normal_plane_seeded`].
pub fn segment_normal_plane(
    cloud: &PointCloud,
    normals: &Normals,
    params: &NormalPlaneParams,
) -> (PlaneModel, Vec<usize>) {
    let seed = rand::thread_rng().next_u64();
    segment_normal_plane_seeded(cloud, normals, params, seed)
}

/// Fits a plane to the cloud with RANSAC, restricted to hypotheses whose
/// normal lies within `eps_angle` of `params.axis`.
///
/// # Algorithm
///
/// 1. Restrict the working set to points with valid normals.
/// 2. Repeatedly sample 3 distinct points, fit the exact plane through
///    them, and discard hypotheses violating the axis constraint.
/// 3. Score each hypothesis by its weighted consensus count: a point is an
///    inlier when `w * angle(point_normal, n) + (1 - w) * |n.p + d|` is
///    below the distance threshold, with `w = normal_distance_weight`.
/// 4. Stop early once the iteration count exceeds the number needed to hit
///    `probability` given the best inlier ratio so far, or at
///    `max_iterations`.
/// 5. Re-fit the winning model by least squares over its consensus set and
///    recompute the inlier set against the refined coefficients.
///
/// Returns the refined model and its inlier indices (indices into `cloud`).
/// Degenerate inputs (fewer than 3 usable points) yield a default model
/// with no inliers; the caller's minimum-inlier check handles that case.
pub fn segment_normal_plane_seeded(
    cloud: &PointCloud,
    normals: &Normals,
    params: &NormalPlaneParams,
    seed: u64,
) -> (PlaneModel, Vec<usize>) {
    assert_eq!(
        cloud.len(),
        normals.len(),
        "cloud and normals must be index-aligned"
    );
    assert!(
        params.probability > 0.0 && params.probability < 1.0,
        "probability must be in (0, 1)"
    );
    assert!(
        (0.0..=1.0).contains(&params.normal_distance_weight),
        "normal_distance_weight must be in [0, 1]"
    );

    let candidates: Vec<usize> = (0..cloud.len()).filter(|&i| normals.is_valid(i)).collect();

    if candidates.len() < 3 {
        return (PlaneModel::default(), Vec::new());
    }

    let points: Vec<[f64; 3]> = cloud.iter_points().collect();

    let axis = normalized(params.axis);
    let cos_eps = params.eps_angle.cos();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut best_model: Option<PlaneModel> = None;
    let mut best_count: usize = 0;
    let mut needed = params.max_iterations as f64;

    let mut iter = 0usize;
    while iter < params.max_iterations && (iter as f64) < needed {
        iter += 1;

        let Some((c0, c1, c2)) = sample_three_distinct(candidates.len(), &mut rng) else {
            break;
        };
        let (i0, i1, i2) = (candidates[c0], candidates[c1], candidates[c2]);

        let model = match fit_plane_from_three_points(&points[i0], &points[i1], &points[i2]) {
            Some(m) => m,
            None => continue,
        };

        // Orientation prior: |cos| comparison tolerates either normal sign.
        let axis_dot = dot(&model.normal, &axis).abs();
        if axis_dot < cos_eps {
            continue;
        }

        let count = count_weighted_inliers(&points, normals, &candidates, &model, params);

        if count > best_count {
            best_count = count;
            best_model = Some(model);

            // Standard RANSAC stopping criterion: iterations needed to draw
            // an all-inlier sample with the target probability.
            let w = best_count as f64 / candidates.len() as f64;
            let p_any_outlier = (1.0 - w.powi(3)).clamp(f64::EPSILON, 1.0 - f64::EPSILON);
            needed = (1.0 - params.probability).ln() / p_any_outlier.ln();
        }
    }

    let Some(model) = best_model else {
        return (PlaneModel::default(), Vec::new());
    };

    let consensus = collect_weighted_inliers(&points, normals, &candidates, &model, params);
    let mut refined = refine_plane(&points, &consensus, &model).unwrap_or(model);

    // Fix the sign so the returned normal agrees with the axis prior;
    // signed heights above the plane are then measured along the axis.
    if dot(&refined.normal, &axis) < 0.0 {
        refined.normal = [-refined.normal[0], -refined.normal[1], -refined.normal[2]];
        refined.d = -refined.d;
    }

    let inliers = collect_weighted_inliers(&points, normals, &candidates, &refined, params);

    (refined, inliers)
}

/// Blend of point-to-plane distance and normal-angle disagreement, as used
/// by the inlier test.
#[inline]
fn weighted_distance(
    point: &[f64; 3],
    point_normal: &[f64; 3],
    model: &PlaneModel,
    weight: f64,
) -> f64 {
    let d_euclid = model.distance_to_point(point);
    let cos_angle = dot(point_normal, &model.normal).abs().clamp(0.0, 1.0);
    let d_normal = cos_angle.acos();
    weight * d_normal + (1.0 - weight) * d_euclid
}

fn count_weighted_inliers(
    points: &[[f64; 3]],
    normals: &Normals,
    candidates: &[usize],
    model: &PlaneModel,
    params: &NormalPlaneParams,
) -> usize {
    let threshold = params.distance_threshold;
    let weight = params.normal_distance_weight;

    // Counting dominates the per-hypothesis cost; split across threads for
    // the frame sizes a depth sensor delivers.
    if candidates.len() >= 10_000 {
        candidates
            .par_iter()
            .filter(|&&i| weighted_distance(&points[i], &normals.normal(i), model, weight) <= threshold)
            .count()
    } else {
        candidates
            .iter()
            .filter(|&&i| weighted_distance(&points[i], &normals.normal(i), model, weight) <= threshold)
            .count()
    }
}

fn collect_weighted_inliers(
    points: &[[f64; 3]],
    normals: &Normals,
    candidates: &[usize],
    model: &PlaneModel,
    params: &NormalPlaneParams,
) -> Vec<usize> {
    let threshold = params.distance_threshold;
    let weight = params.normal_distance_weight;
    candidates
        .iter()
        .copied()
        .filter(|&i| weighted_distance(&points[i], &normals.normal(i), model, weight) <= threshold)
        .collect()
}

/// Least-squares re-fit over the consensus set: the plane through the
/// centroid whose normal is the smallest-eigenvalue eigenvector of the
/// covariance matrix. Keeps the orientation of `reference`.
fn refine_plane(points: &[[f64; 3]], inliers: &[usize], reference: &PlaneModel) -> Option<PlaneModel> {
    if inliers.len() < 3 {
        return None;
    }

    let n = inliers.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    let mut cz = 0.0;
    for &i in inliers {
        cx += points[i][0];
        cy += points[i][1];
        cz += points[i][2];
    }
    cx /= n;
    cy /= n;
    cz /= n;

    let mut c00 = 0.0;
    let mut c01 = 0.0;
    let mut c02 = 0.0;
    let mut c11 = 0.0;
    let mut c12 = 0.0;
    let mut c22 = 0.0;
    for &i in inliers {
        let dx = points[i][0] - cx;
        let dy = points[i][1] - cy;
        let dz = points[i][2] - cz;
        c00 += dx * dx;
        c01 += dx * dy;
        c02 += dx * dz;
        c11 += dy * dy;
        c12 += dy * dz;
        c22 += dz * dz;
    }

    let cov = Matrix3::new(c00, c01, c02, c01, c11, c12, c02, c12, c22);
    let eigen = cov.symmetric_eigen();

    let mut min_i = 0;
    for i in 1..3 {
        if eigen.eigenvalues[i] < eigen.eigenvalues[min_i] {
            min_i = i;
        }
    }
    let v = eigen.eigenvectors.column(min_i);
    let mut normal = normalized([v[0], v[1], v[2]]);
    if !normal.iter().all(|c| c.is_finite()) {
        return None;
    }

    if dot(&normal, &reference.normal) < 0.0 {
        normal = [-normal[0], -normal[1], -normal[2]];
    }

    let d = -(normal[0] * cx + normal[1] * cy + normal[2] * cz);
    Some(PlaneModel { normal, d })
}

/// Samples 3 distinct indices in [0, n).
fn sample_three_distinct(n: usize, rng: &mut StdRng) -> Option<(usize, usize, usize)> {
    if n < 3 {
        return None;
    }
    let i0 = rng.gen_range(0..n);
    let mut i1 = rng.gen_range(0..n);
    let mut attempts = 0;
    while i1 == i0 {
        if attempts > 100 {
            return None;
        }
        i1 = rng.gen_range(0..n);
        attempts += 1;
    }
    let mut i2 = rng.gen_range(0..n);
    attempts = 0;
    while i2 == i0 || i2 == i1 {
        if attempts > 100 {
            return None;
        }
        i2 = rng.gen_range(0..n);
        attempts += 1;
    }
    Some((i0, i1, i2))
}

/// Fits a plane through 3 points, returning `None` if they are collinear.
fn fit_plane_from_three_points(p0: &[f64; 3], p1: &[f64; 3], p2: &[f64; 3]) -> Option<PlaneModel> {
    let v1 = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
    let v2 = [p2[0] - p0[0], p2[1] - p0[1], p2[2] - p0[2]];

    let nx = v1[1] * v2[2] - v1[2] * v2[1];
    let ny = v1[2] * v2[0] - v1[0] * v2[2];
    let nz = v1[0] * v2[1] - v1[1] * v2[0];

    let len = (nx * nx + ny * ny + nz * nz).sqrt();

    if len < 1e-12 {
        return None;
    }

    let normal = [nx / len, ny / len, nz / len];
    let d = -(normal[0] * p0[0] + normal[1] * p0[1] + normal[2] * p0[2]);

    Some(PlaneModel { normal, d })
}

#[inline]
fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn normalized(v: [f64; 3]) -> [f64; 3] {
    let len = dot(&v, &v).sqrt();
    [v[0] / len, v[1] / len, v[2] / len]
}
