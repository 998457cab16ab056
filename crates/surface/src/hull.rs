use tabletop_core::PointCloud;
use tabletop_segmentation::PlaneModel;

/// An orthonormal 2D parameterization of a plane: `u` and `v` span the
/// plane, `origin` lies on it. Projecting a point to `(u, v)` coordinates
/// implicitly drops its offset along the plane normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneBasis {
    pub origin: [f64; 3],
    pub u: [f64; 3],
    pub v: [f64; 3],
}

impl PlaneBasis {
    pub fn from_model(model: &PlaneModel) -> Self {
        let n = model.normal;

        // Any helper axis not parallel to the normal works.
        let helper = if n[0].abs() < 0.9 {
            [1.0, 0.0, 0.0]
        } else {
            [0.0, 1.0, 0.0]
        };

        let u = normalized(cross(&n, &helper));
        let v = cross(&n, &u);
        let origin = [-model.d * n[0], -model.d * n[1], -model.d * n[2]];

        Self { origin, u, v }
    }

    /// In-plane coordinates of a point's orthogonal projection.
    pub fn project_uv(&self, point: &[f64; 3]) -> [f64; 2] {
        let rel = [
            point[0] - self.origin[0],
            point[1] - self.origin[1],
            point[2] - self.origin[2],
        ];
        [dot(&rel, &self.u), dot(&rel, &self.v)]
    }
}

/// The convex boundary of a planar point set: an ordered cyclic polygon.
///
/// `vertices` are the hull corners in 3D (on the plane), `polygon` their
/// in-plane coordinates in the same order; both are counter-clockwise in
/// the `(u, v)` frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    pub model: PlaneModel,
    pub basis: PlaneBasis,
    pub vertices: Vec<[f64; 3]>,
    pub polygon: Vec<[f64; 2]>,
}

impl ConvexHull {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether the point's orthogonal projection onto the plane falls
    /// inside the hull polygon (even-odd crossing test). Degenerate hulls
    /// with fewer than 3 corners contain nothing.
    pub fn contains(&self, point: &[f64; 3]) -> bool {
        if self.polygon.len() < 3 {
            return false;
        }
        point_in_polygon(&self.polygon, &self.basis.project_uv(point))
    }
}

/// Project the plane inliers onto the fitted plane and compute their 2D
/// convex boundary (Andrew's monotone chain) in the plane's own
/// parameterization.
///
/// With fewer than 3 distinct projected points the result is a degenerate
/// hull listing the projections as-is.
pub fn convex_hull(cloud: &PointCloud, inliers: &[usize], model: &PlaneModel) -> ConvexHull {
    let basis = PlaneBasis::from_model(model);

    let projected: Vec<[f64; 3]> = inliers.iter().map(|&i| model.project(&cloud.point(i))).collect();
    let uv: Vec<[f64; 2]> = projected.iter().map(|p| basis.project_uv(p)).collect();

    if projected.len() < 3 {
        return ConvexHull {
            model: *model,
            basis,
            vertices: projected,
            polygon: uv,
        };
    }

    let hull_idx = monotone_chain(&uv);

    let vertices: Vec<[f64; 3]> = hull_idx.iter().map(|&i| projected[i]).collect();
    let polygon: Vec<[f64; 2]> = hull_idx.iter().map(|&i| uv[i]).collect();

    ConvexHull {
        model: *model,
        basis,
        vertices,
        polygon,
    }
}

/// Andrew's monotone chain. Returns indices of the hull corners in
/// counter-clockwise order, collinear points excluded.
fn monotone_chain(points: &[[f64; 2]]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        points[a]
            .partial_cmp(&points[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let cross2 = |o: usize, a: usize, b: usize| -> f64 {
        let (ox, oy) = (points[o][0], points[o][1]);
        (points[a][0] - ox) * (points[b][1] - oy) - (points[a][1] - oy) * (points[b][0] - ox)
    };

    let mut lower: Vec<usize> = Vec::new();
    for &i in &order {
        while lower.len() >= 2 && cross2(lower[lower.len() - 2], lower[lower.len() - 1], i) <= 0.0 {
            lower.pop();
        }
        lower.push(i);
    }

    let mut upper: Vec<usize> = Vec::new();
    for &i in order.iter().rev() {
        while upper.len() >= 2 && cross2(upper[upper.len() - 2], upper[upper.len() - 1], i) <= 0.0 {
            upper.pop();
        }
        upper.push(i);
    }

    // Endpoints are shared between the chains.
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Even-odd crossing test over a closed polygon.
fn point_in_polygon(polygon: &[[f64; 2]], p: &[f64; 2]) -> bool {
    let n = polygon.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (polygon[i][0], polygon[i][1]);
        let (xj, yj) = (polygon[j][0], polygon[j][1]);
        if (yi > p[1]) != (yj > p[1]) && p[0] < (xj - xi) * (p[1] - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[inline]
fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalized(v: [f64; 3]) -> [f64; 3] {
    let len = dot(&v, &v).sqrt();
    [v[0] / len, v[1] / len, v[2] / len]
}
