use crate::ConvexHull;
use tabletop_core::PointCloud;

/// Select the points lying inside the polygonal prism spanned by the hull
/// footprint and a signed height band above its plane.
///
/// A point qualifies when its orthogonal projection falls inside the hull
/// polygon and its signed height `h` (measured along the hull plane's
/// normal) satisfies `height_min <= h < height_max`. Returns the indices
/// of qualifying points in ascending order; an empty result is valid and
/// simply yields zero clusters downstream.
pub fn extract_polygonal_prism(
    cloud: &PointCloud,
    hull: &ConvexHull,
    height_min: f64,
    height_max: f64,
) -> Vec<usize> {
    assert!(height_min <= height_max, "height band must be ordered");

    let mut indices = Vec::new();
    for i in 0..cloud.len() {
        let point = cloud.point(i);
        let h = hull.model.signed_distance(&point);
        if h >= height_min && h < height_max && hull.contains(&point) {
            indices.push(i);
        }
    }
    indices
}
