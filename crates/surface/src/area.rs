/// Area of a planar polygon given its boundary vertices and plane normal.
///
/// The polygon is projected onto the coordinate plane perpendicular to the
/// axis with the largest normal component, a shoelace sum is taken over
/// the other two axes, and the result is divided by the cosine of the tilt
/// between the polygon's plane and the projection plane. The sign of the
/// raw sum is discarded, so the area is independent of winding direction
/// and of where the vertex cycle starts.
pub fn polygon_area(vertices: &[[f64; 3]], normal: &[f64; 3]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }

    // Axis with the largest normal component; project onto the other two.
    let k0 = if normal[0].abs() > normal[1].abs() { 0 } else { 1 };
    let k0 = if normal[k0].abs() > normal[2].abs() {
        k0
    } else {
        2
    };
    let k1 = (k0 + 1) % 3;
    let k2 = (k0 + 2) % 3;

    // cos of the angle between the polygon plane and the projection plane
    let ct = normal[k0].abs();

    let mut area = 0.0;
    for i in 0..vertices.len() {
        let j = (i + 1) % vertices.len();
        area += vertices[i][k1] * vertices[j][k2] - vertices[i][k2] * vertices[j][k1];
    }

    area.abs() / (2.0 * ct)
}

#[cfg(test)]
mod tests {
    use super::polygon_area;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    const Z_UP: [f64; 3] = [0.0, 0.0, 1.0];

    fn unit_square() -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]
    }

    #[test]
    fn unit_square_has_area_one() {
        assert_abs_diff_eq!(polygon_area(&unit_square(), &Z_UP), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn invariant_under_cyclic_rotation() {
        let mut verts = unit_square();
        let base = polygon_area(&verts, &Z_UP);
        for _ in 0..verts.len() {
            verts.rotate_left(1);
            assert_abs_diff_eq!(polygon_area(&verts, &Z_UP), base, epsilon = 1e-12);
        }
    }

    #[test]
    fn invariant_under_winding_reversal() {
        let mut verts = unit_square();
        let base = polygon_area(&verts, &Z_UP);
        verts.reverse();
        assert_abs_diff_eq!(polygon_area(&verts, &Z_UP), base, epsilon = 1e-12);
    }

    #[test]
    fn invariant_under_in_plane_rotation() {
        let verts = unit_square();
        let base = polygon_area(&verts, &Z_UP);

        let angle = 0.73f64;
        let (s, c) = angle.sin_cos();
        let rotated: Vec<[f64; 3]> = verts
            .iter()
            .map(|p| [c * p[0] - s * p[1], s * p[0] + c * p[1], p[2]])
            .collect();

        assert_abs_diff_eq!(polygon_area(&rotated, &Z_UP), base, epsilon = 1e-12);
    }

    #[test]
    fn tilted_polygon_is_rescaled_by_cosine() {
        // Unit square tilted 45° about the x axis: projecting to the x-y
        // plane shrinks it by cos(45°), which the division undoes.
        let s2 = 2.0f64.sqrt();
        let verts = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0 / s2, 1.0 / s2],
            [0.0, 1.0 / s2, 1.0 / s2],
        ];
        let normal = [0.0, -1.0 / s2, 1.0 / s2];
        assert_abs_diff_eq!(polygon_area(&verts, &normal), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_inputs_have_zero_area() {
        assert_eq!(polygon_area(&[], &Z_UP), 0.0);
        assert_eq!(polygon_area(&[[0.0, 0.0, 0.0]], &Z_UP), 0.0);
        assert_eq!(
            polygon_area(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], &Z_UP),
            0.0
        );
    }

    proptest! {
        #[test]
        fn area_is_non_negative_and_rotation_invariant(
            pts in prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 3..12),
            angle in 0.0f64..std::f64::consts::TAU,
        ) {
            let verts: Vec<[f64; 3]> = pts.iter().map(|p| [p.0, p.1, 0.0]).collect();
            let base = polygon_area(&verts, &Z_UP);
            prop_assert!(base >= 0.0);

            let (s, c) = angle.sin_cos();
            let rotated: Vec<[f64; 3]> = verts
                .iter()
                .map(|p| [c * p[0] - s * p[1], s * p[0] + c * p[1], p[2]])
                .collect();
            prop_assert!((polygon_area(&rotated, &Z_UP) - base).abs() < 1e-6 * base.max(1.0));
        }
    }
}
