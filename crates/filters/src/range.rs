use tabletop_core::PointCloud;

/// Keep points whose depth (z) lies within `[z_min, z_max]`.
///
/// Non-finite depths are dropped, which also discards the NaN points depth
/// sensors emit for invalid returns. Colors follow the surviving points.
pub fn range_filter(cloud: &PointCloud, z_min: f64, z_max: f64) -> PointCloud {
    assert!(z_min <= z_max, "z_min must not exceed z_max");

    if cloud.is_empty() {
        return PointCloud::new();
    }

    let mut keep = Vec::new();
    for i in 0..cloud.len() {
        let z = cloud.z[i];
        if z.is_finite() && z >= z_min && z <= z_max {
            keep.push(i);
        }
    }

    cloud.select(&keep)
}
