use hashbrown::HashMap;
use tabletop_core::{Colors, PointCloud};

#[derive(Default, Clone, Copy)]
struct VoxelAccum {
    sx: f64,
    sy: f64,
    sz: f64,
    sr: u32,
    sg: u32,
    sb: u32,
    n: usize,
}

/// Decimate the cloud by averaging all points falling into the same cubic
/// voxel of edge `voxel_size`. Colors, when present, are averaged as well.
///
/// Output order is the sorted voxel-key order, so results are deterministic
/// regardless of input order.
pub fn voxel_downsample(cloud: &PointCloud, voxel_size: f64) -> PointCloud {
    assert!(
        voxel_size.is_finite() && voxel_size > 0.0,
        "voxel_size must be > 0 and finite"
    );

    if cloud.is_empty() {
        return PointCloud::new();
    }

    let has_colors = cloud.colors.is_some();
    let mut bins: HashMap<(i32, i32, i32), VoxelAccum> = HashMap::new();

    for i in 0..cloud.len() {
        let px = cloud.x[i];
        let py = cloud.y[i];
        let pz = cloud.z[i];
        if !px.is_finite() || !py.is_finite() || !pz.is_finite() {
            continue;
        }

        let key = (
            (px / voxel_size).floor() as i32,
            (py / voxel_size).floor() as i32,
            (pz / voxel_size).floor() as i32,
        );

        let entry = bins.entry(key).or_default();
        entry.sx += px;
        entry.sy += py;
        entry.sz += pz;
        if let Some(c) = &cloud.colors {
            entry.sr += c.r[i] as u32;
            entry.sg += c.g[i] as u32;
            entry.sb += c.b[i] as u32;
        }
        entry.n += 1;
    }

    if bins.is_empty() {
        return PointCloud::new();
    }

    let mut keys: Vec<(i32, i32, i32)> = bins.keys().copied().collect();
    keys.sort_unstable();

    let mut x = Vec::with_capacity(keys.len());
    let mut y = Vec::with_capacity(keys.len());
    let mut z = Vec::with_capacity(keys.len());
    let mut colors = has_colors.then(|| Colors {
        r: Vec::with_capacity(keys.len()),
        g: Vec::with_capacity(keys.len()),
        b: Vec::with_capacity(keys.len()),
    });

    for key in keys {
        let a = bins.get(&key).expect("bin key should exist");
        let denom = a.n as f64;
        x.push(a.sx / denom);
        y.push(a.sy / denom);
        z.push(a.sz / denom);
        if let Some(c) = &mut colors {
            c.r.push((a.sr / a.n as u32) as u8);
            c.g.push((a.sg / a.n as u32) as u8);
            c.b.push((a.sb / a.n as u32) as u8);
        }
    }

    let mut out = PointCloud::from_xyz(x, y, z);
    out.colors = colors;
    out
}
