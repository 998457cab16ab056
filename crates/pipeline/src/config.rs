use serde::{Deserialize, Serialize};
use tabletop_segmentation::NormalPlaneParams;

/// All tunables of the extraction pipeline, fixed at construction.
///
/// Built once per pipeline instance and passed into each stage; no stage
/// reads ambient state. Defaults mirror the sensor rig this pipeline was
/// tuned on (distances in meters, angles in degrees).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabberConfig {
    /// Inlier threshold for the plane fit (blended metric).
    pub distance_threshold: f64,
    /// Depth band kept by the range filter.
    pub z_min: f64,
    pub z_max: f64,
    /// RANSAC iteration budget.
    pub max_iterations: usize,
    /// Blend between point-distance and normal-angle error, in [0, 1].
    pub normal_distance_weight: f64,
    /// Max angular deviation of the plane normal from `axis`, degrees.
    pub eps_angle_deg: f64,
    /// Target confidence for early RANSAC termination, in (0, 1).
    pub probability: f64,
    /// Neighbor count for normal estimation.
    pub k: usize,
    /// A plane fit with at most this many inliers abandons the frame.
    pub min_table_inliers: usize,
    /// Connectivity radius for Euclidean clustering.
    pub cluster_tolerance: f64,
    /// Connected components smaller than this are discarded.
    pub cluster_min_size: usize,
    /// Signed height band above the table plane for prism extraction;
    /// min inclusive, max exclusive.
    pub height_min: f64,
    pub height_max: f64,
    /// Number of object clouds to emit per frame.
    pub nr_clusters: usize,
    /// Orientation prior for the table normal (absolute components).
    pub axis: [f64; 3],
    /// Optional voxel decimation before normal estimation and plane
    /// fitting. Prism extraction always runs on the undecimated cloud.
    pub downsample: bool,
    pub voxel_size: f64,
    /// One-shot capture: persist each emitted object and stop after the
    /// first successful frame.
    pub save_to_files: bool,
    /// Naming root for persisted objects: `<object_name>_<4-digit-index>`.
    pub object_name: String,
}

impl Default for GrabberConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.03,
            z_min: 0.0,
            z_max: 1.5,
            max_iterations: 500,
            normal_distance_weight: 0.1,
            eps_angle_deg: 15.0,
            probability: 0.99,
            k: 10,
            min_table_inliers: 100,
            cluster_tolerance: 0.03,
            cluster_min_size: 100,
            height_min: 0.01,
            height_max: 0.4,
            nr_clusters: 4,
            axis: [0.0, 0.0, 1.0],
            downsample: false,
            voxel_size: 0.01,
            save_to_files: false,
            object_name: "object".to_string(),
        }
    }
}

impl GrabberConfig {
    /// Plane-search parameters derived from this configuration.
    pub fn plane_params(&self) -> NormalPlaneParams {
        NormalPlaneParams {
            distance_threshold: self.distance_threshold,
            max_iterations: self.max_iterations,
            probability: self.probability,
            normal_distance_weight: self.normal_distance_weight,
            axis: self.axis,
            eps_angle: self.eps_angle_deg.to_radians(),
        }
    }
}
