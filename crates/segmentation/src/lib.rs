#![forbid(unsafe_code)]

pub mod euclidean_cluster;
pub mod normal_plane;

pub use euclidean_cluster::euclidean_cluster;
pub use normal_plane::{
    axis_from_tilt, segment_normal_plane, segment_normal_plane_seeded, NormalPlaneParams,
    PlaneModel,
};
