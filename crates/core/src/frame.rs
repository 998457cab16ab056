use crate::PointCloud;

/// One timestamped point cloud as delivered by the sensor transport.
///
/// Frames are the unit of work for the extraction pipeline; every derived
/// entity (normals, plane model, hull, clusters) is scoped to a single
/// frame and dropped when its processing ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Source timestamp in seconds.
    pub stamp: f64,
    pub cloud: PointCloud,
}

impl Frame {
    pub fn new(stamp: f64, cloud: PointCloud) -> Self {
        Self { stamp, cloud }
    }
}
