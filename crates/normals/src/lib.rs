#![forbid(unsafe_code)]

pub mod estimate;

pub use estimate::estimate_normals;
pub use estimate::estimate_normals_with_viewpoint;
