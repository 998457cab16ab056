#![forbid(unsafe_code)]

pub mod range;
pub mod voxel_downsample;

pub use range::range_filter;
pub use voxel_downsample::voxel_downsample;
