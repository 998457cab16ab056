#![forbid(unsafe_code)]

pub mod cloud;
pub mod frame;

pub use cloud::{Colors, Normals, PointCloud};
pub use frame::Frame;
