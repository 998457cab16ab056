#![forbid(unsafe_code)]

//! Tabletop object extraction: per-frame segmentation of a dominant
//! supporting plane and the rigid objects resting on it.
//!
//! This facade re-exports the workspace crates; see `tabletop-pipeline`
//! for the frame-processing entry point.

pub use tabletop_core as core;
pub use tabletop_filters as filters;
pub use tabletop_io as io;
pub use tabletop_normals as normals;
pub use tabletop_pipeline as pipeline;
pub use tabletop_segmentation as segmentation;
pub use tabletop_spatial as spatial;
pub use tabletop_surface as surface;
