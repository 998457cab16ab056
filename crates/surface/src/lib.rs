#![forbid(unsafe_code)]

pub mod area;
pub mod hull;
pub mod prism;

pub use area::polygon_area;
pub use hull::{convex_hull, ConvexHull, PlaneBasis};
pub use prism::extract_polygonal_prism;
