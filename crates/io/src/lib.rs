#![forbid(unsafe_code)]

pub mod pcd;

pub use pcd::{read_pcd, write_pcd, write_pcd_binary};
