#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod grabber;
pub mod sink;

pub use config::GrabberConfig;
pub use error::FrameError;
pub use grabber::{FrameOutcome, ObjectGrabber};
pub use sink::{CloudSink, NullSink, ObjectStore, PcdStore};
