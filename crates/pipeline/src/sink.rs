use std::io;
use std::path::PathBuf;

use tabletop_core::PointCloud;
use tabletop_io::write_pcd_binary;
use tabletop_surface::ConvexHull;

/// Downstream consumer for per-frame pipeline output.
///
/// The pipeline publishes the table hull once per accepted frame and then
/// each extracted object in selection order. Implementations decide what
/// "publish" means: a message bus, a viewer, a test recorder.
pub trait CloudSink {
    fn publish_hull(&mut self, hull: &ConvexHull);
    fn publish_object(&mut self, index: usize, cloud: &PointCloud);
}

/// Sink that discards everything. Handy for benchmarks and for callers
/// that only care about persisted objects.
#[derive(Debug, Default)]
pub struct NullSink;

impl CloudSink for NullSink {
    fn publish_hull(&mut self, _hull: &ConvexHull) {}
    fn publish_object(&mut self, _index: usize, _cloud: &PointCloud) {}
}

/// Persistence backend for one-shot object capture.
pub trait ObjectStore {
    fn save(&mut self, name: &str, cloud: &PointCloud) -> io::Result<()>;
}

/// Stores objects as binary PCD files under a fixed directory, one file
/// per object named `<name>.pcd`.
#[derive(Debug)]
pub struct PcdStore {
    dir: PathBuf,
}

impl PcdStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ObjectStore for PcdStore {
    fn save(&mut self, name: &str, cloud: &PointCloud) -> io::Result<()> {
        write_pcd_binary(self.dir.join(format!("{name}.pcd")), cloud)
    }
}
