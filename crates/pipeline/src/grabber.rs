use tracing::{debug, error, info};

use tabletop_core::Frame;
use tabletop_filters::{range_filter, voxel_downsample};
use tabletop_normals::estimate_normals;
use tabletop_segmentation::{euclidean_cluster, segment_normal_plane, segment_normal_plane_seeded};
use tabletop_surface::{convex_hull, extract_polygonal_prism, polygon_area};

use crate::config::GrabberConfig;
use crate::error::FrameError;
use crate::sink::{CloudSink, ObjectStore};

/// What the caller should do after a successful frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Keep feeding frames.
    Continue,
    /// One-shot capture finished; stop the frame source.
    LastFrame,
}

/// The tabletop extraction pipeline.
///
/// Stateless across frames apart from its configuration: each call to
/// [`process_frame`](Self::process_frame) runs the full chain (range
/// filter, optional decimation, normal estimation, axis-constrained plane
/// fit, hull, prism extraction, clustering) and either emits the first
/// `nr_clusters` clusters in discovery order or reports why the frame was
/// abandoned.
pub struct ObjectGrabber {
    config: GrabberConfig,
    seed: Option<u64>,
}

impl ObjectGrabber {
    pub fn new(config: GrabberConfig) -> Self {
        Self { config, seed: None }
    }

    /// Pins the RANSAC seed so repeated runs over the same frame produce
    /// the same plane. Used by tests and offline replays.
    pub fn with_seed(config: GrabberConfig, seed: u64) -> Self {
        Self {
            config,
            seed: Some(seed),
        }
    }

    pub fn config(&self) -> &GrabberConfig {
        &self.config
    }

    /// Runs the full extraction chain on one frame.
    ///
    /// On success every emitted object has been handed to `sink` (and, in
    /// one-shot mode, to `store`); the outcome tells the caller whether to
    /// keep feeding frames. Recoverable failures (thin plane consensus,
    /// too few clusters) leave the pipeline ready for the next frame.
    pub fn process_frame(
        &self,
        frame: &Frame,
        sink: &mut dyn CloudSink,
        store: &mut dyn ObjectStore,
    ) -> Result<FrameOutcome, FrameError> {
        let cfg = &self.config;

        let ranged = range_filter(&frame.cloud, cfg.z_min, cfg.z_max);
        info!(
            stamp = frame.stamp,
            raw = frame.cloud.len(),
            kept = ranged.len(),
            "frame received"
        );

        let decimated = cfg
            .downsample
            .then(|| voxel_downsample(&ranged, cfg.voxel_size));
        let seg_cloud = decimated.as_ref().unwrap_or(&ranged);
        if let Some(d) = &decimated {
            debug!(points = d.len(), voxel_size = cfg.voxel_size, "decimated");
        }

        let normals = estimate_normals(seg_cloud, cfg.k);

        let params = cfg.plane_params();
        let (model, inliers) = match self.seed {
            Some(seed) => segment_normal_plane_seeded(seg_cloud, &normals, &params, seed),
            None => segment_normal_plane(seg_cloud, &normals, &params),
        };
        if inliers.len() <= cfg.min_table_inliers {
            error!(
                inliers = inliers.len(),
                required = cfg.min_table_inliers,
                "table plane rejected"
            );
            return Err(FrameError::InsufficientTableInliers {
                found: inliers.len(),
                required: cfg.min_table_inliers,
            });
        }
        info!(
            inliers = inliers.len(),
            nx = model.normal[0],
            ny = model.normal[1],
            nz = model.normal[2],
            d = model.d,
            "table plane found"
        );

        let hull = convex_hull(seg_cloud, &inliers, &model);
        debug!(
            corners = hull.vertices.len(),
            area = polygon_area(&hull.vertices, &model.normal),
            "table hull"
        );
        sink.publish_hull(&hull);

        // The prism always runs over the undecimated cloud so emitted
        // objects keep full sensor resolution.
        let prism = extract_polygonal_prism(&ranged, &hull, cfg.height_min, cfg.height_max);
        let above = ranged.select(&prism);
        debug!(points = above.len(), "points above the table");

        let clusters = euclidean_cluster(&above, cfg.cluster_tolerance, cfg.cluster_min_size);
        if clusters.len() < cfg.nr_clusters {
            error!(
                found = clusters.len(),
                required = cfg.nr_clusters,
                "not enough clusters on the table"
            );
            return Err(FrameError::InsufficientClusters {
                found: clusters.len(),
                required: cfg.nr_clusters,
            });
        }

        for (i, cluster) in clusters.iter().take(cfg.nr_clusters).enumerate() {
            let object = above.select(cluster);
            info!(cluster = i, points = object.len(), "object extracted");
            if cfg.save_to_files {
                let name = format!("{}_{:04}", cfg.object_name, i);
                info!(name = %name, "saving object");
                store.save(&name, &object)?;
            }
            sink.publish_object(i, &object);
        }

        if cfg.save_to_files {
            info!(objects = cfg.nr_clusters, "capture complete");
            Ok(FrameOutcome::LastFrame)
        } else {
            Ok(FrameOutcome::Continue)
        }
    }
}
