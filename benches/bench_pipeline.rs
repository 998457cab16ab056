use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tabletop::core::{Frame, PointCloud};
use tabletop::normals::estimate_normals;
use tabletop::pipeline::{GrabberConfig, NullSink, ObjectGrabber, ObjectStore, PcdStore};
use tabletop::segmentation::{segment_normal_plane_seeded, NormalPlaneParams};

fn push(cloud: &mut PointCloud, x: f64, y: f64, z: f64) {
    cloud.x.push(x);
    cloud.y.push(y);
    cloud.z.push(z);
}

/// Table at z ~= 0.9 with four 150-point blobs resting on it, matching
/// the sensor scenes the pipeline was tuned on (~4600 points).
fn bench_frame() -> Frame {
    let mut cloud = PointCloud::new();
    for i in 0..80 {
        for j in 0..50 {
            push(
                &mut cloud,
                -0.395 + 0.01 * i as f64,
                -0.245 + 0.01 * j as f64,
                0.9 + (i * 50 + j) as f64 * 1e-7,
            );
        }
    }
    for &(cx, cy) in &[(-0.3, -0.1), (-0.1, 0.15), (0.1, -0.15), (0.3, 0.1)] {
        for i in 0..5 {
            for j in 0..5 {
                for l in 0..6 {
                    push(
                        &mut cloud,
                        cx + 0.01 * i as f64,
                        cy + 0.01 * j as f64,
                        0.95 + 0.01 * l as f64,
                    );
                }
            }
        }
    }
    Frame::new(0.0, cloud)
}

struct DiscardStore;

impl ObjectStore for DiscardStore {
    fn save(&mut self, _name: &str, _cloud: &PointCloud) -> std::io::Result<()> {
        Ok(())
    }
}

fn bench_process_frame(c: &mut Criterion) {
    let frame = bench_frame();
    let grabber = ObjectGrabber::with_seed(GrabberConfig::default(), 42);

    c.bench_function("process_frame_4600pts", |b| {
        b.iter(|| {
            let mut sink = NullSink;
            let mut store = DiscardStore;
            black_box(grabber.process_frame(black_box(&frame), &mut sink, &mut store))
        })
    });
}

fn bench_stages(c: &mut Criterion) {
    let frame = bench_frame();

    c.bench_function("estimate_normals_k10", |b| {
        b.iter(|| black_box(estimate_normals(black_box(&frame.cloud), 10)))
    });

    let normals = estimate_normals(&frame.cloud, 10);
    let params = NormalPlaneParams::default();
    c.bench_function("segment_normal_plane", |b| {
        b.iter(|| {
            black_box(segment_normal_plane_seeded(
                black_box(&frame.cloud),
                &normals,
                &params,
                42,
            ))
        })
    });
}

fn bench_one_shot_persist(c: &mut Criterion) {
    let frame = bench_frame();
    let dir = tempfile::tempdir().unwrap();
    let config = GrabberConfig {
        save_to_files: true,
        object_name: "bench".to_string(),
        ..GrabberConfig::default()
    };
    let grabber = ObjectGrabber::with_seed(config, 42);

    c.bench_function("process_frame_with_persist", |b| {
        b.iter(|| {
            let mut sink = NullSink;
            let mut store = PcdStore::new(dir.path());
            black_box(grabber.process_frame(black_box(&frame), &mut sink, &mut store))
        })
    });
}

criterion_group!(
    benches,
    bench_process_frame,
    bench_stages,
    bench_one_shot_persist
);
criterion_main!(benches);
