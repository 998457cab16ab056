//! One-shot tabletop object capture over recorded PCD frames.
//!
//! Feeds each input file through the pipeline until one frame yields the
//! configured number of objects; those are written as
//! `<object_name>_<index>.pcd` into the working directory and the process
//! stops.

use std::env;
use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tabletop_core::Frame;
use tabletop_io::read_pcd;
use tabletop_pipeline::{FrameOutcome, GrabberConfig, NullSink, ObjectGrabber, PcdStore};

const USAGE: &str = "usage: tabletop-grabber <object_name> <frame.pcd>...";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let Some(object_name) = args.next() else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    let paths: Vec<String> = args.collect();
    if paths.is_empty() {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    }

    let config = GrabberConfig {
        save_to_files: true,
        object_name,
        ..GrabberConfig::default()
    };
    let grabber = ObjectGrabber::new(config);
    let mut sink = NullSink;
    let mut store = PcdStore::new(".");

    for (i, path) in paths.iter().enumerate() {
        let cloud = match read_pcd(path) {
            Ok(cloud) => cloud,
            Err(err) => {
                error!(path = %path, %err, "failed to read frame");
                return ExitCode::FAILURE;
            }
        };
        let frame = Frame::new(i as f64, cloud);

        match grabber.process_frame(&frame, &mut sink, &mut store) {
            Ok(FrameOutcome::LastFrame) => {
                info!("capture complete");
                // Scripted callers tell a capture (2) from a clean drain (0).
                return ExitCode::from(2);
            }
            Ok(FrameOutcome::Continue) => {}
            Err(err) if err.is_recoverable() => {
                warn!(path = %path, %err, "frame abandoned");
            }
            Err(err) => {
                error!(%err, "stopping");
                return ExitCode::FAILURE;
            }
        }
    }

    info!("no qualifying frame in {} inputs", paths.len());
    ExitCode::SUCCESS
}
