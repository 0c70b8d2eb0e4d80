//! Count with your hands.
//!
//! Mudra watches a webcam for a single hand, asks an externally trained
//! hand-landmark network for the hand's 21 skeletal keypoints, turns the
//! keypoint geometry into a thumb-to-pinky extended/folded vector, and maps
//! that vector to one of the ten sign-language digits, overlaying the matching
//! digit image onto the camera feed.
//!
//! The pose estimation itself is delegated entirely to an ONNX model file
//! (see `models/README.md`); this crate only runs the model and consumes its
//! outputs.
//!
//! # Environment Variables
//!
//! * `MUDRA_WEBCAM_NAME`: Forces the device to use for [`Webcam`]s created
//!   without an explicit device name. If unset, the first device that supports
//!   a compatible image format will be used.
//!
//! [`Webcam`]: camera::Webcam

use log::LevelFilter;

pub mod camera;
pub mod filter;
pub mod gesture;
pub mod gui;
pub mod hand;
pub mod image;
pub mod iter;
pub mod landmark;
pub mod nn;
pub mod overlay;
pub mod resolution;
pub mod termination;
pub mod timer;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("wgpu"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and mudra will log at *debug* level, `wgpu` at *warn*
/// level. Everything can be overridden via the usual `RUST_LOG` syntax.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
