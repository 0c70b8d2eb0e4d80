//! Hand landmark acquisition.
//!
//! The actual pose estimation is done by an externally trained hand-landmark
//! network (MediaPipe's hand landmark model, converted to ONNX; see
//! `models/README.md`). [`HandLandmarker`] owns the loaded model for the
//! process lifetime and exposes a single combined operation,
//! [`HandLandmarker::detect`], that maps a camera frame to the hand's 21
//! keypoints in frame pixel coordinates, so there is no ordering dependency
//! between "detect" and "look up positions".

use std::path::PathBuf;

use nalgebra::Point2;

use crate::image::{draw, Color, Image};
use crate::landmark::{LandmarkFilter, Landmarks};
use crate::nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork, Outputs};
use crate::resolution::Resolution;
use crate::timer::Timer;

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// The number of landmarks on a hand.
pub const NUM_LANDMARKS: usize = 21;

const CONNECTIVITY: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        // Surround the palm:
        (Wrist, ThumbCmc),
        (ThumbCmc, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        // Thumb:
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index:
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle:
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring:
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky:
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};

/// Which hand the network believes it is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// The 21 keypoints of one detected hand, in frame pixel coordinates.
#[derive(Debug, Clone)]
pub struct HandLandmarks {
    landmarks: Landmarks,
    presence: f32,
    raw_handedness: f32,
}

impl HandLandmarks {
    /// Creates a landmark set from raw pixel positions, ordered by [`LandmarkIdx`].
    ///
    /// This is how alternative landmark providers (or tests) hand their results to the
    /// classification layer.
    pub fn from_positions(positions: [[f32; 2]; NUM_LANDMARKS]) -> Self {
        let mut landmarks = Landmarks::new(NUM_LANDMARKS);
        landmarks.positions_mut().copy_from_slice(&positions);
        Self {
            landmarks,
            presence: 1.0,
            raw_handedness: 0.0,
        }
    }

    /// Returns a landmark's position in frame pixel coordinates.
    pub fn position(&self, index: LandmarkIdx) -> Point2<f32> {
        let [x, y] = self.landmarks.positions()[index as usize];
        Point2::new(x, y)
    }

    /// Returns an iterator over all landmark positions, ordered by [`LandmarkIdx`].
    pub fn positions(&self) -> impl Iterator<Item = Point2<f32>> + '_ {
        self.landmarks
            .positions()
            .iter()
            .map(|&[x, y]| Point2::new(x, y))
    }

    /// Returns the network's confidence that a hand is actually present.
    ///
    /// By convention, this is in range 0.0 to 1.0, with anything above 0.5 indicating that a hand
    /// is probably in view.
    #[inline]
    pub fn presence(&self) -> f32 {
        self.presence
    }

    /// Returns the estimated handedness of the hand in the image.
    ///
    /// This assumes that the camera image is passed in as-is (not mirrored), and should only be
    /// relied on when [`HandLandmarks::presence`] is over some threshold.
    pub fn handedness(&self) -> Handedness {
        if self.raw_handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }

    /// Draws the landmark skeleton onto `target`.
    pub fn draw(&self, target: &mut Image) {
        let hand = match self.handedness() {
            Handedness::Left => "L",
            Handedness::Right => "R",
        };

        for (a, b) in CONNECTIVITY {
            let a = self.position(*a);
            let b = self.position(*b);
            draw::line(target, a.x as i32, a.y as i32, b.x as i32, b.y as i32)
                .color(Color::GREEN);
        }
        for pos in self.positions() {
            draw::marker(target, pos.x as i32, pos.y as i32);
        }

        let [cx, cy] = self.landmarks.average_position();
        draw::text(target, cx as i32, cy as i32 - 5, hand);
        draw::text(
            target,
            cx as i32,
            cy as i32 + 5,
            &format!("presence={:.2}", self.presence()),
        );
    }
}

/// Configuration for a [`HandLandmarker`].
///
/// The landmark network only ever tracks a single hand; that limit is part of the consumed model
/// interface and not configurable.
pub struct LandmarkerOptions {
    model: PathBuf,
    presence_threshold: f32,
}

impl Default for LandmarkerOptions {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/hand_landmark_full.onnx"),
            presence_threshold: 0.5,
        }
    }
}

impl LandmarkerOptions {
    /// Sets the path of the ONNX hand-landmark model to load.
    pub fn model(self, model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            ..self
        }
    }

    /// Sets the presence threshold below which a frame is reported as containing no hand.
    ///
    /// Defaults to 0.5.
    pub fn presence_threshold(self, presence_threshold: f32) -> Self {
        Self {
            presence_threshold,
            ..self
        }
    }
}

/// The landmark provider: wraps the external hand-landmark network.
pub struct HandLandmarker {
    cnn: Cnn,
    presence_threshold: f32,
    filter: LandmarkFilter,
    t_resize: Timer,
    t_infer: Timer,
    t_extract: Timer,
}

impl HandLandmarker {
    /// Loads the hand-landmark network from `options.model`.
    pub fn new(options: LandmarkerOptions) -> anyhow::Result<Self> {
        let cnn = Cnn::new(
            NeuralNetwork::from_path(&options.model)?,
            CnnInputShape::NCHW,
            ColorMapper::linear(0.0..=1.0),
        )?;
        log::debug!(
            "loaded hand landmark network from {} (input {})",
            options.model.display(),
            cnn.input_resolution(),
        );

        Ok(Self {
            cnn,
            presence_threshold: options.presence_threshold,
            filter: LandmarkFilter::default(),
            t_resize: Timer::new("resize"),
            t_infer: Timer::new("infer"),
            t_extract: Timer::new("extract"),
        })
    }

    /// Returns the expected input resolution of the wrapped network.
    pub fn input_resolution(&self) -> Resolution {
        self.cnn.input_resolution()
    }

    /// Sets the [`LandmarkFilter`] to apply to all landmark positions.
    ///
    /// The filter runs on the network's output coordinates, before they are mapped back into frame
    /// coordinates, which makes the filter parameters independent of the frame size.
    ///
    /// This should only be used when the landmarker is fed subsequent frames of a video feed.
    pub fn set_filter(&mut self, filter: LandmarkFilter) {
        self.filter = filter;
    }

    /// Returns profiling timers for this landmarker.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_resize, &self.t_infer, &self.t_extract].into_iter()
    }

    /// Runs the landmark network on `frame`.
    ///
    /// Returns the hand's landmark set in `frame`'s pixel coordinates, or [`None`] if no hand with
    /// sufficient presence is in view. A frame without a hand is a normal outcome, not an error;
    /// errors indicate inference failure.
    pub fn detect(&mut self, frame: &Image) -> anyhow::Result<Option<HandLandmarks>> {
        let input_res = self.cnn.input_resolution();
        let letterboxed = self.t_resize.time(|| frame.aspect_aware_resize(input_res));

        let outputs = self.t_infer.time(|| self.cnn.estimate(&letterboxed))?;
        log::trace!("inference result: {:?}", outputs);

        let mut result = self.t_extract.time(|| extract(&outputs));
        if result.presence < self.presence_threshold {
            log::trace!(
                "presence {} below threshold {}, no hand",
                result.presence,
                self.presence_threshold,
            );
            return Ok(None);
        }

        self.filter.filter(&mut result.landmarks);

        // Map landmark coordinates from the letterboxed input back onto the frame.
        let ratio = match frame.resolution().aspect_ratio() {
            Some(ratio) => ratio,
            None => return Ok(None), // 0-pixel frame, nothing to map onto
        };
        let content = input_res.fit_aspect_ratio(ratio);
        result.landmarks.map_positions(|[x, y]| {
            input_to_frame(x, y, content, frame.resolution())
        });

        Ok(Some(result))
    }
}

/// Maps a position in network input coordinates back into frame coordinates.
///
/// `content` is the letterbox region of the network input that is covered by actual frame
/// content.
fn input_to_frame(x: f32, y: f32, content: crate::image::Rect, frame: Resolution) -> [f32; 2] {
    [
        (x - content.x() as f32) * frame.width() as f32 / content.width() as f32,
        (y - content.y() as f32) * frame.height() as f32 / content.height() as f32,
    ]
}

fn extract(outputs: &Outputs) -> HandLandmarks {
    let screen_landmarks = &outputs[0];
    let presence_flag = &outputs[1];
    let handedness = &outputs[2];

    assert_eq!(screen_landmarks.shape(), &[1, 63]);
    assert_eq!(presence_flag.shape(), &[1, 1]);
    assert_eq!(handedness.shape(), &[1, 1]);

    let mut landmarks = Landmarks::new(NUM_LANDMARKS);
    for (chunk, out) in crate::iter::zip_exact(
        screen_landmarks.data().chunks_exact(3),
        landmarks.positions_mut(),
    ) {
        // The network also emits a Z coordinate, which the classification
        // logic has no use for.
        out[0] = chunk[0];
        out[1] = chunk[1];
    }

    HandLandmarks {
        landmarks,
        presence: presence_flag.as_singular(),
        raw_handedness: handedness.as_singular(),
    }
}

#[cfg(test)]
mod tests {
    use crate::image::Rect;

    use super::*;

    #[test]
    fn input_to_frame_mapping() {
        // 640x480 frame letterboxed into a 224x224 input: content spans y=28..196.
        let frame = Resolution::new(640, 480);
        let content = Rect::from_top_left(0, 28, 224, 168);

        assert_eq!(input_to_frame(0.0, 28.0, content, frame), [0.0, 0.0]);
        assert_eq!(input_to_frame(112.0, 112.0, content, frame), [320.0, 240.0]);
        assert_eq!(input_to_frame(224.0, 196.0, content, frame), [640.0, 480.0]);
    }

    #[test]
    fn handedness_from_raw_score() {
        let mut hand = HandLandmarks::from_positions([[0.0; 2]; NUM_LANDMARKS]);
        assert_eq!(hand.handedness(), Handedness::Left);
        hand.raw_handedness = 0.9;
        assert_eq!(hand.handedness(), Handedness::Right);
    }
}
