//! Finger state extraction and digit classification.
//!
//! This is the decision core of the crate: a pure function from one frame's
//! hand landmarks to at most one sign-language digit. No state is carried
//! between frames.

use std::fmt;

use nalgebra::distance;

use crate::hand::{HandLandmarks, LandmarkIdx};

/// The fingers of a hand, in landmark order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    /// The landmark at this finger's tip.
    pub fn tip(self) -> LandmarkIdx {
        match self {
            Finger::Thumb => LandmarkIdx::ThumbTip,
            Finger::Index => LandmarkIdx::IndexFingerTip,
            Finger::Middle => LandmarkIdx::MiddleFingerTip,
            Finger::Ring => LandmarkIdx::RingFingerTip,
            Finger::Pinky => LandmarkIdx::PinkyTip,
        }
    }

    /// The lower reference joint the tip is compared against (two landmark
    /// indices below the tip).
    pub fn reference_joint(self) -> LandmarkIdx {
        match self {
            Finger::Thumb => LandmarkIdx::ThumbMcp,
            Finger::Index => LandmarkIdx::IndexFingerPip,
            Finger::Middle => LandmarkIdx::MiddleFingerPip,
            Finger::Ring => LandmarkIdx::RingFingerPip,
            Finger::Pinky => LandmarkIdx::PinkyPip,
        }
    }
}

const ALL_FINGERS: [Finger; 5] = [
    Finger::Thumb,
    Finger::Index,
    Finger::Middle,
    Finger::Ring,
    Finger::Pinky,
];

/// The hand orientation the finger-state comparison assumes.
///
/// Thumb extension is lateral rather than vertical, so the thumb check compares X coordinates and
/// needs to know which way the thumb points. The default, [`HandOrientation::Left`], matches a
/// left hand facing the camera in an unmirrored image; use [`HandOrientation::Right`] for a right
/// hand (or a mirrored camera feed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HandOrientation {
    #[default]
    Left,
    Right,
}

/// The extended/folded state of all five fingers for a single frame.
///
/// Always exactly 5 values, ordered thumb to pinky. Holds no identity across
/// frames; it is recomputed per frame and can flicker when the underlying
/// landmarks are noisy (apply a
/// [`LandmarkFilter`][crate::landmark::LandmarkFilter] to damp this).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FingerStates([bool; 5]);

impl FingerStates {
    /// Computes the per-finger extended/folded states from a hand's landmarks.
    ///
    /// For the thumb, the tip must be laterally past the MCP joint in the direction given by
    /// `orientation`. Every other finger counts as extended when its tip is *above* its PIP joint
    /// on screen (smaller Y coordinate).
    pub fn detect(hand: &HandLandmarks, orientation: HandOrientation) -> Self {
        let states = ALL_FINGERS.map(|finger| {
            let tip = hand.position(finger.tip());
            let joint = hand.position(finger.reference_joint());
            match (finger, orientation) {
                (Finger::Thumb, HandOrientation::Left) => tip.x < joint.x,
                (Finger::Thumb, HandOrientation::Right) => tip.x > joint.x,
                _ => tip.y < joint.y,
            }
        });
        Self(states)
    }

    /// Returns whether `finger` is extended.
    #[inline]
    pub fn is_extended(&self, finger: Finger) -> bool {
        self.0[finger as usize]
    }

    /// Returns the states as an array ordered thumb to pinky.
    #[inline]
    pub fn as_array(&self) -> [bool; 5] {
        self.0
    }
}

impl From<[bool; 5]> for FingerStates {
    fn from(states: [bool; 5]) -> Self {
        Self(states)
    }
}

impl fmt::Debug for FingerStates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, up) in self.0.iter().enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", *up as u8)?;
        }
        write!(f, "]")
    }
}

/// One of the ten sign-language digits the classifier can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Digit {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
}

impl Digit {
    /// All ten digits, in order.
    pub const ALL: [Digit; 10] = [
        Digit::One,
        Digit::Two,
        Digit::Three,
        Digit::Four,
        Digit::Five,
        Digit::Six,
        Digit::Seven,
        Digit::Eight,
        Digit::Nine,
        Digit::Ten,
    ];

    /// Returns the digit's value, 1 through 10.
    #[inline]
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    /// Returns the digit's zero-based index, eg. into the overlay image set.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Configuration for the [`Classifier`].
#[derive(Debug, Clone, Copy)]
pub struct GestureConfig {
    /// The hand orientation assumed by the thumb comparison.
    pub orientation: HandOrientation,
    /// Maximum distance in frame pixels at which two fingertips count as touching.
    ///
    /// This is not normalized against hand size, so it effectively assumes the hand stays at a
    /// roughly constant distance from the camera.
    pub touch_radius: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            orientation: HandOrientation::default(),
            touch_radius: 50.0,
        }
    }
}

/// Maps a hand's finger states to sign-language digits.
///
/// The classifier is a pure function of its inputs: identical landmarks always produce the
/// identical result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    config: GestureConfig,
}

impl Classifier {
    pub fn new(config: GestureConfig) -> Self {
        Self { config }
    }

    /// Computes the finger states for `hand` under the configured orientation.
    pub fn finger_states(&self, hand: &HandLandmarks) -> FingerStates {
        FingerStates::detect(hand, self.config.orientation)
    }

    /// Classifies a hand pose as one of the ten digits.
    ///
    /// Returns [`None`] when the pose matches no digit; that is the common case and not an error.
    pub fn classify(&self, hand: &HandLandmarks) -> Option<Digit> {
        self.classify_states(self.finger_states(hand), hand)
    }

    /// Classifies a precomputed finger state vector, using `hand` only for the fingertip
    /// proximity checks.
    pub fn classify_states(&self, states: FingerStates, hand: &HandLandmarks) -> Option<Digit> {
        use LandmarkIdx::*;

        let touching = |a: LandmarkIdx, b: LandmarkIdx| {
            distance(&hand.position(a), &hand.position(b)) < self.config.touch_radius
        };

        // [thumb, index, middle, ring, pinky]
        let digit = match states.as_array() {
            [false, true, false, false, false] => Digit::One,
            [false, true, true, false, false] => Digit::Two,
            [true, true, true, false, false] => Digit::Three,
            [false, true, true, true, true] => Digit::Four,
            [true, true, true, true, true] => Digit::Five,
            [false, true, true, true, false] if touching(PinkyTip, ThumbTip) => Digit::Six,
            [false, true, true, false, true] if touching(RingFingerTip, ThumbTip) => Digit::Seven,
            [true, true, false, true, true] if touching(MiddleFingerTip, ThumbTip) => Digit::Eight,
            [true, false, true, true, true] if touching(IndexFingerTip, ThumbTip) => Digit::Nine,
            [true, false, false, false, false] => Digit::Ten,
            _ => return None,
        };
        Some(digit)
    }
}

#[cfg(test)]
mod tests {
    use crate::hand::NUM_LANDMARKS;

    use super::*;

    /// Builds a synthetic hand whose fingers have the given extended/folded states.
    ///
    /// Fingertips sit at fixed, well-separated positions; the reference joints are then placed
    /// relative to each tip so that the requested state holds. Pass `tips` to override individual
    /// fingertip positions (eg. to bring two tips within touching distance).
    fn hand_with(states: [bool; 5], tips: &[(Finger, [f32; 2])]) -> HandLandmarks {
        let mut positions = [[0.0f32; 2]; NUM_LANDMARKS];
        let mut tip_pos = [
            [320.0, 300.0], // thumb
            [340.0, 200.0], // index
            [360.0, 200.0], // middle
            [380.0, 200.0], // ring
            [400.0, 200.0], // pinky
        ];
        for (finger, pos) in tips {
            tip_pos[*finger as usize] = *pos;
        }

        for finger in [
            Finger::Thumb,
            Finger::Index,
            Finger::Middle,
            Finger::Ring,
            Finger::Pinky,
        ] {
            let tip = tip_pos[finger as usize];
            let joint = match finger {
                // Extended thumb: tip left of the MCP joint.
                Finger::Thumb if states[0] => [tip[0] + 40.0, tip[1]],
                Finger::Thumb => [tip[0] - 40.0, tip[1]],
                // Extended finger: tip above the PIP joint.
                _ if states[finger as usize] => [tip[0], tip[1] + 40.0],
                _ => [tip[0], tip[1] - 40.0],
            };
            positions[finger.tip() as usize] = tip;
            positions[finger.reference_joint() as usize] = joint;
        }

        HandLandmarks::from_positions(positions)
    }

    fn classify(states: [bool; 5], tips: &[(Finger, [f32; 2])]) -> Option<Digit> {
        let hand = hand_with(states, tips);
        let classifier = Classifier::default();
        assert_eq!(classifier.finger_states(&hand).as_array(), states);
        classifier.classify(&hand)
    }

    #[test]
    fn plain_rows() {
        assert_eq!(classify([false, true, false, false, false], &[]), Some(Digit::One));
        assert_eq!(classify([false, true, true, false, false], &[]), Some(Digit::Two));
        assert_eq!(classify([true, true, true, false, false], &[]), Some(Digit::Three));
        assert_eq!(classify([false, true, true, true, true], &[]), Some(Digit::Four));
        assert_eq!(classify([true, true, true, true, true], &[]), Some(Digit::Five));
        assert_eq!(classify([true, false, false, false, false], &[]), Some(Digit::Ten));
    }

    #[test]
    fn touch_rows() {
        let near = [(Finger::Pinky, [330.0, 300.0])];
        assert_eq!(classify([false, true, true, true, false], &near), Some(Digit::Six));
        let near = [(Finger::Ring, [330.0, 300.0])];
        assert_eq!(classify([false, true, true, false, true], &near), Some(Digit::Seven));
        let near = [(Finger::Middle, [330.0, 300.0])];
        assert_eq!(classify([true, true, false, true, true], &near), Some(Digit::Eight));
        let near = [(Finger::Index, [330.0, 300.0])];
        assert_eq!(classify([true, false, true, true, true], &near), Some(Digit::Nine));
    }

    #[test]
    fn touch_rows_without_touch_are_rejected() {
        // Default tip placement keeps every fingertip well away from the thumb.
        assert_eq!(classify([false, true, true, true, false], &[]), None);
        assert_eq!(classify([false, true, true, false, true], &[]), None);
        assert_eq!(classify([true, true, false, true, true], &[]), None);
        assert_eq!(classify([true, false, true, true, true], &[]), None);
    }

    #[test]
    fn unknown_vectors_yield_nothing() {
        assert_eq!(classify([false, false, false, false, false], &[]), None);
        // thumb + index is not in the table
        assert_eq!(classify([true, true, false, false, false], &[]), None);
        assert_eq!(classify([false, false, false, false, true], &[]), None);
    }

    #[test]
    fn touch_threshold_is_strict() {
        // Thumb tip is at x=320; 49.9 px away is touching, 50.0 px is not.
        let six = [false, true, true, true, false];
        assert_eq!(
            classify(six, &[(Finger::Pinky, [320.0 + 49.9, 300.0])]),
            Some(Digit::Six)
        );
        assert_eq!(classify(six, &[(Finger::Pinky, [320.0 + 50.0, 300.0])]), None);
    }

    #[test]
    fn classification_is_deterministic() {
        let hand = hand_with([false, true, true, false, false], &[]);
        let classifier = Classifier::default();
        let first = (classifier.finger_states(&hand), classifier.classify(&hand));
        let second = (classifier.finger_states(&hand), classifier.classify(&hand));
        assert_eq!(first.0.as_array(), second.0.as_array());
        assert_eq!(first.1, second.1);
        assert_eq!(first.1, Some(Digit::Two));
    }

    #[test]
    fn orientation_flips_thumb_axis() {
        // A hand built for the left orientation reads as thumb-folded under the right one.
        let hand = hand_with([true, false, false, false, false], &[]);
        let left = Classifier::default();
        let right = Classifier::new(GestureConfig {
            orientation: HandOrientation::Right,
            ..GestureConfig::default()
        });

        assert_eq!(left.classify(&hand), Some(Digit::Ten));
        assert!(!right.finger_states(&hand).is_extended(Finger::Thumb));
        assert_eq!(right.classify(&hand), None);
    }

    #[test]
    fn custom_touch_radius() {
        let classifier = Classifier::new(GestureConfig {
            touch_radius: 200.0,
            ..GestureConfig::default()
        });
        // Pinky 127 px from the thumb: out of reach by default, touching at 200 px.
        let hand = hand_with([false, true, true, true, false], &[]);
        assert_eq!(classifier.classify(&hand), Some(Digit::Six));
    }

    #[test]
    fn debug_format_matches_binary_vector() {
        let states = FingerStates::from([true, false, true, false, false]);
        assert_eq!(format!("{states:?}"), "[1,0,1,0,0]");
    }
}
