//! End-to-end tests for the classification layer, using hand landmark sets
//! constructed the way an alternative landmark provider would.

use mudra::gesture::{Classifier, Digit, Finger, FingerStates, GestureConfig, HandOrientation};
use mudra::hand::{HandLandmarks, LandmarkIdx, NUM_LANDMARKS};

/// Places every landmark of a fist-like hand, then applies `adjust` to individual landmarks.
fn hand(adjust: &[(LandmarkIdx, [f32; 2])]) -> HandLandmarks {
    // A loose fist: every tip below its PIP joint, thumb tip to the right of its MCP.
    let mut positions = [[0.0f32; 2]; NUM_LANDMARKS];
    positions[LandmarkIdx::Wrist as usize] = [300.0, 420.0];

    positions[LandmarkIdx::ThumbMcp as usize] = [280.0, 340.0];
    positions[LandmarkIdx::ThumbTip as usize] = [330.0, 330.0];

    for (pip, tip, x) in [
        (LandmarkIdx::IndexFingerPip, LandmarkIdx::IndexFingerTip, 340.0),
        (LandmarkIdx::MiddleFingerPip, LandmarkIdx::MiddleFingerTip, 365.0),
        (LandmarkIdx::RingFingerPip, LandmarkIdx::RingFingerTip, 390.0),
        (LandmarkIdx::PinkyPip, LandmarkIdx::PinkyTip, 415.0),
    ] {
        positions[pip as usize] = [x, 280.0];
        positions[tip as usize] = [x, 320.0];
    }

    for (idx, pos) in adjust {
        positions[*idx as usize] = *pos;
    }

    HandLandmarks::from_positions(positions)
}

#[test]
fn fist_yields_no_digit() {
    let classifier = Classifier::default();
    let hand = hand(&[]);
    assert_eq!(
        classifier.finger_states(&hand).as_array(),
        [false, false, false, false, false]
    );
    assert_eq!(classifier.classify(&hand), None);
}

#[test]
fn thumb_and_index_up_is_not_in_the_table() {
    // Thumb tip left of its MCP (x), index tip above its PIP (y), all others folded:
    // vector [1,1,0,0,0], which matches no row.
    let classifier = Classifier::default();
    let hand = hand(&[
        (LandmarkIdx::ThumbTip, [250.0, 330.0]),
        (LandmarkIdx::IndexFingerTip, [340.0, 240.0]),
    ]);
    let states = classifier.finger_states(&hand);
    assert_eq!(states.as_array(), [true, true, false, false, false]);
    assert_eq!(classifier.classify(&hand), None);
}

#[test]
fn index_up_is_one() {
    let classifier = Classifier::default();
    let hand = hand(&[(LandmarkIdx::IndexFingerTip, [340.0, 240.0])]);
    assert_eq!(classifier.classify(&hand), Some(Digit::One));
}

#[test]
fn six_depends_on_pinky_thumb_distance() {
    let classifier = Classifier::default();

    // Index, middle, and ring up; pinky folded with its tip 10 px from the thumb tip.
    let near = hand(&[
        (LandmarkIdx::IndexFingerTip, [340.0, 240.0]),
        (LandmarkIdx::MiddleFingerTip, [365.0, 240.0]),
        (LandmarkIdx::RingFingerTip, [390.0, 240.0]),
        (LandmarkIdx::PinkyTip, [340.0, 330.0]),
        (LandmarkIdx::PinkyPip, [340.0, 290.0]),
    ]);
    assert_eq!(
        classifier.finger_states(&near).as_array(),
        [false, true, true, true, false]
    );
    assert_eq!(classifier.classify(&near), Some(Digit::Six));

    // The same vector with the pinky tip 200 px away matches no row; there is no fallback.
    let far = hand(&[
        (LandmarkIdx::IndexFingerTip, [340.0, 240.0]),
        (LandmarkIdx::MiddleFingerTip, [365.0, 240.0]),
        (LandmarkIdx::RingFingerTip, [390.0, 240.0]),
        (LandmarkIdx::PinkyTip, [530.0, 330.0]),
        (LandmarkIdx::PinkyPip, [530.0, 290.0]),
    ]);
    assert_eq!(
        classifier.finger_states(&far).as_array(),
        [false, true, true, true, false]
    );
    assert_eq!(classifier.classify(&far), None);
}

#[test]
fn mirrored_orientation_reads_the_thumb_the_other_way() {
    let right_handed = Classifier::new(GestureConfig {
        orientation: HandOrientation::Right,
        ..GestureConfig::default()
    });

    // For a right hand, an extended thumb points the other way: tip right of its MCP.
    let hand = hand(&[(LandmarkIdx::ThumbTip, [330.0, 330.0])]);
    assert!(right_handed
        .finger_states(&hand)
        .is_extended(Finger::Thumb));
    assert_eq!(right_handed.classify(&hand), Some(Digit::Ten));
}

#[test]
fn precomputed_states_can_be_fed_back() {
    let classifier = Classifier::default();
    let hand = hand(&[]);
    let states = FingerStates::from([false, true, true, false, false]);
    assert_eq!(classifier.classify_states(states, &hand), Some(Digit::Two));
}
