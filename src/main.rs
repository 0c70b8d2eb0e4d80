use mudra::camera::{Webcam, WebcamOptions};
use mudra::filter::ema::Ema;
use mudra::gesture::{Classifier, Digit, GestureConfig};
use mudra::gui;
use mudra::hand::{HandLandmarker, LandmarkerOptions, NUM_LANDMARKS};
use mudra::landmark::LandmarkFilter;
use mudra::overlay::DigitOverlays;
use mudra::timer::FpsCounter;

const DIGIT_IMAGE_DIR: &str = "assets/digits";

fn main() {
    mudra::init_logger!();
    gui::run(run);
}

fn run() -> anyhow::Result<()> {
    let overlays = DigitOverlays::load(DIGIT_IMAGE_DIR)?;

    let mut landmarker = HandLandmarker::new(LandmarkerOptions::default())?;
    landmarker.set_filter(LandmarkFilter::new(Ema::new(0.7), NUM_LANDMARKS));

    let classifier = Classifier::new(GestureConfig::default());

    let mut webcam = Webcam::open(WebcamOptions::default())?;
    let frame_res = webcam.resolution();
    for digit in Digit::ALL {
        let image = overlays.get(digit);
        if image.width() > frame_res.width() || image.height() > frame_res.height() {
            anyhow::bail!(
                "digit {digit} image ({:?}) does not fit the {frame_res} camera frame",
                image,
            );
        }
    }

    let mut fps = FpsCounter::new("digits");
    loop {
        let mut image = webcam.read()?;

        if let Some(hand) = landmarker.detect(&image)? {
            hand.draw(&mut image);

            let states = classifier.finger_states(&hand);
            match classifier.classify_states(states, &hand) {
                Some(digit) => {
                    log::trace!("fingers {states:?} -> digit {digit}");
                    overlays.apply(&mut image, digit)?;
                }
                None => log::trace!("fingers {states:?} -> no digit"),
            }
        }

        gui::show_image("mudra", &image);

        fps.tick_with(webcam.timers().chain(landmarker.timers()));
    }
}
