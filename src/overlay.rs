//! The digit overlay image set.
//!
//! Ten images, one per sign-language digit, loaded once at startup and
//! immutable afterwards. The selected image is written into the top-left
//! corner of the output frame as a raw pixel block; no scaling, blending, or
//! alpha compositing takes place.

use std::path::Path;

use anyhow::Context;
use itertools::Itertools;

use crate::gesture::Digit;
use crate::image::Image;

/// The number of images an overlay directory must contain.
pub const NUM_DIGITS: usize = 10;

/// The set of ten digit images, indexed by [`Digit`].
pub struct DigitOverlays {
    images: Vec<Image>,
}

impl DigitOverlays {
    /// Loads the digit images from a directory.
    ///
    /// The directory must contain exactly [`NUM_DIGITS`] image files; sorted by file name, they
    /// are assigned to digits 1 through 10 in that order. Anything else is an error: a missing or
    /// extra file would silently shift every classification onto the wrong image.
    pub fn load<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        Self::load_impl(dir.as_ref())
    }

    fn load_impl(dir: &Path) -> anyhow::Result<Self> {
        let paths = std::fs::read_dir(dir)
            .with_context(|| format!("failed to list digit images in '{}'", dir.display()))?
            .map_ok(|entry| entry.path())
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .sorted()
            .collect::<Vec<_>>();

        if paths.len() != NUM_DIGITS {
            anyhow::bail!(
                "digit image directory '{}' contains {} entries, expected exactly {}",
                dir.display(),
                paths.len(),
                NUM_DIGITS,
            );
        }

        let mut images = Vec::with_capacity(NUM_DIGITS);
        for path in &paths {
            let image = Image::load(path)
                .with_context(|| format!("failed to load digit image '{}'", path.display()))?;
            log::debug!("loaded digit image '{}' ({:?})", path.display(), image);
            images.push(image);
        }

        Ok(Self { images })
    }

    /// Returns the image associated with `digit`.
    pub fn get(&self, digit: Digit) -> &Image {
        &self.images[digit.index()]
    }

    /// Writes `digit`'s image into the top-left corner of `frame`.
    ///
    /// Errors if the digit image does not fit inside the frame.
    pub fn apply(&self, frame: &mut Image, digit: Digit) -> anyhow::Result<()> {
        frame
            .blit_from(self.get(digit), 0, 0)
            .with_context(|| format!("digit {digit} overlay does not fit the frame"))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::image::Color;

    use super::*;

    /// Creates a scratch directory containing `count` tiny digit images.
    fn digit_dir(name: &str, count: usize) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mudra-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            let mut image = Image::new(4, 4);
            image.clear(Color::from_rgb8(i as u8, 0, 0));
            image.save(dir.join(format!("{:02}.png", i + 1))).unwrap();
        }
        dir
    }

    #[test]
    fn loads_exactly_ten_images_in_name_order() {
        let dir = digit_dir("ten", 10);
        let overlays = DigitOverlays::load(&dir).unwrap();
        // sorted file order maps 01.png to One and 10.png to Ten
        assert_eq!(overlays.get(Digit::One).get(0, 0), Color::from_rgb8(0, 0, 0));
        assert_eq!(overlays.get(Digit::Ten).get(0, 0), Color::from_rgb8(9, 0, 0));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_short_directories() {
        let dir = digit_dir("nine", 9);
        assert!(DigitOverlays::load(&dir).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_missing_directories() {
        let dir = std::env::temp_dir().join("mudra-does-not-exist");
        assert!(DigitOverlays::load(&dir).is_err());
    }

    #[test]
    fn apply_replaces_top_left_block() {
        let dir = digit_dir("apply", 10);
        let overlays = DigitOverlays::load(&dir).unwrap();

        let mut frame = Image::new(8, 8);
        frame.clear(Color::WHITE);
        overlays.apply(&mut frame, Digit::Three).unwrap();
        assert_eq!(frame.get(0, 0), Color::from_rgb8(2, 0, 0));
        assert_eq!(frame.get(3, 3), Color::from_rgb8(2, 0, 0));
        assert_eq!(frame.get(4, 4), Color::WHITE);

        // a frame smaller than the overlay is rejected
        let mut tiny = Image::new(2, 2);
        assert!(overlays.apply(&mut tiny, Digit::Three).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
