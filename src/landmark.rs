//! Common code for visual landmark estimation.

use std::iter;

use crate::filter::Filter;
use crate::iter::zip_exact;

/// A position in frame pixel coordinates.
pub type Position = [f32; 2];

/// A fixed-size collection of 2D landmark positions.
#[derive(Debug, Clone)]
pub struct Landmarks {
    positions: Box<[Position]>,
}

impl Landmarks {
    /// Creates a new [`Landmarks`] collection containing `len` preallocated landmarks.
    ///
    /// All landmarks will start with all coordinates at `0.0`.
    pub fn new(len: usize) -> Self {
        Self {
            positions: vec![[0.0, 0.0]; len].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    #[inline]
    pub fn positions_mut(&mut self) -> &mut [Position] {
        &mut self.positions
    }

    /// Computes the average of all landmark positions.
    pub fn average_position(&self) -> Position {
        let mut center = [0.0; 2];
        for pos in self.positions() {
            center[0] += pos[0] / self.positions.len() as f32;
            center[1] += pos[1] / self.positions.len() as f32;
        }
        center
    }

    pub fn map_positions(&mut self, mut f: impl FnMut(Position) -> Position) {
        for pos in self.positions_mut() {
            *pos = f(*pos);
        }
    }
}

/// Batch-filter for landmarks.
///
/// This should be applied to the unadjusted landmarks output by the neural network, otherwise the
/// filter parameters require tuning that depends on the input image size, which may vary across
/// invocations.
pub struct LandmarkFilter {
    filter: Box<dyn FnMut(&mut Landmarks) + Send>,
}

/// The default [`LandmarkFilter`] does not perform any filtering.
impl Default for LandmarkFilter {
    fn default() -> Self {
        Self {
            filter: Box::new(|_| ()),
        }
    }
}

impl LandmarkFilter {
    /// Creates a new landmark filter.
    ///
    /// # Parameters
    ///
    /// - `filter` is the set of filter parameters to use.
    /// - `num_landmarks` is the number of landmarks that will be filtered with this filter in each
    ///   batch.
    pub fn new<F: Filter<f32> + Send + 'static>(filter: F, num_landmarks: usize) -> Self
    where
        F::State: Send,
    {
        let mut states = iter::repeat_with(|| [F::State::default(), F::State::default()])
            .take(num_landmarks)
            .collect::<Vec<_>>();

        Self {
            filter: Box::new(move |landmarks| {
                for (lm, state) in zip_exact(&mut *landmarks.positions, &mut states) {
                    for (coord, state) in zip_exact(lm, state) {
                        *coord = filter.filter(state, *coord);
                    }
                }
            }),
        }
    }

    /// Filters a list of landmarks in-place.
    ///
    /// # Panics
    ///
    /// This method panics if `landmarks` does not have exactly as many entries as were specified in
    /// the `num_landmarks` parameter in the call to [`LandmarkFilter::new`].
    pub fn filter(&mut self, landmarks: &mut Landmarks) {
        (self.filter)(landmarks);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::filter::ema::Ema;

    use super::*;

    #[test]
    fn filter_smooths_each_coordinate() {
        let mut filter = LandmarkFilter::new(Ema::new(0.5), 2);
        let mut landmarks = Landmarks::new(2);
        landmarks.positions_mut()[0] = [1.0, 2.0];
        landmarks.positions_mut()[1] = [10.0, 20.0];

        // The first batch passes through unchanged.
        filter.filter(&mut landmarks);
        assert_eq!(landmarks.positions(), &[[1.0, 2.0], [10.0, 20.0]]);

        landmarks.positions_mut()[0] = [3.0, 4.0];
        landmarks.positions_mut()[1] = [10.0, 20.0];
        filter.filter(&mut landmarks);
        assert_relative_eq!(landmarks.positions()[0][0], 2.0);
        assert_relative_eq!(landmarks.positions()[0][1], 3.0);
        assert_relative_eq!(landmarks.positions()[1][0], 10.0);
        assert_relative_eq!(landmarks.positions()[1][1], 20.0);
    }

    #[test]
    fn average() {
        let mut landmarks = Landmarks::new(2);
        landmarks.positions_mut()[0] = [0.0, 10.0];
        landmarks.positions_mut()[1] = [4.0, 30.0];
        assert_eq!(landmarks.average_position(), [2.0, 20.0]);
    }
}
