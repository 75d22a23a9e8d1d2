//! Forward merge of heart-rate samples onto location fixes.
//!
//! The heart-rate series is usually much sparser than the route. Each fix is
//! paired with the most recent heart-rate value whose sample started strictly
//! before the fix. The cursor into the heart-rate series only ever moves
//! forward, so a full pass is O(n + m).

use crate::export::types::{HeartRateSample, LocationFix};

/// A location fix paired with the heart rate carried forward to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint<'a> {
    pub location: &'a LocationFix,
    pub heart_rate: Option<f64>,
}

/// Iterator yielding one [`TrackPoint`] per location, in location order.
///
/// Both inputs must already be sorted ascending by timestamp. Unsorted input
/// is not detected; the result is whatever the forward scan produces.
#[derive(Debug, Clone)]
pub struct HeartRateMerge<'a> {
    locations: std::slice::Iter<'a, LocationFix>,
    samples: &'a [HeartRateSample],
    cursor: usize,
    current: Option<f64>,
}

impl<'a> HeartRateMerge<'a> {
    pub fn new(locations: &'a [LocationFix], samples: &'a [HeartRateSample]) -> Self {
        Self {
            locations: locations.iter(),
            samples,
            cursor: 0,
            current: None,
        }
    }

    /// Number of heart-rate samples consumed so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Heart rate that would be carried to the next fix if no newer sample qualifies.
    pub fn current(&self) -> Option<f64> {
        self.current
    }
}

impl<'a> Iterator for HeartRateMerge<'a> {
    type Item = TrackPoint<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let location = self.locations.next()?;

        // Strictly earlier only: a sample stamped at the same instant as the
        // fix is picked up by the next later fix.
        while let Some(sample) = self.samples.get(self.cursor) {
            if sample.timestamp >= location.timestamp {
                break;
            }
            self.current = Some(sample.bpm);
            self.cursor += 1;
        }

        Some(TrackPoint {
            location,
            heart_rate: self.current,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.locations.size_hint()
    }
}

impl ExactSizeIterator for HeartRateMerge<'_> {}

/// Merge heart-rate samples onto locations.
pub fn merge_heart_rate<'a>(
    locations: &'a [LocationFix],
    samples: &'a [HeartRateSample],
) -> HeartRateMerge<'a> {
    HeartRateMerge::new(locations, samples)
}
