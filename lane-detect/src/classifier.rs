//! Left/right classification of raw line candidates
//!
//! A candidate's orientation is normalized into [0, pi) and matched against
//! two disjoint angular windows. Near-vertical-leaning-left lines fall in
//! the left window, near-vertical-leaning-right lines in the right window;
//! everything else (near-horizontal clutter) is neither.

use std::f64::consts::PI;

use thiserror::Error;

use crate::primitives::LineCandidate;

/// Default left-lane angular window, radians.
pub const DEFAULT_LEFT_WINDOW: AngleWindow = AngleWindow { lo: 1.588, hi: 2.443 };
/// Default right-lane angular window, radians.
pub const DEFAULT_RIGHT_WINDOW: AngleWindow = AngleWindow { lo: 0.698, hi: 1.553 };

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("angle window [{lo}, {hi}) is not a valid sub-range of [0, pi)")]
    InvalidWindow { lo: f64, hi: f64 },
    #[error("left and right windows overlap")]
    OverlappingWindows,
}

/// Half-open angular window `[lo, hi)` over line orientations in [0, pi).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleWindow {
    pub lo: f64,
    pub hi: f64,
}

impl AngleWindow {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.lo && angle < self.hi
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        if self.lo < 0.0 || self.hi > PI || self.lo >= self.hi {
            return Err(ClassifierError::InvalidWindow {
                lo: self.lo,
                hi: self.hi,
            });
        }
        Ok(())
    }

    fn overlaps(&self, other: &AngleWindow) -> bool {
        self.lo < other.hi && other.lo < self.hi
    }
}

/// Classification of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Left,
    Right,
    Neither,
}

/// Orientation of the infinite line through a candidate's endpoints,
/// normalized into [0, pi).
pub fn orientation(candidate: &LineCandidate) -> f64 {
    let mut angle = (candidate.y1 - candidate.y2).atan2(candidate.x1 - candidate.x2);
    if angle < 0.0 {
        angle += PI;
    }
    if angle >= PI {
        angle -= PI;
    }
    angle
}

/// Classifies candidates by orientation against two disjoint windows.
///
/// Windows are fixed at construction.
pub struct LineClassifier {
    left: AngleWindow,
    right: AngleWindow,
}

impl LineClassifier {
    pub fn new(left: AngleWindow, right: AngleWindow) -> Result<Self, ClassifierError> {
        left.validate()?;
        right.validate()?;
        if left.overlaps(&right) {
            return Err(ClassifierError::OverlappingWindows);
        }
        Ok(Self { left, right })
    }

    pub fn classify(&self, candidate: &LineCandidate) -> LineClass {
        let angle = orientation(candidate);
        if self.left.contains(angle) {
            LineClass::Left
        } else if self.right.contains(angle) {
            LineClass::Right
        } else {
            LineClass::Neither
        }
    }

    /// Scan candidates in the supplied order and pick the first left and
    /// first right match, stopping as soon as both are found.
    ///
    /// Callers wanting a deterministic result must supply a deterministic
    /// order (the analyzer ranks by descending votes first).
    pub fn select<'a>(
        &self,
        candidates: &'a [LineCandidate],
    ) -> (Option<&'a LineCandidate>, Option<&'a LineCandidate>) {
        let mut left = None;
        let mut right = None;

        for candidate in candidates {
            match self.classify(candidate) {
                LineClass::Left if left.is_none() => left = Some(candidate),
                LineClass::Right if right.is_none() => right = Some(candidate),
                _ => {}
            }
            if left.is_some() && right.is_some() {
                break;
            }
        }

        (left, right)
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        // The compiled-in windows are valid and disjoint.
        Self {
            left: DEFAULT_LEFT_WINDOW,
            right: DEFAULT_RIGHT_WINDOW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate_at(angle: f64) -> LineCandidate {
        // Build a candidate whose endpoint difference has the requested
        // orientation.
        LineCandidate::new(10.0 * angle.cos(), 10.0 * angle.sin(), 0.0, 0.0, 1)
    }

    #[test]
    fn test_window_classification() {
        let classifier = LineClassifier::default();

        assert_eq!(classifier.classify(&candidate_at(1.9)), LineClass::Left);
        assert_eq!(classifier.classify(&candidate_at(1.0)), LineClass::Right);
        assert_eq!(classifier.classify(&candidate_at(0.3)), LineClass::Neither);
    }

    #[test]
    fn test_orientation_wraps_into_half_turn() {
        // Opposite endpoint order flips the raw atan2 result by pi but
        // must yield the same orientation.
        let a = LineCandidate::new(0.0, 0.0, 10.0, 10.0, 1);
        let b = LineCandidate::new(10.0, 10.0, 0.0, 0.0, 1);
        assert!((orientation(&a) - orientation(&b)).abs() < 1e-12);

        // Horizontal line has orientation 0, not pi.
        let h = LineCandidate::new(10.0, 0.0, 0.0, 0.0, 1);
        assert!(orientation(&h).abs() < 1e-12);
    }

    #[test]
    fn test_first_match_wins() {
        let classifier = LineClassifier::default();
        let first_left = candidate_at(1.7);
        let second_left = candidate_at(2.0);
        let right = candidate_at(1.2);

        let candidates = [first_left, second_left, right];
        let (left, found_right) = classifier.select(&candidates);
        assert_eq!(left, Some(&first_left));
        assert_eq!(found_right, Some(&right));
    }

    #[test]
    fn test_select_with_no_candidates() {
        let classifier = LineClassifier::default();
        let (left, right) = classifier.select(&[]);
        assert!(left.is_none());
        assert!(right.is_none());
    }

    #[test]
    fn test_overlapping_windows_rejected() {
        let result = LineClassifier::new(
            AngleWindow::new(1.0, 2.0),
            AngleWindow::new(1.5, 2.5),
        );
        assert!(matches!(result, Err(ClassifierError::OverlappingWindows)));
    }

    #[test]
    fn test_out_of_range_window_rejected() {
        assert!(LineClassifier::new(
            AngleWindow::new(-0.1, 1.0),
            DEFAULT_RIGHT_WINDOW
        )
        .is_err());
        assert!(LineClassifier::new(
            DEFAULT_LEFT_WINDOW,
            AngleWindow::new(1.0, 0.5)
        )
        .is_err());
    }
}
