//! Body landmark normalization
//!
//! The backend's 33 landmarks are re-indexed into limb order: head, left arm,
//! right arm, left leg, right leg.

use serde::{Deserialize, Serialize};

use super::marker::{Marker, MarkerSet, TrackerKind};

/// Default minimum visibility for a landmark to be used
pub const DEFAULT_MIN_VISIBILITY: f32 = 0.7;

/// `BODY_PERMUTATION[canonical] = backend index`
pub const BODY_PERMUTATION: [usize; 33] = [
    // head
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10,
    // left arm
    11, 13, 15, 17, 19, 21,
    // right arm
    12, 14, 16, 18, 20, 22,
    // left leg
    23, 25, 27, 29, 31,
    // right leg
    24, 26, 28, 30, 32,
];

/// One landmark as reported by a body backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

/// Re-index landmarks into canonical order, keeping only those with
/// visibility strictly above `min_visibility`
pub fn normalize_body(landmarks: &[BodyLandmark], min_visibility: f32) -> MarkerSet {
    let mut set = MarkerSet::empty(TrackerKind::Body);
    for (canonical, &source) in BODY_PERMUTATION.iter().enumerate() {
        if let Some(lm) = landmarks.get(source) {
            if lm.visibility > min_visibility {
                set.set(canonical, Some(Marker::new(lm.x, lm.y, lm.z)));
            }
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmarks(visibility: f32) -> Vec<BodyLandmark> {
        (0..33)
            .map(|i| BodyLandmark {
                x: i as f32 / 100.0,
                y: 0.5,
                z: 0.0,
                visibility,
            })
            .collect()
    }

    #[test]
    fn test_permutation_is_a_bijection() {
        let mut seen = [false; 33];
        for &i in BODY_PERMUTATION.iter() {
            assert!(!seen[i]);
            seen[i] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_reindexes_limbs() {
        let set = normalize_body(&landmarks(0.9), DEFAULT_MIN_VISIBILITY);
        assert_eq!(set.len(), 33);
        // canonical 12 is the left elbow (backend 13)
        assert_eq!(set.get(12).map(|m| m.x), Some(0.13));
        // canonical 17 starts the right arm (backend 12)
        assert_eq!(set.get(17).map(|m| m.x), Some(0.12));
        assert_eq!(set.get(32).map(|m| m.x), Some(0.32));
    }

    #[test]
    fn test_visibility_threshold_is_strict() {
        let set = normalize_body(&landmarks(0.7), DEFAULT_MIN_VISIBILITY);
        assert_eq!(set.valid_count(), 0);
        assert!(set.to_sentinel_array().iter().all(|m| *m == Marker::SENTINEL));
    }

    #[test]
    fn test_short_input_keeps_fixed_size() {
        let set = normalize_body(&landmarks(0.9)[..5], DEFAULT_MIN_VISIBILITY);
        assert_eq!(set.len(), 33);
        assert_eq!(set.valid_count(), 5);
    }
}
