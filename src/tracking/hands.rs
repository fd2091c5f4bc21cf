//! Hand landmark normalization
//!
//! Up to two detected hands are written into the fixed 42-marker layout by
//! their handedness label.

use serde::{Deserialize, Serialize};

use super::marker::{Marker, MarkerSet, TrackerKind, HAND_MARKERS};

/// Default minimum handedness score for a detection to be used
pub const DEFAULT_MIN_HAND_SCORE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// First marker index of this hand's block
    pub fn offset(self) -> usize {
        match self {
            Handedness::Left => 0,
            Handedness::Right => HAND_MARKERS,
        }
    }
}

/// One detected hand as reported by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandDetection {
    pub handedness: Handedness,
    /// Handedness classification score
    pub score: f32,
    /// 21 landmarks in normalized coordinates
    pub landmarks: Vec<Marker>,
}

/// Place detections into the 42-marker layout.
///
/// Detections below `min_score` are dropped. If a label appears twice the
/// higher score wins. A hand with no usable detection stays missing.
pub fn normalize_hands(detections: &[HandDetection], min_score: f32) -> MarkerSet {
    let mut set = MarkerSet::empty(TrackerKind::Hands);

    for hand in [Handedness::Left, Handedness::Right] {
        let best = detections
            .iter()
            .filter(|d| d.handedness == hand && d.score >= min_score)
            .max_by(|a, b| a.score.total_cmp(&b.score));

        if let Some(detection) = best {
            for (i, landmark) in detection.landmarks.iter().take(HAND_MARKERS).enumerate() {
                set.set(hand.offset() + i, Some(*landmark));
            }
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(handedness: Handedness, score: f32, x: f32) -> HandDetection {
        HandDetection {
            handedness,
            score,
            landmarks: vec![Marker::new(x, 0.5, 0.0); HAND_MARKERS],
        }
    }

    #[test]
    fn test_left_and_right_blocks() {
        let set = normalize_hands(
            &[hand(Handedness::Right, 0.9, 0.8), hand(Handedness::Left, 0.9, 0.2)],
            DEFAULT_MIN_HAND_SCORE,
        );
        assert_eq!(set.len(), 42);
        assert!((0..21).all(|i| set.get(i).map(|m| m.x) == Some(0.2)));
        assert!((21..42).all(|i| set.get(i).map(|m| m.x) == Some(0.8)));
    }

    #[test]
    fn test_missing_hand_stays_sentinel() {
        let set = normalize_hands(&[hand(Handedness::Left, 0.9, 0.2)], DEFAULT_MIN_HAND_SCORE);
        assert_eq!(set.valid_count(), 21);
        assert!(set.to_sentinel_array()[21..].iter().all(|m| !m.is_valid()));
    }

    #[test]
    fn test_low_score_and_duplicates() {
        let set = normalize_hands(
            &[
                hand(Handedness::Left, 0.3, 0.1),
                hand(Handedness::Right, 0.6, 0.4),
                hand(Handedness::Right, 0.95, 0.7),
            ],
            DEFAULT_MIN_HAND_SCORE,
        );
        assert_eq!(set.get(0), None);
        assert_eq!(set.get(21).map(|m| m.x), Some(0.7));
    }

    #[test]
    fn test_extra_landmarks_do_not_spill() {
        let mut detection = hand(Handedness::Left, 0.9, 0.3);
        detection.landmarks.push(Marker::new(0.9, 0.9, 0.9));
        let set = normalize_hands(&[detection], DEFAULT_MIN_HAND_SCORE);
        assert_eq!(set.get(21), None);
    }
}
