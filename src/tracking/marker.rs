//! Markers and fixed-size marker sets

use serde::{Deserialize, Serialize};

/// Left hand occupies `[0, 21)`, right hand `[21, 42)`
pub const HAND_MARKERS: usize = 21;

/// One tracked point in normalized video space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Marker {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Marker {
    /// "Not detected this frame"
    pub const SENTINEL: Marker = Marker {
        x: -1.0,
        y: -1.0,
        z: -1.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Validity is signalled by `x` alone
    pub fn is_valid(&self) -> bool {
        self.x != -1.0
    }

    pub fn xy(&self) -> glam::Vec2 {
        glam::Vec2::new(self.x, self.y)
    }
}

/// Which estimator a tracker wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    Hands,
    Body,
}

impl TrackerKind {
    /// Fixed marker count for this kind
    pub fn marker_count(self) -> usize {
        match self {
            TrackerKind::Hands => 2 * HAND_MARKERS,
            TrackerKind::Body => 33,
        }
    }

    /// Floats per recorded sample (x, y, z per marker)
    pub fn record_width(self) -> usize {
        self.marker_count() * 3
    }
}

impl std::fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerKind::Hands => write!(f, "hands"),
            TrackerKind::Body => write!(f, "body"),
        }
    }
}

/// A fixed-size set of markers for one tracker kind.
///
/// Internally a missing marker is `None`; the sentinel only appears when the
/// set is converted to its boundary form.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSet {
    kind: TrackerKind,
    markers: Vec<Option<Marker>>,
}

impl MarkerSet {
    /// All markers missing
    pub fn empty(kind: TrackerKind) -> Self {
        Self {
            kind,
            markers: vec![None; kind.marker_count()],
        }
    }

    pub fn kind(&self) -> TrackerKind {
        self.kind
    }

    /// Always `kind.marker_count()`
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Marker> {
        self.markers.get(index).copied().flatten()
    }

    /// Set a marker; indices past the fixed size are ignored
    pub fn set(&mut self, index: usize, marker: Option<Marker>) {
        if let Some(slot) = self.markers.get_mut(index) {
            *slot = marker.filter(|m| m.is_valid());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<Marker>> + '_ {
        self.markers.iter().copied()
    }

    pub fn valid_count(&self) -> usize {
        self.markers.iter().filter(|m| m.is_some()).count()
    }

    /// Boundary form with `(-1, -1, -1)` for missing markers
    pub fn to_sentinel_array(&self) -> Vec<Marker> {
        self.markers
            .iter()
            .map(|m| m.unwrap_or(Marker::SENTINEL))
            .collect()
    }

    /// Read a boundary-form array; short input is padded with missing
    /// markers and extra entries are dropped
    pub fn from_sentinel_array(kind: TrackerKind, markers: &[Marker]) -> Self {
        let mut set = Self::empty(kind);
        for (i, m) in markers.iter().enumerate().take(kind.marker_count()) {
            set.set(i, Some(*m));
        }
        set
    }

    /// Decode one flat `x, y, z` record
    pub fn from_flat(kind: TrackerKind, values: &[f32]) -> Self {
        let mut set = Self::empty(kind);
        for (i, chunk) in values.chunks_exact(3).enumerate().take(kind.marker_count()) {
            set.set(i, Some(Marker::new(chunk[0], chunk[1], chunk[2])));
        }
        set
    }

    /// Encode as one flat `x, y, z` record
    pub fn to_flat(&self) -> Vec<f32> {
        self.to_sentinel_array()
            .iter()
            .flat_map(|m| [m.x, m.y, m.z])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_counts_are_fixed() {
        assert_eq!(MarkerSet::empty(TrackerKind::Hands).len(), 42);
        assert_eq!(MarkerSet::empty(TrackerKind::Body).len(), 33);
        assert_eq!(TrackerKind::Body.record_width(), 99);
    }

    #[test]
    fn test_set_ignores_out_of_range_and_sentinels() {
        let mut set = MarkerSet::empty(TrackerKind::Body);
        set.set(40, Some(Marker::new(0.5, 0.5, 0.0)));
        assert_eq!(set.len(), 33);
        set.set(3, Some(Marker::SENTINEL));
        assert_eq!(set.get(3), None);
        set.set(3, Some(Marker::new(0.1, 0.2, 0.3)));
        assert_eq!(set.valid_count(), 1);
    }

    #[test]
    fn test_sentinel_boundary() {
        let mut set = MarkerSet::empty(TrackerKind::Hands);
        set.set(0, Some(Marker::new(0.25, 0.75, 0.0)));
        let array = set.to_sentinel_array();
        assert_eq!(array.len(), 42);
        assert!(array[0].is_valid());
        // Every entry is either fully valid or the full sentinel
        assert!(array[1..].iter().all(|m| *m == Marker::SENTINEL));
        assert_eq!(MarkerSet::from_sentinel_array(TrackerKind::Hands, &array), set);
    }

    #[test]
    fn test_flat_record() {
        let mut values = vec![-1.0; 99];
        values[3..6].copy_from_slice(&[0.1, 0.2, 0.3]);
        let set = MarkerSet::from_flat(TrackerKind::Body, &values);
        assert_eq!(set.get(1), Some(Marker::new(0.1, 0.2, 0.3)));
        assert_eq!(set.valid_count(), 1);
        assert_eq!(set.to_flat(), values);
    }
}
