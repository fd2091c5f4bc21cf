//! Pre-recorded marker playback
//!
//! A recorded track is a flat buffer of fixed-width samples taken at a fixed
//! rate. Playback reads the sample for the video's current time, shifted by a
//! signed offset. Tracks are produced by `TrackRecorder`, which collects timed
//! rows from a live run and resamples them to the fixed rate.

use std::path::Path;

use super::marker::{MarkerSet, TrackerKind};
use super::TrackingError;

/// Default sampling interval of recorded tracks, in seconds
pub const DEFAULT_GRANULARITY: f64 = 0.1;

/// Fixed-rate recorded marker samples for one source
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrack {
    kind: TrackerKind,
    sample_rate_hz: f64,
    data: Vec<f32>,
}

impl RecordedTrack {
    /// Wrap a flat sample buffer; its length must be a whole number of records
    pub fn from_flat(kind: TrackerKind, sample_rate_hz: f64, data: Vec<f32>) -> Result<Self, TrackingError> {
        if !(sample_rate_hz > 0.0) {
            return Err(TrackingError::InvalidSampleRate(sample_rate_hz));
        }
        let width = kind.record_width();
        if data.len() % width != 0 {
            return Err(TrackingError::BadRecordLength { len: data.len(), width });
        }
        Ok(Self {
            kind,
            sample_rate_hz,
            data,
        })
    }

    /// Resample timed rows to one sample per `granularity` seconds.
    ///
    /// The first row is always kept. Each following sample is the first row at
    /// or after the next step time; rows between steps are dropped. Values are
    /// rounded to 3 decimals, with `-1` kept exact.
    pub fn from_timed_rows(
        kind: TrackerKind,
        rows: &[(f64, Vec<f32>)],
        granularity: f64,
    ) -> Result<Self, TrackingError> {
        if !(granularity > 0.0) {
            return Err(TrackingError::InvalidSampleRate(granularity));
        }
        let width = kind.record_width();
        let mut data = Vec::new();
        let mut step_time = 0.0;
        let mut rows = rows.iter().peekable();

        while let Some((_, values)) = rows.next() {
            if values.len() != width {
                return Err(TrackingError::BadRecordLength { len: values.len(), width });
            }
            data.extend(values.iter().map(|v| round_value(*v)));
            step_time += granularity;
            while rows.peek().is_some_and(|(time, _)| *time < step_time) {
                rows.next();
            }
        }

        Self::from_flat(kind, 1.0 / granularity, data)
    }

    /// Parse `time, v0, v1, ...` lines (trailing commas and blank lines allowed)
    pub fn parse_timed_csv(text: &str) -> Result<Vec<(f64, Vec<f32>)>, TrackingError> {
        let mut rows = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split(',').map(str::trim).filter(|f| !f.is_empty());
            let parse_err = |field: &str| TrackingError::Parse {
                line: line_no + 1,
                message: format!("invalid number '{}'", field),
            };
            let time_field = fields.next().unwrap_or_default();
            let time: f64 = time_field.parse().map_err(|_| parse_err(time_field))?;
            let values = fields
                .map(|f| f.parse::<f32>().map_err(|_| parse_err(f)))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push((time, values));
        }
        Ok(rows)
    }

    /// Load a track from disk.
    ///
    /// `.json` files hold a flat number array already at `sample_rate_hz`;
    /// anything else is read as timed CSV and resampled to that rate.
    pub fn load(path: &Path, kind: TrackerKind, sample_rate_hz: f64) -> Result<Self, TrackingError> {
        let text = std::fs::read_to_string(path).map_err(|e| TrackingError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let track = if is_json {
            let data: Vec<f32> = serde_json::from_str(&text).map_err(|e| TrackingError::Parse {
                line: e.line(),
                message: e.to_string(),
            })?;
            Self::from_flat(kind, sample_rate_hz, data)?
        } else {
            let rows = Self::parse_timed_csv(&text)?;
            Self::from_timed_rows(kind, &rows, 1.0 / sample_rate_hz)?
        };

        tracing::info!(
            path = %path.display(),
            kind = %kind,
            samples = track.len(),
            "Loaded recorded track"
        );
        Ok(track)
    }

    pub fn kind(&self) -> TrackerKind {
        self.kind
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.data.len() / self.kind.record_width()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// `floor(time * rate) + round(offset * rate)`
    pub fn sample_index(&self, time_seconds: f64, offset_seconds: f64) -> i64 {
        let offset_samples = (offset_seconds * self.sample_rate_hz).round() as i64;
        (time_seconds * self.sample_rate_hz).floor() as i64 + offset_samples
    }

    /// Decode the sample at `index`; out of range yields all markers missing
    pub fn sample(&self, index: i64) -> MarkerSet {
        if index < 0 || index as usize >= self.len() {
            return MarkerSet::empty(self.kind);
        }
        let width = self.kind.record_width();
        let start = index as usize * width;
        MarkerSet::from_flat(self.kind, &self.data[start..start + width])
    }

    /// Sample for a playback time
    pub fn sample_at(&self, time_seconds: f64, offset_seconds: f64) -> MarkerSet {
        self.sample(self.sample_index(time_seconds, offset_seconds))
    }
}

fn round_value(v: f32) -> f32 {
    if v == -1.0 {
        v
    } else {
        (v * 1000.0).round() / 1000.0
    }
}

/// Collects `(time, markers)` rows from a live tracking run
#[derive(Debug, Clone)]
pub struct TrackRecorder {
    kind: TrackerKind,
    rows: Vec<(f64, Vec<f32>)>,
}

impl TrackRecorder {
    pub fn new(kind: TrackerKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
        }
    }

    pub fn record(&mut self, time_seconds: f64, markers: &MarkerSet) {
        self.rows.push((time_seconds, markers.to_flat()));
    }

    pub fn rows(&self) -> &[(f64, Vec<f32>)] {
        &self.rows
    }

    /// Timed CSV, one row per recorded callback
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for (time, values) in &self.rows {
            out.push_str(&time.to_string());
            for v in values {
                out.push_str(", ");
                out.push_str(&v.to_string());
            }
            out.push_str(",\n");
        }
        out
    }

    /// Resample the collected rows into a playable track
    pub fn finish(&self, granularity: f64) -> Result<RecordedTrack, TrackingError> {
        RecordedTrack::from_timed_rows(self.kind, &self.rows, granularity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::Marker;

    fn track_with_samples(n: usize) -> RecordedTrack {
        let width = TrackerKind::Body.record_width();
        let mut data = Vec::with_capacity(n * width);
        for i in 0..n {
            let x = i as f32 / 100.0;
            for _ in 0..33 {
                data.extend([x, 0.5, 0.0]);
            }
        }
        RecordedTrack::from_flat(TrackerKind::Body, 10.0, data).unwrap()
    }

    #[test]
    fn test_sample_index_at_rate() {
        let track = track_with_samples(20);
        assert_eq!(track.sample_index(1.03, 0.0), 10);
        assert_eq!(track.sample_at(1.03, 0.0).get(0).map(|m| m.x), Some(0.10));
        assert_eq!(track.sample_index(1.03, -0.5), 5);
        assert_eq!(track.sample_index(1.03, 0.2), 12);
    }

    #[test]
    fn test_out_of_range_is_all_sentinel() {
        let track = track_with_samples(3);
        for index in [-1, 3, 1000] {
            let set = track.sample(index);
            assert_eq!(set.len(), 33);
            assert_eq!(set.valid_count(), 0);
        }
    }

    #[test]
    fn test_from_flat_rejects_partial_records() {
        let err = RecordedTrack::from_flat(TrackerKind::Hands, 10.0, vec![0.0; 127]).unwrap_err();
        assert!(matches!(err, TrackingError::BadRecordLength { len: 127, width: 126 }));
        assert!(RecordedTrack::from_flat(TrackerKind::Hands, 0.0, vec![]).is_err());
    }

    #[test]
    fn test_timed_rows_resample() {
        let width = TrackerKind::Body.record_width();
        let row = |v: f32| vec![v; width];
        let rows = vec![
            (0.00, row(0.1)),
            (0.04, row(0.2)),
            (0.09, row(0.3)),
            (0.12, row(0.4)),
            (0.15, row(0.5)),
            (0.31, row(0.6)),
        ];
        let track = RecordedTrack::from_timed_rows(TrackerKind::Body, &rows, 0.1).unwrap();
        assert_eq!(track.len(), 3);
        assert_eq!(track.sample(0).get(0).map(|m| m.x), Some(0.1));
        assert_eq!(track.sample(1).get(0).map(|m| m.x), Some(0.4));
        assert_eq!(track.sample(2).get(0).map(|m| m.x), Some(0.6));
        assert!((track.sample_rate_hz() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rounding_keeps_sentinel() {
        assert_eq!(round_value(-1.0), -1.0);
        assert_eq!(round_value(0.123456), 0.123);
    }

    #[test]
    fn test_parse_timed_csv() {
        let rows = RecordedTrack::parse_timed_csv("0.5, 1, 2,\n\n0.6, -1, 3,\n").unwrap();
        assert_eq!(rows, vec![(0.5, vec![1.0, 2.0]), (0.6, vec![-1.0, 3.0])]);
        assert!(matches!(
            RecordedTrack::parse_timed_csv("0.5, x"),
            Err(TrackingError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_recorder_round_trip_through_csv() {
        let mut recorder = TrackRecorder::new(TrackerKind::Hands);
        let mut set = MarkerSet::empty(TrackerKind::Hands);
        set.set(0, Some(Marker::new(0.25, 0.5, 0.0)));
        recorder.record(0.0, &set);
        recorder.record(0.05, &MarkerSet::empty(TrackerKind::Hands));
        recorder.record(0.1, &MarkerSet::empty(TrackerKind::Hands));

        let rows = RecordedTrack::parse_timed_csv(&recorder.to_csv()).unwrap();
        assert_eq!(rows.len(), 3);

        let track = recorder.finish(0.1).unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.sample(0), set);
        assert_eq!(track.sample(1).valid_count(), 0);
    }
}
