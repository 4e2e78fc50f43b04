use std::cmp::Ordering;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Rational presentation time: `value / timescale` seconds.
///
/// Equality and ordering compare the rational value, so `1/60` equals
/// `2/120`. The timescale is always positive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MediaTime {
    value: i64,
    timescale: i32,
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime { value: 0, timescale: 1 };

    /// A negative timescale is normalized by flipping both signs; a zero
    /// timescale is treated as 1.
    pub fn new(value: i64, timescale: i32) -> Self {
        match timescale {
            0 => Self { value, timescale: 1 },
            ts if ts < 0 => Self {
                value: value.saturating_neg(),
                timescale: ts.checked_neg().unwrap_or(i32::MAX),
            },
            ts => Self { value, timescale: ts },
        }
    }

    /// Nanosecond-resolution time from seconds.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self::new((secs * 1_000_000_000.0).round() as i64, 1_000_000_000)
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn timescale(&self) -> i32 {
        self.timescale
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.value as f64 / f64::from(self.timescale)
    }

    /// `self - earlier`, clamped at zero, in seconds.
    pub fn secs_since(&self, earlier: MediaTime) -> f64 {
        (self.as_secs_f64() - earlier.as_secs_f64()).max(0.0)
    }

    fn cross(&self, other: &MediaTime) -> (i128, i128) {
        (
            i128::from(self.value) * i128::from(other.timescale),
            i128::from(other.value) * i128::from(self.timescale),
        )
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = self.cross(other);
        a == b
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = self.cross(other);
        a.cmp(&b)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.timescale)
    }
}

/// Which track a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured unit of media. Immutable once produced; cloning shares the
/// underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    kind: TrackKind,
    pts: MediaTime,
    data: Bytes,
}

impl Sample {
    pub fn new(kind: TrackKind, pts: MediaTime, data: impl Into<Bytes>) -> Self {
        Self {
            kind,
            pts,
            data: data.into(),
        }
    }

    pub fn video(pts: MediaTime, data: impl Into<Bytes>) -> Self {
        Self::new(TrackKind::Video, pts, data)
    }

    pub fn audio(pts: MediaTime, data: impl Into<Bytes>) -> Self {
        Self::new(TrackKind::Audio, pts, data)
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Presentation timestamp assigned by the source's clock.
    pub fn pts(&self) -> MediaTime {
        self.pts
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A display that can be captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    pub id: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// A microphone device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn media_time_compares_rationally() {
        assert_eq!(MediaTime::new(1, 60), MediaTime::new(2, 120));
        assert!(MediaTime::new(1, 60) < MediaTime::new(1, 30));
        assert!(MediaTime::new(50, 1) < MediaTime::new(100, 1));
        assert!(MediaTime::new(-1, 1000) < MediaTime::ZERO);
    }

    #[test]
    fn media_time_clamps_timescale() {
        let t = MediaTime::new(5, 0);
        assert_eq!(t.timescale(), 1);
        assert_eq!(t, MediaTime::new(5, 1));
    }

    #[test]
    fn media_time_normalizes_negative_timescale() {
        let t = MediaTime::new(5, -2);
        assert_eq!(t.value(), -5);
        assert_eq!(t.timescale(), 2);
        assert_relative_eq!(t.as_secs_f64(), -2.5);
        assert!(t < MediaTime::ZERO);
    }

    #[test]
    fn media_time_seconds() {
        assert_relative_eq!(MediaTime::new(3, 2).as_secs_f64(), 1.5);
        assert_relative_eq!(MediaTime::from_secs_f64(0.25).as_secs_f64(), 0.25);
        assert_relative_eq!(MediaTime::new(10, 1).secs_since(MediaTime::new(4, 1)), 6.0);
        assert_relative_eq!(MediaTime::new(4, 1).secs_since(MediaTime::new(10, 1)), 0.0);
    }

    #[test]
    fn sample_shares_buffer_on_clone() {
        let sample = Sample::video(MediaTime::new(7, 1), vec![1u8, 2, 3]);
        let copy = sample.clone();
        assert_eq!(copy.kind(), TrackKind::Video);
        assert_eq!(copy.pts(), MediaTime::new(7, 1));
        assert_eq!(copy.data().as_ptr(), sample.data().as_ptr());
        assert_eq!(copy.len(), 3);
    }
}
