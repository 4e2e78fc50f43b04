use crate::models::media::MediaTime;

/// Session-wide time anchor.
///
/// Video and audio come from independent clocks. The container timeline
/// starts at whichever sample is observed first, from either source; a
/// latency skew between the two first samples stays as a constant offset
/// between the tracks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeBase {
    anchor: Option<MediaTime>,
    sealed: bool,
}

impl TimeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor(&self) -> Option<MediaTime> {
        self.anchor
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// Offer a sample timestamp. Returns the anchor only on the call that
    /// establishes it.
    pub fn observe(&mut self, pts: MediaTime) -> Option<MediaTime> {
        if self.anchor.is_some() || self.sealed {
            return None;
        }
        self.anchor = Some(pts);
        self.anchor
    }

    /// Stop accepting a new anchor. An existing anchor is kept.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Seconds from the anchor to `pts`, negative for samples stamped
    /// before it.
    pub fn offset_secs(&self, pts: MediaTime) -> Option<f64> {
        self.anchor.map(|anchor| pts.as_secs_f64() - anchor.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn first_observation_wins() {
        let mut timebase = TimeBase::new();
        assert_eq!(timebase.observe(MediaTime::new(100, 1)), Some(MediaTime::new(100, 1)));
        assert_eq!(timebase.observe(MediaTime::new(50, 1)), None);
        assert_eq!(timebase.observe(MediaTime::new(200, 1)), None);
        assert_eq!(timebase.anchor(), Some(MediaTime::new(100, 1)));
    }

    #[test]
    fn sealed_timebase_never_anchors() {
        let mut timebase = TimeBase::new();
        timebase.seal();
        assert_eq!(timebase.observe(MediaTime::new(1, 1)), None);
        assert!(!timebase.is_anchored());
    }

    #[test]
    fn sealing_keeps_existing_anchor() {
        let mut timebase = TimeBase::new();
        timebase.observe(MediaTime::new(3, 1));
        timebase.seal();
        assert_eq!(timebase.anchor(), Some(MediaTime::new(3, 1)));
    }

    #[test]
    fn offsets_are_relative_to_anchor() {
        let mut timebase = TimeBase::new();
        assert!(timebase.offset_secs(MediaTime::new(1, 1)).is_none());
        timebase.observe(MediaTime::new(10, 1));
        assert_relative_eq!(timebase.offset_secs(MediaTime::new(25, 2)).unwrap(), 2.5);
        assert_relative_eq!(timebase.offset_secs(MediaTime::new(9, 1)).unwrap(), -1.0);
    }
}
