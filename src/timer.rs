use std::time::Instant;

/// Local playback clock used when no external player drives the karaoke.
///
/// Position is stored as an anchor plus the monotonic instant it was taken
/// at; while playing the current position is the anchor plus elapsed time.
#[derive(Debug, Default)]
pub struct PlaybackClock {
    /// Anchor position in seconds (finite, >= 0).
    anchor_position: f64,
    /// Set only while playing.
    anchor_instant: Option<Instant>,
}

impl PlaybackClock {
    pub fn new(position: f64) -> Self {
        Self {
            anchor_position: sanitize_position(position),
            anchor_instant: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.anchor_instant.is_some()
    }

    pub fn position(&self) -> f64 {
        let Some(inst) = self.anchor_instant else {
            return self.anchor_position;
        };
        let val = self.anchor_position + inst.elapsed().as_secs_f64();
        if val.is_finite() { val } else { self.anchor_position }
    }

    pub fn play(&mut self) {
        if self.anchor_instant.is_none() {
            self.anchor_instant = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        // Fold elapsed time into the anchor so a later resume continues from here.
        self.anchor_position = self.position();
        self.anchor_instant = None;
    }

    pub fn toggle(&mut self) -> bool {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
        self.is_playing()
    }

    /// Jump to `position`, keeping the play/pause state.
    pub fn seek(&mut self, position: f64) {
        self.anchor_position = sanitize_position(position);
        if self.anchor_instant.is_some() {
            self.anchor_instant = Some(Instant::now());
        }
    }
}

pub fn sanitize_position(p: f64) -> f64 {
    if !p.is_finite() || p < 0.0 { 0.0 } else { p }
}
