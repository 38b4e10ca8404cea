// state.rs: State data structures for karaoke playback

use crate::karaoke::{WordTiming, active_word};
use std::sync::Arc;

/// Snapshot sent from the playback loop to the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub timings: Arc<Vec<WordTiming>>,
    /// Index of the word current at `position`, if any.
    pub active: Option<usize>,
    pub position: f64,
    pub playing: bool,
    pub err: Option<String>,
    pub version: u64, // Incremented on any state change
}

/// Holds the current state of the player (playback, errors).
#[derive(Debug, Default, PartialEq)]
pub struct PlayerState {
    pub playing: bool,
    pub position: f64,
    pub err: Option<String>,
}

/// Bundles timings, player state and versioning for the playback loop.
#[derive(Debug, Default)]
pub struct StateBundle {
    pub timings: Arc<Vec<WordTiming>>,
    pub active: Option<usize>,
    pub player_state: PlayerState,
    pub version: u64,
    /// Version + playing bit of the last update sent to the UI.
    pub last_sent: Option<u64>,
}

impl StateBundle {
    pub fn new(timings: Arc<Vec<WordTiming>>) -> Self {
        Self {
            timings,
            ..Self::default()
        }
    }

    pub fn update_playback(&mut self, playing: bool, position: f64) {
        if self.player_state.playing != playing
            || (self.player_state.position - position).abs() > f64::EPSILON
        {
            self.version += 1;
        }
        self.player_state.playing = playing;
        self.player_state.position = position;
    }

    /// Recompute the active word; returns true when it changed.
    pub fn update_active(&mut self) -> bool {
        let active = active_word(&self.timings, self.player_state.position);
        if active == self.active {
            return false;
        }
        self.active = active;
        self.version += 1;
        true
    }

    pub fn set_error(&mut self, err: Option<String>) {
        if self.player_state.err != err {
            self.player_state.err = err;
            self.version += 1;
        }
    }

    /// Playback has moved past the last word.
    pub fn finished(&self) -> bool {
        self.timings
            .last()
            .is_some_and(|w| self.player_state.position >= w.end_time)
    }

    pub fn to_update(&self) -> Update {
        Update {
            timings: Arc::clone(&self.timings),
            active: self.active,
            position: self.player_state.position,
            playing: self.player_state.playing,
            err: self.player_state.err.clone(),
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> StateBundle {
        StateBundle::new(Arc::new(vec![
            WordTiming { word: "one".into(), start_time: 0.0, end_time: 0.5 },
            WordTiming { word: "two".into(), start_time: 0.55, end_time: 1.0 },
        ]))
    }

    #[test]
    fn version_moves_only_on_change() {
        let mut b = bundle();
        b.update_playback(false, 0.0);
        assert_eq!(b.version, 0);
        b.update_playback(true, 0.0);
        assert_eq!(b.version, 1);
        b.set_error(None);
        assert_eq!(b.version, 1);
        b.set_error(Some("lost player".into()));
        assert_eq!(b.version, 2);
    }

    #[test]
    fn active_word_tracks_position() {
        let mut b = bundle();
        b.update_playback(true, 0.1);
        assert!(b.update_active());
        assert_eq!(b.active, Some(0));
        assert!(!b.update_active());

        b.update_playback(true, 0.52);
        assert!(b.update_active());
        assert_eq!(b.active, None);

        b.update_playback(true, 1.0);
        assert!(b.finished());
        let upd = b.to_update();
        assert_eq!(upd.position, 1.0);
        assert!(upd.playing);
    }
}
