//! Word highlight state for a playback position.
//!
//! Everything here is a pure function of the timing table and the position
//! the caller supplies; no playback state is kept between evaluations.

use crate::karaoke::types::{WordState, WordTiming};

/// Classify `timing` against `current_time`.
pub fn get_word_state(timing: &WordTiming, current_time: f64) -> WordState {
    if current_time >= timing.end_time {
        WordState::Past
    } else if current_time >= timing.start_time {
        WordState::Current
    } else {
        WordState::Future
    }
}

/// Index of the word that is current at `position`, if any.
///
/// Positions inside an inter-word gap, before the first word or after the
/// last word have no current word.
pub fn active_word(timings: &[WordTiming], position: f64) -> Option<usize> {
    if timings.is_empty() || position.is_nan() {
        return None;
    }
    // Words are sorted and non-overlapping: find the last word that has
    // started, then check it has not ended yet.
    let started = timings.partition_point(|w| w.start_time <= position);
    let idx = started.checked_sub(1)?;
    (position < timings[idx].end_time).then_some(idx)
}

/// Seconds from `position` to the next word start or end, if one is ahead.
pub fn next_boundary(timings: &[WordTiming], position: f64) -> Option<f64> {
    if position.is_nan() {
        return None;
    }
    let first_open = timings.partition_point(|w| w.end_time <= position);
    let w = timings.get(first_open)?;
    let at = if w.start_time > position { w.start_time } else { w.end_time };
    Some((at - position).max(0.0))
}

/// Fraction of the table already read at `position`, in `[0, 1]`.
pub fn progress(timings: &[WordTiming], position: f64) -> f64 {
    let (Some(first), Some(last)) = (timings.first(), timings.last()) else {
        return 0.0;
    };
    let span = (last.end_time - first.start_time).max(f64::EPSILON);
    ((position - first.start_time) / span).clamp(0.0, 1.0)
}

/// States for every word at once, convenient for renderers.
pub fn word_states(timings: &[WordTiming], position: f64) -> Vec<WordState> {
    timings.iter().map(|w| get_word_state(w, position)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(word: &str, start: f64, end: f64) -> WordTiming {
        WordTiming {
            word: word.to_string(),
            start_time: start,
            end_time: end,
        }
    }

    fn table() -> Vec<WordTiming> {
        vec![
            timing("hi", 0.0, 0.3),
            timing("there", 0.35, 0.9),
            timing("friend", 0.95, 1.5),
        ]
    }

    #[test]
    fn states_follow_half_open_interval() {
        let w = timing("word", 1.0, 2.0);
        assert_eq!(get_word_state(&w, 0.0), WordState::Future);
        assert_eq!(get_word_state(&w, 0.999), WordState::Future);
        assert_eq!(get_word_state(&w, 1.0), WordState::Current);
        assert_eq!(get_word_state(&w, 1.5), WordState::Current);
        assert_eq!(get_word_state(&w, 2.0), WordState::Past);
        assert_eq!(get_word_state(&w, 100.0), WordState::Past);
    }

    #[test]
    fn states_only_move_forward_with_time() {
        let w = timing("word", 1.0, 2.0);
        let rank = |s: WordState| match s {
            WordState::Future => 0,
            WordState::Current => 1,
            WordState::Past => 2,
        };
        let mut last = 0;
        for step in 0..300 {
            let r = rank(get_word_state(&w, step as f64 * 0.01));
            assert!(r >= last);
            last = r;
        }
        assert_eq!(last, 2);
    }

    #[test]
    fn active_word_is_none_in_gaps() {
        let t = table();
        assert_eq!(active_word(&t, -1.0), None);
        assert_eq!(active_word(&t, 0.0), Some(0));
        assert_eq!(active_word(&t, 0.32), None);
        assert_eq!(active_word(&t, 0.35), Some(1));
        assert_eq!(active_word(&t, 1.2), Some(2));
        assert_eq!(active_word(&t, 1.5), None);
        assert_eq!(active_word(&[], 0.0), None);
        assert_eq!(active_word(&t, f64::NAN), None);
    }

    #[test]
    fn active_word_matches_current_state() {
        let t = table();
        for step in 0..160 {
            let pos = step as f64 * 0.01;
            let current: Vec<usize> = word_states(&t, pos)
                .iter()
                .enumerate()
                .filter(|(_, s)| **s == WordState::Current)
                .map(|(i, _)| i)
                .collect();
            assert!(current.len() <= 1);
            assert_eq!(active_word(&t, pos), current.first().copied());
        }
    }

    #[test]
    fn next_boundary_finds_start_or_end() {
        let t = table();
        assert!((next_boundary(&t, -0.5).unwrap() - 0.5).abs() < 1e-9);
        assert!((next_boundary(&t, 0.1).unwrap() - 0.2).abs() < 1e-9);
        assert!((next_boundary(&t, 0.32).unwrap() - 0.03).abs() < 1e-9);
        assert_eq!(next_boundary(&t, 1.5), None);
    }

    #[test]
    fn progress_is_clamped() {
        let t = table();
        assert_eq!(progress(&t, -1.0), 0.0);
        assert_eq!(progress(&t, 10.0), 1.0);
        assert!((progress(&t, 0.75) - 0.5).abs() < 1e-9);
        assert_eq!(progress(&[], 1.0), 0.0);
    }
}
