//! Synthetic per-word timing for read-along text.
//!
//! Texts arrive without any alignment data, so every word gets a duration
//! derived from its length plus a little random jitter. Words are laid out
//! back to back with a fixed gap:
//!
//! ```text
//! start[0]   = offset
//! end[i]     = start[i] + max(MIN_WORD_SECS, SECS_PER_GRAPHEME * len + jitter)
//! start[i+1] = end[i] + WORD_GAP_SECS
//! ```
//!
//! `len` is the number of extended grapheme clusters, not bytes or UTF-16
//! code units, so accented and emoji words are not stretched by their
//! encoding. Texts in plain ASCII time out the same either way.
//!
//! Generation is not stable across calls. Use [`generate_timing_data_with`]
//! and a seeded rng, or a [`TimingCache`], when the table must stay the same
//! between renders.

use crate::karaoke::types::WordTiming;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

pub const MIN_WORD_SECS: f64 = 0.3;
pub const SECS_PER_GRAPHEME: f64 = 0.08;
pub const MAX_JITTER_SECS: f64 = 0.2;
pub const WORD_GAP_SECS: f64 = 0.05;

/// Generate a timing table for `text` using the thread-local rng.
pub fn generate_timing_data(text: &str, start_offset: f64) -> Vec<WordTiming> {
    generate_timing_data_with(text, start_offset, &mut rand::thread_rng())
}

/// Generate a timing table drawing jitter from `rng`.
pub fn generate_timing_data_with<R: Rng>(
    text: &str,
    start_offset: f64,
    rng: &mut R,
) -> Vec<WordTiming> {
    let mut timings = Vec::new();
    let mut cursor = start_offset;
    for word in text.split_whitespace() {
        let duration = word_duration(word, rng.gen_range(0.0..MAX_JITTER_SECS));
        let start_time = cursor;
        let end_time = start_time + duration;
        timings.push(WordTiming {
            word: word.to_string(),
            start_time,
            end_time,
        });
        cursor = end_time + WORD_GAP_SECS;
    }
    timings
}

fn word_duration(word: &str, jitter: f64) -> f64 {
    let len = word.graphemes(true).count() as f64;
    (SECS_PER_GRAPHEME * len + jitter).max(MIN_WORD_SECS)
}

/// Memoizes timing tables per `(text, offset)` so repeated renders of the
/// same text keep their highlight schedule.
#[derive(Debug, Default)]
pub struct TimingCache {
    entries: HashMap<(String, u64), Arc<Vec<WordTiming>>>,
    seed: Option<u64>,
}

impl TimingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose freshly generated tables come from a seeded rng, so even
    /// a cleared cache regenerates identical timings.
    pub fn seeded(seed: u64) -> Self {
        Self {
            entries: HashMap::new(),
            seed: Some(seed),
        }
    }

    pub fn get_or_generate(&mut self, text: &str, start_offset: f64) -> Arc<Vec<WordTiming>> {
        let key = (text.to_string(), start_offset.to_bits());
        let seed = self.seed;
        self.entries
            .entry(key)
            .or_insert_with(|| {
                let timings = match seed {
                    Some(s) => {
                        use rand::SeedableRng;
                        let mut rng = rand::rngs::StdRng::seed_from_u64(s);
                        generate_timing_data_with(text, start_offset, &mut rng)
                    }
                    None => generate_timing_data(text, start_offset),
                };
                Arc::new(timings)
            })
            .clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn two_words_start_at_offset_and_gap() {
        let t = generate_timing_data("hi there", 0.0);
        assert_eq!(t.len(), 2);
        assert_eq!(t[0].word, "hi");
        assert_eq!(t[0].start_time, 0.0);
        assert_eq!(t[1].word, "there");
        assert_eq!(t[1].start_time, t[0].end_time + WORD_GAP_SECS);
    }

    #[test]
    fn adjacent_intervals_are_separated_by_fixed_gap() {
        let text = "the quick brown fox jumps over the extraordinarily lazy dog";
        let t = generate_timing_data(text, 2.5);
        assert_eq!(t.len(), 10);
        assert_eq!(t[0].start_time, 2.5);
        for pair in t.windows(2) {
            assert!(pair[0].start_time < pair[0].end_time);
            assert_eq!(pair[0].end_time + WORD_GAP_SECS, pair[1].start_time);
        }
    }

    #[test]
    fn whitespace_runs_produce_no_empty_words() {
        let t = generate_timing_data("  one \t\n two   three  ", 0.0);
        let words: Vec<_> = t.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["one", "two", "three"]);
        assert!(generate_timing_data(" \n\t ", 0.0).is_empty());
    }

    #[test]
    fn durations_respect_floor_and_length_bounds() {
        let t = generate_timing_data("a extraordinarily", 0.0);
        let short = t[0].end_time - t[0].start_time;
        assert!((MIN_WORD_SECS..MIN_WORD_SECS + 1e-9).contains(&short));

        let long = t[1].end_time - t[1].start_time;
        let base = SECS_PER_GRAPHEME * 15.0;
        assert!(long >= base - 1e-9 && long < base + MAX_JITTER_SECS);
    }

    #[test]
    fn graphemes_count_as_single_characters() {
        // "e" + combining acute accent is one grapheme, so both words have four
        let accented = generate_timing_data_with("cafe\u{301}", 0.0, &mut StdRng::seed_from_u64(1));
        let plain = generate_timing_data_with("cafe", 0.0, &mut StdRng::seed_from_u64(1));
        assert_eq!(accented[0].end_time, plain[0].end_time);
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = generate_timing_data_with("sing along with me", 0.0, &mut StdRng::seed_from_u64(7));
        let b = generate_timing_data_with("sing along with me", 0.0, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn cache_returns_same_table_for_same_text() {
        let mut cache = TimingCache::new();
        let a = cache.get_or_generate("hello world", 0.0);
        let b = cache.get_or_generate("hello world", 0.0);
        assert!(Arc::ptr_eq(&a, &b));
        let _ = cache.get_or_generate("hello world", 1.0);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn seeded_cache_survives_clear() {
        let mut cache = TimingCache::seeded(42);
        let a = cache.get_or_generate("stable words here", 0.0);
        cache.clear();
        assert!(cache.is_empty());
        let b = cache.get_or_generate("stable words here", 0.0);
        assert_eq!(*a, *b);
    }
}
