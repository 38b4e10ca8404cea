// src/text_utils.rs
// Utility functions for laying out words on screen

use unicode_segmentation::UnicodeSegmentation;

/// Display width of a word, counted in grapheme clusters.
pub fn display_len(word: &str) -> usize {
    word.graphemes(true).count()
}

/// Group words into lines no wider than `width`, breaking only between words.
///
/// Returns index ranges into `words`. A word longer than the width gets a
/// line of its own. A zero width puts everything on one line.
pub fn wrap_words<S: AsRef<str>>(words: &[S], width: usize) -> Vec<std::ops::Range<usize>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut current_len = 0;

    for (i, w) in words.iter().enumerate() {
        let wlen = display_len(w.as_ref());
        if i > start && width > 0 && current_len + 1 + wlen > width {
            lines.push(start..i);
            start = i;
            current_len = wlen;
        } else if i == start {
            current_len = wlen;
        } else {
            current_len += 1 + wlen;
        }
    }
    if start < words.len() {
        lines.push(start..words.len());
    }
    lines
}

/// Wrap free text to a given width, breaking at word boundaries
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    wrap_words(&words, width)
        .into_iter()
        .map(|r| words[r].join(" "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_between_words() {
        let words = ["the", "quick", "brown", "fox"];
        assert_eq!(wrap_words(&words, 10), vec![0..2, 2..4]);
        assert_eq!(wrap_words(&words, 100), vec![0..4]);
        assert_eq!(wrap_words(&words, 0), vec![0..4]);
    }

    #[test]
    fn long_word_gets_own_line() {
        let words = ["a", "extraordinarily", "b"];
        assert_eq!(wrap_words(&words, 5), vec![0..1, 1..2, 2..3]);
        assert!(wrap_words::<&str>(&[], 5).is_empty());
    }

    #[test]
    fn width_counts_graphemes() {
        assert_eq!(display_len("cafe\u{301}"), 4);
        assert_eq!(wrap_text("cafe\u{301} cafe\u{301}", 9).len(), 1);
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
    }
}
