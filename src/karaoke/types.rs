use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One word of a read-along text with its highlight interval in seconds.
///
/// The interval is half-open: the word is current from `start_time` up to,
/// but not including, `end_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTiming {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// Highlight state of a word relative to the playback position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordState {
    Past,
    Current,
    Future,
}

#[derive(Error, Debug)]
pub enum KaraokeError {
    #[error("No words to read in the given text")]
    EmptyText,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Seek failed: {0}")]
    Seek(String),
}
