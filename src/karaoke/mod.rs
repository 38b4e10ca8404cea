// karaoke/mod.rs - word timing generation, highlight state and seeking
pub mod highlight;
pub mod seek;
pub mod timing;
pub mod types;

pub use highlight::{active_word, next_boundary, progress, word_states};
pub use seek::{Seeker, on_word_click};
pub use timing::TimingCache;
pub use types::{KaraokeError, WordState, WordTiming};
