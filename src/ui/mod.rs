pub mod karaoke;
pub mod layout;
pub mod pipe;
pub mod styles;

pub use karaoke::display_karaoke;
pub use pipe::display_words_pipe;
