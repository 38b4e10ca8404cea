//! MPRIS module: following and seeking an external media player over D-Bus.

pub mod connection;
pub mod playback;

pub use connection::{MprisError, find_player};
pub use playback::MprisSeeker;
