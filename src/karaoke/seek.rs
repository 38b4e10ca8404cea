//! Seeking an external player when a word is clicked.

use crate::karaoke::types::KaraokeError;
use async_trait::async_trait;

/// Something that can move playback to an absolute position in seconds.
///
/// # Implementations
///
/// - `event::ChannelSeeker` - forwards to the local playback loop
/// - `mpris::MprisSeeker` - seeks an MPRIS player over D-Bus
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Seeker: Send + Sync {
    async fn seek_to(&self, position: f64) -> Result<(), KaraokeError>;
}

/// Seek to the start of a clicked word.
pub async fn on_word_click(seeker: &dyn Seeker, start_time: f64) -> Result<(), KaraokeError> {
    let target = crate::timer::sanitize_position(start_time);
    tracing::debug!(target_secs = target, "Seeking to clicked word");
    seeker.seek_to(target).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn click_seeks_to_word_start() {
        let mut seeker = MockSeeker::new();
        seeker.expect_seek_to().with(eq(1.25)).times(1).returning(|_| Ok(()));
        on_word_click(&seeker, 1.25).await.unwrap();
    }

    #[tokio::test]
    async fn click_before_zero_is_clamped() {
        let mut seeker = MockSeeker::new();
        seeker.expect_seek_to().with(eq(0.0)).times(1).returning(|_| Ok(()));
        on_word_click(&seeker, -3.0).await.unwrap();
    }

    #[tokio::test]
    async fn seek_errors_are_returned() {
        let mut seeker = MockSeeker::new();
        seeker
            .expect_seek_to()
            .returning(|_| Err(KaraokeError::Seek("player gone".into())));
        let err = on_word_click(&seeker, 2.0).await.unwrap_err();
        assert!(err.to_string().contains("player gone"));
    }
}
