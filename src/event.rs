use crate::karaoke::{KaraokeError, Seeker};
use crate::state::{StateBundle, Update};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Commands the UI sends to the playback loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    TogglePlay,
    SeekTo(f64),
    Shutdown,
}

/// [`Seeker`] that forwards seeks to the playback loop.
#[derive(Debug, Clone)]
pub struct ChannelSeeker {
    tx: mpsc::Sender<PlayerEvent>,
}

impl ChannelSeeker {
    pub fn new(tx: mpsc::Sender<PlayerEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Seeker for ChannelSeeker {
    async fn seek_to(&self, position: f64) -> Result<(), KaraokeError> {
        self.tx
            .send(PlayerEvent::SeekTo(position))
            .await
            .map_err(|_| KaraokeError::Seek("playback loop has stopped".to_string()))
    }
}

/// Send the current state to the UI unless an identical one was already sent.
pub async fn send_update(state: &mut StateBundle, update_tx: &mpsc::Sender<Update>, force: bool) {
    let playing_bit: u64 = if state.player_state.playing { 1 } else { 0 };
    let key = (state.version << 1) | playing_bit;

    if !force && state.last_sent == Some(key) {
        return;
    }

    if update_tx.send(state.to_update()).await.is_ok() {
        state.last_sent = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::karaoke::on_word_click;
    use std::sync::Arc;

    #[tokio::test]
    async fn identical_state_is_sent_once() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut state = StateBundle::new(Arc::new(Vec::new()));
        send_update(&mut state, &tx, false).await;
        send_update(&mut state, &tx, false).await;
        state.update_playback(true, 0.5);
        send_update(&mut state, &tx, false).await;
        send_update(&mut state, &tx, true).await;
        drop(tx);

        let mut versions = Vec::new();
        while let Some(u) = rx.recv().await {
            versions.push(u.version);
        }
        assert_eq!(versions, vec![0, 1, 1]);
    }

    #[tokio::test]
    async fn channel_seeker_forwards_click() {
        let (tx, mut rx) = mpsc::channel(1);
        let seeker = ChannelSeeker::new(tx);
        on_word_click(&seeker, 2.0).await.unwrap();
        assert_eq!(rx.recv().await, Some(PlayerEvent::SeekTo(2.0)));

        drop(rx);
        assert!(on_word_click(&seeker, 1.0).await.is_err());
    }
}
