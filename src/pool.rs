// pool.rs: Playback loop driving karaoke updates

use crate::event::{PlayerEvent, send_update};
use crate::karaoke::{WordTiming, next_boundary};
use crate::mpris::MprisError;
use crate::mpris::playback::{get_playback_status, get_position, play_pause, seek_to};
use crate::state::{StateBundle, Update};
use crate::timer::PlaybackClock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Where the playback position comes from.
#[derive(Debug)]
pub enum PlaybackSource {
    /// Built-in clock, for reading along without a media player.
    Local(PlaybackClock),
    /// An MPRIS player identified by its D-Bus service name.
    Mpris(String),
}

impl PlaybackSource {
    async fn sample(&self) -> Result<(bool, f64), MprisError> {
        match self {
            PlaybackSource::Local(clock) => Ok((clock.is_playing(), clock.position())),
            PlaybackSource::Mpris(service) => {
                let playing = get_playback_status(service).await? == "Playing";
                let position = get_position(service).await?;
                Ok((playing, position))
            }
        }
    }

    async fn toggle(&mut self) -> Result<(), MprisError> {
        match self {
            PlaybackSource::Local(clock) => {
                clock.toggle();
                Ok(())
            }
            PlaybackSource::Mpris(service) => play_pause(service).await,
        }
    }

    async fn seek(&mut self, position: f64) -> Result<(), MprisError> {
        match self {
            PlaybackSource::Local(clock) => {
                clock.seek(position);
                Ok(())
            }
            PlaybackSource::Mpris(service) => seek_to(service, position).await,
        }
    }

    fn stop_at_end(&mut self) {
        if let PlaybackSource::Local(clock) = self {
            clock.pause();
        }
    }
}

/// How long to sleep before sampling again: the poll interval, or sooner if
/// a word boundary comes first.
fn next_wake(state: &StateBundle, poll_interval: Duration) -> Duration {
    if !state.player_state.playing {
        return poll_interval;
    }
    next_boundary(&state.timings, state.player_state.position)
        .map(|secs| Duration::from_secs_f64(secs).min(poll_interval))
        .unwrap_or(poll_interval)
}

async fn sample_and_send(
    source: &mut PlaybackSource,
    state: &mut StateBundle,
    update_tx: &mpsc::Sender<Update>,
) {
    match source.sample().await {
        Ok((playing, position)) => {
            state.set_error(None);
            state.update_playback(playing, position);
            state.update_active();
            if playing && state.finished() {
                source.stop_at_end();
                state.update_playback(false, position);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read playback position");
            state.set_error(Some(e.to_string()));
        }
    }
    send_update(state, update_tx, false).await;
}

async fn handle_event(
    event: PlayerEvent,
    source: &mut PlaybackSource,
    state: &mut StateBundle,
) -> Result<(), MprisError> {
    match event {
        PlayerEvent::TogglePlay => source.toggle().await,
        PlayerEvent::SeekTo(position) => source.seek(position).await,
        PlayerEvent::Shutdown => Ok(()),
    }
    .inspect_err(|e| {
        tracing::warn!(error = %e, ?event, "Player command failed");
        state.set_error(Some(e.to_string()));
    })
}

/// Samples the playback source and sends updates until shutdown.
pub async fn listen(
    timings: Arc<Vec<WordTiming>>,
    mut source: PlaybackSource,
    update_tx: mpsc::Sender<Update>,
    mut event_rx: mpsc::Receiver<PlayerEvent>,
    poll_interval: Duration,
) {
    let mut state = StateBundle::new(timings);
    sample_and_send(&mut source, &mut state, &update_tx).await;
    loop {
        let wake = next_wake(&state, poll_interval);
        tokio::select! {
            maybe_event = event_rx.recv() => {
                match maybe_event {
                    None | Some(PlayerEvent::Shutdown) => {
                        send_update(&mut state, &update_tx, true).await;
                        break;
                    }
                    Some(event) => {
                        let _ = handle_event(event, &mut source, &mut state).await;
                        sample_and_send(&mut source, &mut state, &update_tx).await;
                    }
                }
            }
            _ = tokio::time::sleep(wake) => {
                sample_and_send(&mut source, &mut state, &update_tx).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::karaoke::timing::generate_timing_data_with;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn timings() -> Arc<Vec<WordTiming>> {
        Arc::new(generate_timing_data_with(
            "read along with me",
            0.0,
            &mut StdRng::seed_from_u64(3),
        ))
    }

    #[tokio::test]
    async fn seek_and_play_are_reported() {
        let timings = timings();
        let (update_tx, mut update_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(8);
        let source = PlaybackSource::Local(PlaybackClock::new(0.0));
        let handle = tokio::spawn(listen(
            timings.clone(),
            source,
            update_tx,
            event_rx,
            Duration::from_millis(20),
        ));

        let first = update_rx.recv().await.unwrap();
        assert!(!first.playing);
        assert_eq!(first.active, Some(0));

        let target = timings[2].start_time;
        event_tx.send(PlayerEvent::SeekTo(target)).await.unwrap();
        let seeked = loop {
            let u = update_rx.recv().await.unwrap();
            if u.active == Some(2) {
                break u;
            }
        };
        assert_eq!(seeked.position, target);

        event_tx.send(PlayerEvent::TogglePlay).await.unwrap();
        loop {
            if update_rx.recv().await.unwrap().playing {
                break;
            }
        }

        event_tx.send(PlayerEvent::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn local_clock_stops_after_last_word() {
        let timings = timings();
        let end = timings.last().unwrap().end_time;
        let (update_tx, mut update_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(8);
        let mut clock = PlaybackClock::new(end - 0.01);
        clock.play();
        tokio::spawn(listen(
            timings,
            PlaybackSource::Local(clock),
            update_tx,
            event_rx,
            Duration::from_millis(10),
        ));

        let stopped = loop {
            let u = update_rx.recv().await.unwrap();
            if !u.playing && u.position >= end {
                break u;
            }
        };
        assert_eq!(stopped.active, None);
        drop(event_tx);
    }

    #[test]
    fn wake_is_bounded_by_poll_interval() {
        let mut state = StateBundle::new(timings());
        let poll = Duration::from_millis(500);
        assert_eq!(next_wake(&state, poll), poll);
        state.update_playback(true, 0.0);
        assert!(next_wake(&state, poll) <= poll);
        state.update_playback(true, 1000.0);
        assert_eq!(next_wake(&state, poll), poll);
    }
}
