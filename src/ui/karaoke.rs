//! Full-screen karaoke mode.
//!
//! The screen shows the whole text wrapped to the terminal width, styles
//! every word by its state, and redraws at word boundaries by estimating
//! the position between updates from the playback loop.

use crate::event::PlayerEvent;
use crate::karaoke::{Seeker, next_boundary, on_word_click};
use crate::state::Update;
use crate::ui::layout::{View, draw};
use crate::ui::styles::WordStyles;
use crossterm::{
    event::{Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::pin::Pin;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::Sleep;

type UiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub struct KaraokeUiState {
    pub last_update: Option<Update>,
    /// When `last_update` arrived; used to estimate the position.
    pub last_update_instant: Option<Instant>,
    /// Word picked with the arrow keys.
    pub selected: Option<usize>,
    pub highlight: bool,
    pub should_exit: bool,
}

/// What a key press asks the loop to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    None,
    Redraw,
    TogglePlay,
    SeekTo(f64),
}

impl KaraokeUiState {
    pub fn new(highlight: bool) -> Self {
        Self {
            last_update: None,
            last_update_instant: None,
            selected: None,
            highlight,
            should_exit: false,
        }
    }

    pub fn apply_update(&mut self, update: Update) {
        self.last_update = Some(update);
        self.last_update_instant = Some(Instant::now());
    }

    /// Position of the last update advanced by the time since it arrived.
    pub fn estimated_position(&self) -> f64 {
        let Some(upd) = &self.last_update else {
            return 0.0;
        };
        match self.last_update_instant {
            Some(since) if upd.playing => upd.position + since.elapsed().as_secs_f64(),
            _ => upd.position,
        }
    }

    fn word_count(&self) -> usize {
        self.last_update.as_ref().map_or(0, |u| u.timings.len())
    }

    fn move_selection(&mut self, forward: bool) {
        let count = self.word_count();
        if count == 0 {
            return;
        }
        let from = self.selected.or_else(|| {
            self.last_update
                .as_ref()
                .and_then(|u| crate::karaoke::active_word(&u.timings, self.estimated_position()))
        });
        self.selected = Some(match (from, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1).min(count - 1),
            (Some(i), false) => i.saturating_sub(1),
        });
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_exit = true;
                Action::None
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_exit = true;
                Action::None
            }
            KeyCode::Char(' ') => Action::TogglePlay,
            KeyCode::Char('k') => {
                self.highlight = !self.highlight;
                Action::Redraw
            }
            KeyCode::Left => {
                self.move_selection(false);
                Action::Redraw
            }
            KeyCode::Right => {
                self.move_selection(true);
                Action::Redraw
            }
            KeyCode::Enter => {
                let start = self.selected.and_then(|i| {
                    self.last_update
                        .as_ref()
                        .and_then(|u| u.timings.get(i))
                        .map(|w| w.start_time)
                });
                self.selected = None;
                start.map_or(Action::Redraw, Action::SeekTo)
            }
            _ => Action::None,
        }
    }
}

/// Run the karaoke screen until the user quits or the playback loop stops.
pub async fn display_karaoke(
    mut rx: mpsc::Receiver<Update>,
    player_tx: mpsc::Sender<PlayerEvent>,
    seeker: &dyn Seeker,
    highlight: bool,
) -> UiResult<()> {
    enable_raw_mode().map_err(to_boxed_err)?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(to_boxed_err)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(to_boxed_err)?;

    let result = run_loop(&mut terminal, &mut rx, &player_tx, seeker, highlight).await;

    disable_raw_mode().map_err(to_boxed_err)?;
    execute!(io::stdout(), LeaveAlternateScreen).map_err(to_boxed_err)?;
    let _ = player_tx.send(PlayerEvent::Shutdown).await;
    result
}

async fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    rx: &mut mpsc::Receiver<Update>,
    player_tx: &mpsc::Sender<PlayerEvent>,
    seeker: &dyn Seeker,
    highlight: bool,
) -> UiResult<()> {
    let styles = WordStyles::default();
    let mut state = KaraokeUiState::new(highlight);
    let mut next_word_sleep: Option<Pin<Box<Sleep>>> = None;

    // A plain OS thread polls crossterm so the blocking pool is left alone.
    let (key_tx, mut key_rx) = mpsc::channel(32);
    thread::spawn(move || {
        loop {
            match crossterm::event::poll(Duration::from_millis(100)) {
                Ok(true) => {
                    if let Ok(ev) = crossterm::event::read()
                        && key_tx.blocking_send(ev).is_err()
                    {
                        break;
                    }
                }
                Ok(false) => {
                    if key_tx.is_closed() {
                        break;
                    }
                }
                Err(_) => thread::sleep(Duration::from_millis(100)),
            }
        }
    });

    while !state.should_exit {
        tokio::select! {
            biased;

            update = rx.recv() => {
                let Some(update) = update else { break };
                state.apply_update(update);
                redraw_and_reschedule(terminal, &state, &styles, &mut next_word_sleep)?;
            }

            maybe_event = key_rx.recv() => {
                let Some(event) = maybe_event else { break };
                if let Event::Key(key) = event {
                    match state.handle_key(key) {
                        Action::None | Action::Redraw => {}
                        Action::TogglePlay => {
                            if player_tx.send(PlayerEvent::TogglePlay).await.is_err() {
                                break;
                            }
                        }
                        Action::SeekTo(start) => {
                            if let Err(e) = on_word_click(seeker, start).await {
                                tracing::warn!(error = %e, "Seek failed");
                            }
                        }
                    }
                }
                redraw_and_reschedule(terminal, &state, &styles, &mut next_word_sleep)?;
            }

            _ = async {
                if let Some(s) = &mut next_word_sleep {
                    s.as_mut().await;
                } else {
                    futures_util::future::pending::<()>().await;
                }
            } => {
                redraw_and_reschedule(terminal, &state, &styles, &mut next_word_sleep)?;
            }
        }
    }
    Ok(())
}

/// Draw with the estimated position and arm a timer for the next word boundary.
fn redraw_and_reschedule<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: &KaraokeUiState,
    styles: &WordStyles,
    next_word_sleep: &mut Option<Pin<Box<Sleep>>>,
) -> UiResult<()> {
    let Some(upd) = &state.last_update else {
        *next_word_sleep = None;
        return Ok(());
    };
    let position = state.estimated_position();
    let view = View {
        timings: &upd.timings,
        position,
        playing: upd.playing,
        selected: state.selected,
        highlight: state.highlight,
        err: upd.err.as_deref(),
    };
    draw(terminal, &view, styles)?;

    *next_word_sleep = if upd.playing {
        next_boundary(&upd.timings, position).map(|secs| {
            let when = tokio::time::Instant::now() + Duration::from_secs_f64(secs);
            Box::pin(tokio::time::sleep_until(when))
        })
    } else {
        None
    };
    Ok(())
}

fn to_boxed_err<E: std::error::Error + Send + Sync + 'static>(
    e: E,
) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::karaoke::WordTiming;
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state_with_words(position: f64, playing: bool) -> KaraokeUiState {
        let timings = Arc::new(vec![
            WordTiming { word: "hi".into(), start_time: 0.0, end_time: 0.3 },
            WordTiming { word: "there".into(), start_time: 0.35, end_time: 0.9 },
            WordTiming { word: "you".into(), start_time: 0.95, end_time: 1.3 },
        ]);
        let mut state = KaraokeUiState::new(true);
        state.apply_update(Update {
            timings,
            active: None,
            position,
            playing,
            err: None,
            version: 1,
        });
        state
    }

    #[test]
    fn arrows_select_and_enter_seeks() {
        let mut state = state_with_words(0.5, false);
        assert_eq!(state.handle_key(key(KeyCode::Right)), Action::Redraw);
        assert_eq!(state.selected, Some(2));
        state.handle_key(key(KeyCode::Right));
        assert_eq!(state.selected, Some(2));
        state.handle_key(key(KeyCode::Left));
        assert_eq!(state.selected, Some(1));
        assert_eq!(state.handle_key(key(KeyCode::Enter)), Action::SeekTo(0.35));
        assert_eq!(state.selected, None);
        assert_eq!(state.handle_key(key(KeyCode::Enter)), Action::Redraw);
    }

    #[test]
    fn selection_starts_at_first_word_in_a_gap() {
        let mut state = state_with_words(0.32, false);
        state.handle_key(key(KeyCode::Left));
        assert_eq!(state.selected, Some(0));
    }

    #[test]
    fn quit_and_toggle_keys() {
        let mut state = state_with_words(0.0, false);
        assert_eq!(state.handle_key(key(KeyCode::Char(' '))), Action::TogglePlay);
        state.handle_key(key(KeyCode::Char('k')));
        assert!(!state.highlight);
        assert!(!state.should_exit);
        state.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(state.should_exit);
    }

    #[test]
    fn paused_position_is_not_advanced() {
        let state = state_with_words(0.5, false);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(state.estimated_position(), 0.5);

        let playing = state_with_words(0.5, true);
        std::thread::sleep(Duration::from_millis(10));
        assert!(playing.estimated_position() > 0.5);
    }
}
