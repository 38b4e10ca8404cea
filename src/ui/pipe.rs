use crate::state::Update;
use std::io::Write;
use tokio::sync::mpsc;

/// Print each word as it becomes current (stdout only, for scripting).
///
/// Returns once the playback loop stops sending updates.
pub async fn display_words_pipe<W: Write>(
    mut rx: mpsc::Receiver<Update>,
    out: &mut W,
) -> std::io::Result<()> {
    let mut last_word: Option<usize> = None;

    while let Some(upd) = rx.recv().await {
        if let Some(err) = &upd.err {
            tracing::debug!(error = %err, "Skipping update with player error");
            continue;
        }
        if upd.active != last_word {
            if let Some(idx) = upd.active
                && let Some(w) = upd.timings.get(idx)
            {
                writeln!(out, "{}", w.word)?;
                out.flush()?;
            }
            last_word = upd.active;
        }
        if !upd.playing && upd.timings.last().is_some_and(|w| upd.position >= w.end_time) {
            break;
        }
    }
    Ok(())
}
