use crate::karaoke::{WordState, WordTiming, active_word, progress, word_states};
use crate::text_utils::{wrap_text, wrap_words};
use crate::ui::styles::WordStyles;
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use std::error::Error;
use std::ops::Range;

/// What the karaoke screen shows at a given instant.
pub struct View<'a> {
    pub timings: &'a [WordTiming],
    pub position: f64,
    pub playing: bool,
    pub selected: Option<usize>,
    pub highlight: bool,
    pub err: Option<&'a str>,
}

/// Style the words of each wrapped line according to their state.
///
/// Returns the styled lines and the index of the line holding the word to
/// keep on screen (the selected word, else the current one, else the last
/// word already read).
pub fn styled_lines<'a>(
    view: &View<'a>,
    width: usize,
    styles: &WordStyles,
) -> (Vec<Line<'a>>, usize) {
    let words: Vec<&str> = view.timings.iter().map(|w| w.word.as_str()).collect();
    let ranges = wrap_words(&words, width);
    let states = word_states(view.timings, view.position);
    let focus_word = view
        .selected
        .or_else(|| active_word(view.timings, view.position))
        .or_else(|| states.iter().rposition(|s| *s == WordState::Past));

    let mut focus_line = 0;
    let lines = ranges
        .iter()
        .enumerate()
        .map(|(line_idx, range)| {
            if focus_word.is_some_and(|f| range.contains(&f)) {
                focus_line = line_idx;
            }
            let mut spans = Vec::with_capacity(range.len() * 2);
            for i in range.clone() {
                let w = &view.timings[i];
                let mut style = if view.highlight {
                    styles.for_state(states[i])
                } else {
                    styles.plain
                };
                if view.selected == Some(i) {
                    style = style.patch(styles.selected);
                }
                if i > range.start {
                    spans.push(Span::raw(" "));
                }
                spans.push(Span::styled(w.word.as_str(), style));
            }
            Line::from(spans)
        })
        .collect();
    (lines, focus_line)
}

/// Rows of `total` to show in `height` rows, keeping `focus` centred where possible.
pub fn visible_window(total: usize, focus: usize, height: usize) -> Range<usize> {
    if total <= height {
        return 0..total;
    }
    let start = focus
        .saturating_sub(height / 2)
        .min(total.saturating_sub(height));
    start..start + height
}

fn status_line(view: &View<'_>) -> String {
    let state = if view.playing { "playing" } else { "paused" };
    format!(
        "{:>6.1}s {:>3.0}%  {}  [space] play/pause  [←/→] select  [enter] seek  [k] highlight  [q] quit",
        view.position,
        progress(view.timings, view.position) * 100.0,
        state
    )
}

/// Draw the karaoke screen: wrapped words centred vertically plus a status row.
pub fn draw<B: Backend>(
    terminal: &mut Terminal<B>,
    view: &View<'_>,
    styles: &WordStyles,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    terminal
        .draw(|f| {
            let size = f.area();
            let w = size.width as usize;
            let text_height = size.height.saturating_sub(1) as usize;

            let lines: Vec<Line> = if let Some(err) = view.err {
                wrap_text(err, w)
                    .into_iter()
                    .map(|l| Line::from(Span::styled(l, styles.current)))
                    .collect()
            } else {
                let (all, focus) = styled_lines(view, w, styles);
                let window = visible_window(all.len(), focus, text_height);
                all.into_iter()
                    .skip(window.start)
                    .take(window.len())
                    .collect()
            };

            let top_padding = text_height.saturating_sub(lines.len()) / 2;
            let text_area = Rect {
                x: size.x,
                y: size.y + top_padding as u16,
                width: size.width,
                height: (lines.len() as u16).min(text_height as u16),
            };
            f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), text_area);

            if size.height > 0 {
                let status_area = Rect {
                    x: size.x,
                    y: size.y + size.height - 1,
                    width: size.width,
                    height: 1,
                };
                f.render_widget(
                    Paragraph::new(Line::from(Span::styled(status_line(view), styles.past))),
                    status_area,
                );
            }
        })
        .map_err(|e| Box::new(e) as Box<dyn Error + Send + Sync>)?;
    Ok(())
}
