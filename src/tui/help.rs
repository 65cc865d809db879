use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::theme::Palette;

fn keybind<'a>(key: &'a str, pad: usize, what: &'a str, p: &Palette) -> Line<'a> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, p.key()),
        Span::raw(" ".repeat(pad.saturating_sub(key.chars().count()))),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, p: &Palette) {
    let lines = vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", p.key()),
            Span::raw(" / "),
            Span::styled("Ctrl-C", p.key()),
            Span::raw("  Quit"),
        ]),
        keybind("r / Enter", 14, "Run analysis (ignored while a run is in flight)", p),
        keybind("t", 14, "Toggle dark/light theme (remembered)", p),
        keybind("s", 14, "Save current result as JSON", p),
        keybind("tab", 14, "Next tab", p),
        keybind("shift-tab", 14, "Previous tab", p),
        keybind("1-5", 14, "Jump to tab", p),
        keybind("?", 14, "Show this help", p),
        Line::from(""),
        Line::from("Status badge:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("●", p.health(crate::model::HealthStatus::Connecting)),
            Span::raw(" waiting for the first health probe"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("●", p.health(crate::model::HealthStatus::Connected)),
            Span::raw(" backend up with the analysis library installed"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("●", p.health(crate::model::HealthStatus::Disconnected)),
            Span::raw(" unreachable, erroring, or library missing"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Logs: set WIND_AEP_LOG or RUST_LOG; the TUI writes them to the user cache dir.",
            p.muted(),
        )),
    ];
    let para = Paragraph::new(lines)
        .style(p.base())
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(para, area);
}
