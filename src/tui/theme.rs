use crate::model::{HealthStatus, Theme};
use ratatui::style::{Color, Modifier, Style};

/// Colors for one theme. Every widget pulls its styling from here.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub key: Color,
    pub ok: Color,
    pub warn: Color,
    pub err: Color,
    pub actual: Color,
    pub ideal: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                bg: Color::Reset,
                fg: Color::White,
                muted: Color::Gray,
                accent: Color::Cyan,
                key: Color::Magenta,
                ok: Color::Green,
                warn: Color::Yellow,
                err: Color::LightRed,
                actual: Color::LightYellow,
                ideal: Color::Cyan,
            },
            Theme::Light => Self {
                bg: Color::White,
                fg: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Blue,
                key: Color::Magenta,
                ok: Color::Green,
                warn: Color::Rgb(180, 120, 0),
                err: Color::Red,
                actual: Color::Rgb(234, 88, 12),
                ideal: Color::Blue,
            },
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn key(&self) -> Style {
        Style::default().fg(self.key)
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.fg).add_modifier(Modifier::BOLD)
    }

    pub fn health(&self, status: HealthStatus) -> Style {
        let color = match status {
            HealthStatus::Connecting => self.warn,
            HealthStatus::Connected => self.ok,
            HealthStatus::Disconnected => self.err,
        };
        Style::default().fg(color)
    }
}
