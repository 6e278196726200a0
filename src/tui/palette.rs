#![forbid(unsafe_code)]

use ratatui::style::{Color, Modifier, Style};

use crate::task::model::{Priority, Task};
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub accent_fg: Color,
    pub warning: Color,
    pub error: Color,
    pub success: Color,
}

impl Palette {
    #[must_use]
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                bg: Color::White,
                fg: Color::Black,
                muted: Color::DarkGray,
                accent: Color::Blue,
                accent_fg: Color::White,
                warning: Color::Rgb(180, 120, 0),
                error: Color::Red,
                success: Color::Green,
            },
            Theme::Dark => Self {
                bg: Color::Black,
                fg: Color::Gray,
                muted: Color::DarkGray,
                accent: Color::LightBlue,
                accent_fg: Color::Black,
                warning: Color::Yellow,
                error: Color::LightRed,
                success: Color::LightGreen,
            },
        }
    }

    #[must_use]
    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    #[must_use]
    pub fn dim(&self) -> Style {
        Style::default().fg(self.muted)
    }

    #[must_use]
    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.accent_fg)
            .bg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn priority(&self, priority: Priority) -> Style {
        match priority {
            Priority::Normal => Style::default().fg(self.muted),
            Priority::Pending => Style::default().fg(self.warning),
            Priority::Urgent => Style::default().fg(self.error).add_modifier(Modifier::BOLD),
        }
    }

    /// Completed rows fade out; active rows carry their priority colour.
    #[must_use]
    pub fn task_text(&self, task: &Task) -> Style {
        if task.completed {
            return Style::default()
                .fg(self.muted)
                .add_modifier(Modifier::CROSSED_OUT);
        }
        match task.priority {
            Priority::Normal => Style::default().fg(self.fg),
            Priority::Pending => Style::default().fg(self.warning),
            Priority::Urgent => Style::default().fg(self.error),
        }
    }
}
