use ratatui::style::{Color, Modifier, Style};

use crate::status::StatusKind;

/// Colors used across the document list, editor and overlays
#[derive(Clone, Debug)]
pub struct Theme {
    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the active document title in the status bar
    pub title_color: Color,

    /// Color for success notifications
    pub success_color: Color,

    /// Color for error notifications
    pub error_color: Color,

    /// Foreground color for active selection
    pub selection_fg: Color,

    /// Background color for active selection
    pub selection_bg: Color,

    /// Color for links
    pub link_color: Color,

    /// Color for the list section headings
    pub list_heading_color: Color,

    /// Foreground color for the active document in the list
    pub list_active_fg: Color,

    /// Color for placeholder rows such as "Loading…"
    pub list_placeholder_fg: Color,

    /// Border color of the focused pane
    pub focused_border: Color,

    /// Border color of unfocused panes
    pub unfocused_border: Color,

    /// Foreground color for command bar buttons
    pub bar_fg: Color,

    /// Background color for the command bar
    pub bar_bg: Color,

    /// Foreground color for pressed buttons
    pub bar_pressed_fg: Color,

    /// Background color for pressed buttons
    pub bar_pressed_bg: Color,

    /// Background color for the keyboard-highlighted button
    pub bar_highlight_bg: Color,

    /// Foreground color for dialogs
    pub dialog_fg: Color,

    /// Background color for dialogs
    pub dialog_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            title_color: Color::LightYellow,
            success_color: Color::LightGreen,
            error_color: Color::LightRed,
            selection_fg: Color::White,
            selection_bg: Color::LightBlue,
            link_color: Color::Blue,
            list_heading_color: Color::Gray,
            list_active_fg: Color::LightYellow,
            list_placeholder_fg: Color::DarkGray,
            focused_border: Color::LightBlue,
            unfocused_border: Color::DarkGray,
            bar_fg: Color::White,
            bar_bg: Color::Black,
            bar_pressed_fg: Color::Black,
            bar_pressed_bg: Color::LightYellow,
            bar_highlight_bg: Color::LightBlue,
            dialog_fg: Color::White,
            dialog_bg: Color::Black,
        }
    }
}

impl Theme {
    /// Create a new theme with default colors
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.title_color)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for a notification of the given kind, drawn on the status bar
    pub fn status_message_style(&self, kind: StatusKind) -> Style {
        let fg = match kind {
            StatusKind::Success => self.success_color,
            StatusKind::Error => self.error_color,
        };
        self.status_bar_style().fg(fg)
    }

    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    pub fn link_style(&self) -> Style {
        Style::default()
            .fg(self.link_color)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn list_heading_style(&self) -> Style {
        Style::default()
            .fg(self.list_heading_color)
            .add_modifier(Modifier::BOLD)
    }

    pub fn list_active_style(&self) -> Style {
        Style::default()
            .fg(self.list_active_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn list_placeholder_style(&self) -> Style {
        Style::default()
            .fg(self.list_placeholder_fg)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.focused_border
        } else {
            self.unfocused_border
        })
    }

    /// Style for a command bar button in the given state
    pub fn bar_button_style(&self, pressed: bool, highlighted: bool) -> Style {
        let mut style = if pressed {
            Style::default()
                .fg(self.bar_pressed_fg)
                .bg(self.bar_pressed_bg)
        } else {
            Style::default().fg(self.bar_fg).bg(self.bar_bg)
        };
        if highlighted {
            style = style.bg(self.bar_highlight_bg).add_modifier(Modifier::BOLD);
        }
        style
    }

    pub fn bar_style(&self) -> Style {
        Style::default().fg(self.bar_fg).bg(self.bar_bg)
    }

    pub fn dialog_style(&self) -> Style {
        Style::default().fg(self.dialog_fg).bg(self.dialog_bg)
    }
}
