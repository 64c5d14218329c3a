//! Input modals for the API key and the shift settings.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use vocalize_lib::{DEFAULT_SHIFT_HOURS, ShiftConfig, ShiftMode, parse_at_time, parse_hours};

use super::color_context::ColorContext;
use super::modal::Modal;

/// Characters of a typed key left readable at the end.
const VISIBLE_KEY_SUFFIX: usize = 4;

const FULL_LAYOUT_THRESHOLD: u16 = 16;
const FULL_MODAL_MIN_HEIGHT: u16 = 14;
const COMPACT_MODAL_MIN_HEIGHT: u16 = 8;
const COMPACT_LABEL_WIDTH: usize = 10;

/// Layout mode for the shift modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputLayout {
    #[default]
    Full,
    Compact,
}

/// Modal for pasting an ElevenLabs API key.
#[derive(Debug, Default)]
pub struct ApiKeyModal {
    pub value: String,
    pub error_message: Option<String>,
}

impl ApiKeyModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_char(&mut self, c: char) {
        self.value.push(c);
        self.error_message = None;
    }

    /// Pasted text arrives as one string; newlines are dropped.
    pub fn handle_paste(&mut self, text: &str) {
        self.value
            .extend(text.chars().filter(|c| !c.is_control()));
        self.error_message = None;
    }

    pub fn handle_backspace(&mut self) {
        self.value.pop();
    }

    /// Returns the trimmed key, or records an error for a blank one.
    pub fn submit(&mut self) -> Result<String, String> {
        let key = self.value.trim();
        if key.is_empty() {
            let message = "API key cannot be empty".to_string();
            self.error_message = Some(message.clone());
            return Err(message);
        }
        self.error_message = None;
        Ok(key.to_string())
    }

    /// The typed key with everything but the last few characters hidden.
    fn masked(&self) -> String {
        let len = self.value.chars().count();
        let hidden = len.saturating_sub(VISIBLE_KEY_SUFFIX);
        self.value
            .chars()
            .enumerate()
            .map(|(i, c)| if i < hidden { '\u{2022}' } else { c })
            .collect()
    }
}

impl Modal for ApiKeyModal {
    fn title(&self) -> &str {
        "ElevenLabs API Key"
    }

    fn width_percent(&self) -> u16 {
        70
    }

    fn height_percent(&self) -> u16 {
        30
    }

    fn min_height(&self) -> u16 {
        8
    }

    fn render(&self, frame: &mut Frame, area: Rect, _color_context: &ColorContext) {
        let error_height = if self.error_message.is_some() { 1 } else { 0 };
        let chunks = Layout::vertical([
            Constraint::Length(3), // Key
            Constraint::Length(error_height),
            Constraint::Min(1), // Help
        ])
        .split(area);

        render_text_field(frame, chunks[0], "Key", &self.masked(), true);

        if let Some(ref error) = self.error_message {
            render_error(frame, chunks[1], error);
        }

        render_help(frame, chunks[2], "Enter: Save | Esc: Cancel");
    }
}

/// The active field in the shift form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftField {
    #[default]
    Mode,
    Hours,
    LogoutAt,
}

/// Modal for editing the shift length or logout time.
#[derive(Debug)]
pub struct ShiftModal {
    pub mode: ShiftMode,
    pub hours: String,
    pub logout_at: String,
    pub active_field: ShiftField,
    pub layout: InputLayout,
    pub error_message: Option<String>,
}

impl ShiftModal {
    /// Pre-fills the form from the current config.
    pub fn new(config: &ShiftConfig) -> Self {
        Self {
            mode: config.mode,
            hours: format_hours(config.duration_hours),
            logout_at: config
                .target_time
                .map(|time| time.format("%H:%M").to_string())
                .unwrap_or_default(),
            active_field: ShiftField::default(),
            layout: InputLayout::default(),
            error_message: None,
        }
    }

    /// Updates layout mode based on available height.
    pub fn update_layout(&mut self, available_height: u16) {
        self.layout = if available_height >= FULL_LAYOUT_THRESHOLD {
            InputLayout::Full
        } else {
            InputLayout::Compact
        };
    }

    /// Move to next field (Tab).
    pub fn next_field(&mut self) {
        self.active_field = match self.active_field {
            ShiftField::Mode => ShiftField::Hours,
            ShiftField::Hours => ShiftField::LogoutAt,
            ShiftField::LogoutAt => ShiftField::Mode,
        };
        self.error_message = None;
    }

    /// Move to previous field (Shift+Tab).
    pub fn prev_field(&mut self) {
        self.active_field = match self.active_field {
            ShiftField::Mode => ShiftField::LogoutAt,
            ShiftField::Hours => ShiftField::Mode,
            ShiftField::LogoutAt => ShiftField::Hours,
        };
        self.error_message = None;
    }

    /// Toggle between a fixed duration and a fixed clock time.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            ShiftMode::FixedDuration => ShiftMode::FixedClockTime,
            ShiftMode::FixedClockTime => ShiftMode::FixedDuration,
        };
        self.error_message = None;
    }

    /// Handle character input for the active field.
    pub fn handle_char(&mut self, c: char) {
        match self.active_field {
            ShiftField::Mode => self.toggle_mode(),
            ShiftField::Hours => self.hours.push(c),
            ShiftField::LogoutAt => self.logout_at.push(c),
        }
        self.error_message = None;
    }

    /// Handle backspace.
    pub fn handle_backspace(&mut self) {
        match self.active_field {
            ShiftField::Hours => {
                self.hours.pop();
            }
            ShiftField::LogoutAt => {
                self.logout_at.pop();
            }
            ShiftField::Mode => {}
        }
    }

    /// Builds the config, validating only the field the mode uses.
    ///
    /// The other field is kept when it parses, so flipping the mode later
    /// does not lose it.
    pub fn validate(&mut self) -> Result<ShiftConfig, String> {
        let result = match self.mode {
            ShiftMode::FixedDuration => parse_hours(&self.hours)
                .map_err(|_| "Invalid hours (try 8 or 7.5)".to_string())
                .map(|hours| ShiftConfig {
                    mode: ShiftMode::FixedDuration,
                    duration_hours: hours,
                    target_time: parse_at_time(&self.logout_at).ok(),
                }),
            ShiftMode::FixedClockTime => parse_at_time(&self.logout_at)
                .map_err(|_| "Invalid time format (try 5:30pm or 17:30)".to_string())
                .map(|time| ShiftConfig {
                    mode: ShiftMode::FixedClockTime,
                    duration_hours: parse_hours(&self.hours).unwrap_or(DEFAULT_SHIFT_HOURS),
                    target_time: Some(time),
                }),
        };

        self.error_message = result.as_ref().err().cloned();
        result
    }

    fn mode_label(&self) -> &'static str {
        match self.mode {
            ShiftMode::FixedDuration => "Fixed duration",
            ShiftMode::FixedClockTime => "Fixed logout time",
        }
    }
}

impl Modal for ShiftModal {
    fn title(&self) -> &str {
        "Shift Settings"
    }

    fn width_percent(&self) -> u16 {
        60
    }

    fn height_percent(&self) -> u16 {
        50
    }

    /// Minimum height to ensure the modal renders properly in small terminals.
    fn min_height(&self) -> u16 {
        match self.layout {
            InputLayout::Full => FULL_MODAL_MIN_HEIGHT,
            InputLayout::Compact => COMPACT_MODAL_MIN_HEIGHT,
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect, _color_context: &ColorContext) {
        match self.layout {
            InputLayout::Full => self.render_full(frame, area),
            InputLayout::Compact => self.render_compact(frame, area),
        }
    }
}

impl ShiftModal {
    fn render_full(&self, frame: &mut Frame, area: Rect) {
        let error_height = if self.error_message.is_some() { 1 } else { 0 };
        let chunks = Layout::vertical([
            Constraint::Length(3), // Mode
            Constraint::Length(3), // Hours
            Constraint::Length(3), // Logout at
            Constraint::Length(error_height),
            Constraint::Min(1), // Help
        ])
        .split(area);

        render_selector_field(
            frame,
            chunks[0],
            "Shift ends",
            self.mode_label(),
            self.active_field == ShiftField::Mode,
        );
        render_text_field_with_placeholder(
            frame,
            chunks[1],
            "Hours",
            &self.hours,
            "e.g., 8 or 7.5",
            self.active_field == ShiftField::Hours,
            self.mode == ShiftMode::FixedDuration,
        );
        render_text_field_with_placeholder(
            frame,
            chunks[2],
            "Logout at",
            &self.logout_at,
            "e.g., 5:30pm or 17:30",
            self.active_field == ShiftField::LogoutAt,
            self.mode == ShiftMode::FixedClockTime,
        );

        if let Some(ref error) = self.error_message {
            render_error(frame, chunks[3], error);
        }

        render_help(frame, chunks[4], "Tab: Next field | Enter: Save | Esc: Cancel");
    }

    fn render_compact(&self, frame: &mut Frame, area: Rect) {
        let error_height = if self.error_message.is_some() { 1 } else { 0 };
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(error_height),
            Constraint::Min(1),
        ])
        .split(area);

        render_compact_field(
            frame,
            chunks[0],
            "Ends",
            &format!("< {} >", self.mode_label()),
            self.active_field == ShiftField::Mode,
        );
        render_compact_field(
            frame,
            chunks[1],
            "Hours",
            &self.hours,
            self.active_field == ShiftField::Hours,
        );
        render_compact_field(
            frame,
            chunks[2],
            "Logout at",
            &self.logout_at,
            self.active_field == ShiftField::LogoutAt,
        );

        if let Some(ref error) = self.error_message {
            render_error(frame, chunks[3], error);
        }

        render_help(frame, chunks[4], "Tab: Next | Enter: Save | Esc: Cancel");
    }
}

/// `8.0` shows as `8`, `7.5` as `7.5`.
fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{hours:.0}")
    } else {
        hours.to_string()
    }
}

fn active_style(is_active: bool) -> Style {
    if is_active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn render_text_field(frame: &mut Frame, area: Rect, label: &str, value: &str, is_active: bool) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", label))
        .border_style(active_style(is_active));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let display_value = if is_active {
        format!("{value}|")
    } else {
        value.to_string()
    };
    frame.render_widget(Paragraph::new(display_value), inner);
}

fn render_text_field_with_placeholder(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    value: &str,
    placeholder: &str,
    is_active: bool,
    is_used: bool,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", label))
        .border_style(active_style(is_active));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let is_placeholder = value.is_empty() && !is_active;
    let display = if is_active {
        format!("{value}|")
    } else if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };
    let text_style = if is_placeholder {
        Style::default().fg(Color::DarkGray)
    } else if !is_used {
        // Kept for later but ignored by the current mode.
        Style::default().add_modifier(Modifier::DIM)
    } else {
        Style::default()
    };

    frame.render_widget(Paragraph::new(display).style(text_style), inner);
}

fn render_selector_field(frame: &mut Frame, area: Rect, label: &str, value: &str, is_active: bool) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", label))
        .border_style(active_style(is_active));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let arrows = if is_active { "< " } else { "  " };
    let arrows_end = if is_active { " >" } else { "  " };

    let para = Paragraph::new(format!("{}{}{}", arrows, value, arrows_end));
    frame.render_widget(para, inner);
}

fn render_compact_field(frame: &mut Frame, area: Rect, label: &str, value: &str, is_active: bool) {
    let style = active_style(is_active);
    let label_text = format!("{label:<width$}: ", width = COMPACT_LABEL_WIDTH);
    let value_text = if is_active {
        format!("{value}|")
    } else {
        value.to_string()
    };

    let line = Line::from(vec![
        Span::styled(format!(" {label_text}"), style),
        Span::styled(value_text, style),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_error(frame: &mut Frame, area: Rect, error: &str) {
    let error_para = Paragraph::new(error)
        .style(Style::default().fg(Color::Red))
        .alignment(Alignment::Center);
    frame.render_widget(error_para, area);
}

fn render_help(frame: &mut Frame, area: Rect, text: &str) {
    let help = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn api_key_is_masked_except_suffix() {
        let mut modal = ApiKeyModal::new();
        for c in "sk_abcdef1234".chars() {
            modal.handle_char(c);
        }
        let masked = modal.masked();
        assert!(masked.ends_with("1234"));
        assert!(!masked.contains("sk_"));
        assert_eq!(masked.chars().count(), 13);
    }

    #[test]
    fn short_api_key_is_not_hidden() {
        let mut modal = ApiKeyModal::new();
        modal.handle_char('a');
        modal.handle_char('b');
        assert_eq!(modal.masked(), "ab");
    }

    #[test]
    fn api_key_submit_trims_and_rejects_blank() {
        let mut modal = ApiKeyModal::new();
        assert!(modal.submit().is_err());
        assert!(modal.error_message.is_some());

        modal.handle_paste("  sk_key\n");
        assert_eq!(modal.submit().unwrap(), "sk_key");
        assert!(modal.error_message.is_none());
    }

    #[test]
    fn api_key_backspace_removes_last_char() {
        let mut modal = ApiKeyModal::new();
        modal.handle_paste("abc");
        modal.handle_backspace();
        assert_eq!(modal.value, "ab");
    }

    #[test]
    fn shift_modal_prefills_from_config() {
        let modal = ShiftModal::new(&ShiftConfig::fixed_duration(7.5));
        assert_eq!(modal.mode, ShiftMode::FixedDuration);
        assert_eq!(modal.hours, "7.5");
        assert!(modal.logout_at.is_empty());

        let time = NaiveTime::from_hms_opt(17, 30, 0).unwrap();
        let modal = ShiftModal::new(&ShiftConfig::fixed_clock_time(time));
        assert_eq!(modal.mode, ShiftMode::FixedClockTime);
        assert_eq!(modal.hours, "8");
        assert_eq!(modal.logout_at, "17:30");
    }

    #[test]
    fn next_field_cycles_through_all_fields() {
        let mut modal = ShiftModal::new(&ShiftConfig::default());
        assert_eq!(modal.active_field, ShiftField::Mode);
        modal.next_field();
        assert_eq!(modal.active_field, ShiftField::Hours);
        modal.next_field();
        assert_eq!(modal.active_field, ShiftField::LogoutAt);
        modal.next_field();
        assert_eq!(modal.active_field, ShiftField::Mode);
        modal.prev_field();
        assert_eq!(modal.active_field, ShiftField::LogoutAt);
    }

    #[test]
    fn typing_on_mode_field_toggles_mode() {
        let mut modal = ShiftModal::new(&ShiftConfig::default());
        modal.handle_char(' ');
        assert_eq!(modal.mode, ShiftMode::FixedClockTime);
        modal.toggle_mode();
        assert_eq!(modal.mode, ShiftMode::FixedDuration);
    }

    #[test]
    fn validate_fixed_duration() {
        let mut modal = ShiftModal::new(&ShiftConfig::default());
        modal.hours = "6".into();
        let config = modal.validate().unwrap();
        assert_eq!(config, ShiftConfig::fixed_duration(6.0));
    }

    #[test]
    fn validate_rejects_zero_hours() {
        let mut modal = ShiftModal::new(&ShiftConfig::default());
        modal.hours = "0".into();
        assert!(modal.validate().is_err());
        assert!(modal.error_message.as_deref().unwrap().contains("hours"));
    }

    #[test]
    fn validate_fixed_clock_time_ignores_bad_hours() {
        let mut modal = ShiftModal::new(&ShiftConfig::default());
        modal.toggle_mode();
        modal.hours = "nonsense".into();
        modal.logout_at = "5:30pm".into();

        let config = modal.validate().unwrap();
        assert_eq!(config.mode, ShiftMode::FixedClockTime);
        assert_eq!(config.target_time, NaiveTime::from_hms_opt(17, 30, 0));
        assert_eq!(config.duration_hours, DEFAULT_SHIFT_HOURS);
    }

    #[test]
    fn validate_fixed_clock_time_requires_time() {
        let mut modal = ShiftModal::new(&ShiftConfig::default());
        modal.toggle_mode();
        assert!(modal.validate().is_err());
        assert!(modal.error_message.as_deref().unwrap().contains("time"));
    }

    #[test]
    fn backspace_edits_active_text_field() {
        let mut modal = ShiftModal::new(&ShiftConfig::default());
        modal.next_field();
        modal.handle_backspace();
        assert_eq!(modal.hours, "");
        modal.handle_char('9');
        assert_eq!(modal.hours, "9");
    }

    #[test]
    fn shift_modal_has_minimum_height_for_small_terminals() {
        let mut modal = ShiftModal::new(&ShiftConfig::default());
        modal.update_layout(10);
        assert_eq!(modal.min_height(), COMPACT_MODAL_MIN_HEIGHT);
        modal.update_layout(40);
        assert_eq!(modal.min_height(), FULL_MODAL_MIN_HEIGHT);
    }
}
