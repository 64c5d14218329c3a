//! Color context management for NO_COLOR support.
//!
//! Per [no-color.org](https://no-color.org), color is disabled when the
//! `NO_COLOR` environment variable exists and is not empty. Status symbols
//! fall back to bracketed ASCII so the duty phase and notice severity stay
//! readable without color.

use std::env;

use vocalize_lib::{DutyPhase, NoticeLevel};

/// Context for color-aware rendering decisions.
///
/// Created once per frame and passed through to render functions.
#[derive(Debug, Clone, Copy)]
pub struct ColorContext {
    color_enabled: bool,
}

impl ColorContext {
    /// Creates a new `ColorContext` by detecting the `NO_COLOR` environment variable.
    pub fn new() -> Self {
        Self {
            color_enabled: Self::detect_color_enabled(),
        }
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self {
            color_enabled: true,
        }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self {
            color_enabled: false,
        }
    }

    /// Returns `true` if color output is enabled.
    pub fn is_color_enabled(&self) -> bool {
        self.color_enabled
    }

    /// Symbol shown next to the duty countdown.
    pub fn phase_symbol(&self, phase: DutyPhase) -> &'static str {
        match (self.color_enabled, phase) {
            (true, DutyPhase::Idle) => "\u{25cb}",    // ○
            (true, DutyPhase::Active) => "\u{25b6}",  // ▶
            (true, DutyPhase::Alerted) => "\u{26a0}", // ⚠
            (false, DutyPhase::Idle) => "[--]",
            (false, DutyPhase::Active) => "[ON]",
            (false, DutyPhase::Alerted) => "[!!]",
        }
    }

    /// Symbol prefixed to a notice message.
    pub fn notice_symbol(&self, level: NoticeLevel) -> &'static str {
        match (self.color_enabled, level) {
            (true, NoticeLevel::Info) => "\u{2713}",    // ✓
            (true, NoticeLevel::Warning) => "\u{26a0}", // ⚠
            (true, NoticeLevel::Error) => "\u{2717}",   // ✗
            (false, NoticeLevel::Info) => "[OK]",
            (false, NoticeLevel::Warning) => "[WARN]",
            (false, NoticeLevel::Error) => "[FAIL]",
        }
    }

    /// Marker in front of the selected voice.
    pub fn selection_marker(&self) -> &'static str {
        if self.color_enabled { "\u{25b8} " } else { "> " }
    }

    fn detect_color_enabled() -> bool {
        match env::var("NO_COLOR") {
            Ok(value) => value.is_empty(),
            Err(env::VarError::NotPresent) => true,
            Err(env::VarError::NotUnicode(_)) => false, // Treat invalid UTF-8 as "set"
        }
    }
}

impl Default for ColorContext {
    fn default() -> Self {
        Self::new()
    }
}
