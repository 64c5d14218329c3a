//! Modal overlay infrastructure for the TUI.
//!
//! This module provides reusable modal dialog rendering with proper overlay handling.
//! Modals are rendered centered over the main content using the three-step pattern:
//! 1. Calculate centered area
//! 2. Clear the area (important for proper overlay)
//! 3. Render modal border and content

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use vocalize_lib::{Notice, NoticeLevel};

use super::PANEL_BG;
use super::color_context::ColorContext;

/// Trait for modal dialogs.
///
/// Implement this trait to create custom modal dialogs that can be rendered
/// using the [`render_modal`] function.
pub trait Modal {
    /// Render the modal content (without the overlay border).
    ///
    /// The `color_context` parameter provides NO_COLOR-aware symbol selection
    /// and should be used for status indicators and other symbols.
    fn render(&self, frame: &mut Frame, area: Rect, color_context: &ColorContext);

    /// Get the modal title displayed in the border.
    fn title(&self) -> &str;

    /// Get the desired width percentage (0-100).
    fn width_percent(&self) -> u16 {
        60
    }

    /// Get the desired height percentage (0-100).
    fn height_percent(&self) -> u16 {
        40
    }

    /// Get the minimum width in rows.
    ///
    /// This ensures the modal has enough space for its content even in small
    /// terminal windows. Returns 0 (no minimum) by default.
    fn min_width(&self) -> u16 {
        0
    }

    /// Get the minimum height in rows.
    ///
    /// This ensures the modal has enough space for its content even in small
    /// terminal windows. Returns 0 (no minimum) by default.
    fn min_height(&self) -> u16 {
        0
    }
}

/// Renders a modal overlay centered on the screen.
///
/// This function handles the three-step modal rendering pattern:
/// 1. Calculate centered area based on modal dimensions
/// 2. Clear the modal area with the `Clear` widget
/// 3. Render the modal border/title and delegate content rendering
///
/// ## Arguments
///
/// * `frame` - The frame to render to
/// * `modal` - The modal implementation to render
/// * `main_area` - The parent area to center within (typically `frame.area()`)
/// * `color_context` - Color context for NO_COLOR-aware rendering
pub fn render_modal(
    frame: &mut Frame,
    modal: &impl Modal,
    main_area: Rect,
    color_context: &ColorContext,
) {
    let modal_area = centered_rect_with_min(
        modal.width_percent(),
        modal.height_percent(),
        modal.min_width(),
        modal.min_height(),
        main_area,
    );

    // Step 1: Clear the modal area (essential for proper overlay)
    frame.render_widget(Clear, modal_area);

    // Step 2: Render the modal border/title
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", modal.title()))
        .style(Style::default().bg(PANEL_BG));

    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    // Step 3: Render the modal content
    modal.render(frame, inner, color_context);
}

/// Calculate a centered rectangle with the given percentage of parent size.
#[cfg(test)]
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    centered_rect_with_min(percent_x, percent_y, 0, 0, area)
}

/// Calculate a centered rectangle with percentage sizing and minimum dimensions.
///
/// The final size is the larger of:
/// - The percentage of the parent area
/// - The minimum dimensions (capped at the parent area size)
fn centered_rect_with_min(
    percent_x: u16,
    percent_y: u16,
    min_width: u16,
    min_height: u16,
    area: Rect,
) -> Rect {
    // Calculate percentage-based dimensions
    let percent_width = (area.width as u32 * percent_x as u32 / 100) as u16;
    let percent_height = (area.height as u32 * percent_y as u32 / 100) as u16;

    // Apply minimums (capped at parent size)
    let width = percent_width.max(min_width).min(area.width);
    let height = percent_height.max(min_height).min(area.height);

    // Center the rectangle
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;

    Rect::new(x, y, width, height)
}

/// Confirm quit dialog asking the user to confirm before exiting.
pub struct ConfirmQuitDialog;

impl Modal for ConfirmQuitDialog {
    fn title(&self) -> &str {
        "Quit?"
    }

    fn width_percent(&self) -> u16 {
        50
    }

    fn height_percent(&self) -> u16 {
        20
    }

    fn min_height(&self) -> u16 {
        7
    }

    fn render(&self, frame: &mut Frame, area: Rect, _color_context: &ColorContext) {
        // Brackets around keys provide NO_COLOR-friendly visual distinction
        let text = vec![
            Line::from("Work in progress. Quit anyway?"),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    " [Y] ",
                    Style::default()
                        .bg(Color::Green)
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" Yes  "),
                Span::styled(
                    " [N] ",
                    Style::default()
                        .bg(Color::Red)
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" No"),
            ]),
        ];

        let paragraph = Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });

        let centered = Layout::vertical([Constraint::Length(3)])
            .flex(Flex::Center)
            .split(area);

        frame.render_widget(paragraph, centered[0]);
    }
}

/// Shows the front [`Notice`] until dismissed.
pub struct NoticeDialog<'a> {
    notice: &'a Notice,
}

impl<'a> NoticeDialog<'a> {
    pub fn new(notice: &'a Notice) -> Self {
        Self { notice }
    }

    fn keys(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::BOLD);
        let mut spans = vec![Span::styled(" [Enter] ", key_style), Span::raw(" OK  ")];
        if self.notice.offer_on_device {
            spans.push(Span::styled(" [O] ", key_style));
            spans.push(Span::raw(" Use on-device voices"));
        }
        Line::from(spans)
    }
}

impl Modal for NoticeDialog<'_> {
    fn title(&self) -> &str {
        &self.notice.title
    }

    fn width_percent(&self) -> u16 {
        60
    }

    fn height_percent(&self) -> u16 {
        30
    }

    fn min_width(&self) -> u16 {
        40
    }

    fn min_height(&self) -> u16 {
        8
    }

    fn render(&self, frame: &mut Frame, area: Rect, color_context: &ColorContext) {
        let color = match self.notice.level {
            NoticeLevel::Info => Color::Cyan,
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };

        let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(area);

        let message = Line::from(vec![
            Span::styled(
                format!("{} ", color_context.notice_symbol(self.notice.level)),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(self.notice.message.as_str()),
        ]);
        let paragraph = Paragraph::new(message)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, chunks[0]);

        frame.render_widget(
            Paragraph::new(self.keys()).alignment(Alignment::Center),
            chunks[1],
        );
    }
}
