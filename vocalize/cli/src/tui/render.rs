//! Rendering functions for the TUI.
//!
//! The layout is a header with the live clock, the text panel and action bar
//! on the left, the voice list and shift panel on the right, and a footer of
//! shortcuts. Modals are drawn on top, with a pending notice above all else.

use chrono::NaiveDateTime;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use vocalize_lib::{AppState, IDLE_PLACEHOLDER, ShiftConfig, ShiftMode};

use super::PANEL_BG;
use super::app::{App, AppMode};
use super::color_context::ColorContext;
use super::modal::{ConfirmQuitDialog, NoticeDialog, render_modal};

/// Renders the entire application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let color_context = ColorContext::new();
    let area = frame.area();

    let rows = Layout::vertical([
        Constraint::Length(3), // Header
        Constraint::Min(8),    // Body
        Constraint::Length(3), // Footer
    ])
    .split(area);

    let columns =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).split(rows[1]);
    let left = Layout::vertical([
        Constraint::Min(4),    // Text
        Constraint::Length(3), // Action bar
    ])
    .split(columns[0]);
    let right = Layout::vertical([
        Constraint::Min(4),    // Voices
        Constraint::Length(8), // Shift
    ])
    .split(columns[1]);

    render_header(&app.state, frame, rows[0]);
    render_text_panel(app, frame, left[0]);
    render_action_bar(&app.state, frame, left[1]);
    render_voice_list(app, frame, right[0], &color_context);
    render_duty_panel(&app.state, frame, right[1], &color_context);
    render_footer(app, frame, rows[2]);

    match app.mode {
        AppMode::ConfirmQuit => {
            render_modal(frame, &ConfirmQuitDialog, area, &color_context);
        }
        AppMode::ApiKeyModal => {
            if let Some(modal) = app.api_key_modal.as_ref() {
                render_modal(frame, modal, area, &color_context);
            }
        }
        AppMode::ShiftModal => {
            if let Some(modal) = app.shift_modal.as_mut() {
                modal.update_layout(area.height);
                render_modal(frame, &*modal, area, &color_context);
            }
        }
        AppMode::Normal | AppMode::EditText => {}
    }

    if let Some(notice) = app.state.notice() {
        render_modal(frame, &NoticeDialog::new(notice), area, &color_context);
    }
}

/// Title, on-device badge, masked key and the clock.
fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().bg(PANEL_BG));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut title = vec![Span::styled(
        " Vocalize ",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if state.voice().is_on_device() {
        title.push(Span::styled(
            " ON-DEVICE ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let status = Line::from(vec![
        Span::styled("Key: ", Style::default().fg(Color::DarkGray)),
        Span::raw(state.voice().masked_credential()),
        Span::raw("  "),
        Span::styled(
            format_clock(state.now()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
    ]);

    frame.render_widget(Paragraph::new(Line::from(title)), inner);
    frame.render_widget(Paragraph::new(status).alignment(Alignment::Right), inner);
}

fn render_text_panel(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.mode == AppMode::EditText;
    let text = app.state.voice().text();

    let border_style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Text ({} chars) ", text.chars().count()))
        .border_style(border_style);

    let paragraph = if text.is_empty() && !editing {
        Paragraph::new("Press I to type the text to speak.")
            .style(Style::default().fg(Color::DarkGray))
    } else if editing {
        Paragraph::new(format!("{text}|"))
    } else {
        Paragraph::new(text)
    };

    frame.render_widget(paragraph.block(block).wrap(Wrap { trim: false }), area);
}

fn render_action_bar(state: &AppState, frame: &mut Frame, area: Rect) {
    let (label, style) = action_status(state);
    let bar = Paragraph::new(label)
        .block(Block::default().borders(Borders::ALL).title(" Audio "))
        .style(style);
    frame.render_widget(bar, area);
}

/// What the audio bar says, most urgent first.
fn action_status(state: &AppState) -> (String, Style) {
    let voice = state.voice();
    if voice.is_synthesizing() {
        return (
            "Generating\u{2026}".to_string(),
            Style::default().fg(Color::Yellow),
        );
    }
    if state.is_speaking() {
        return (
            "Speaking on device\u{2026} (P to stop)".to_string(),
            Style::default().fg(Color::Green),
        );
    }
    if state.is_playing() {
        return (
            "Playing (P to stop)".to_string(),
            Style::default().fg(Color::Green),
        );
    }
    match voice.artifact() {
        Some(artifact) => (
            format!(
                "Ready: {} ({}) | P play | D download",
                artifact.file_name(),
                format_size(artifact.bytes.len())
            ),
            Style::default(),
        ),
        None => (
            "No audio yet. Press G to generate.".to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    }
}

fn render_voice_list(app: &mut App, frame: &mut Frame, area: Rect, color_context: &ColorContext) {
    let voice = app.state.voice();

    let title = if voice.is_loading_catalog() {
        " Voices (loading\u{2026}) ".to_string()
    } else {
        format!(" Voices ({}) ", voice.catalog().len())
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let error_lines = match voice.catalog_error() {
        Some(err) => vec![
            Line::styled(err.catalog_message(), Style::default().fg(Color::Red)),
            Line::styled(
                "Press O to use on-device voices.",
                Style::default().fg(Color::DarkGray),
            ),
        ],
        None => Vec::new(),
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let error_height = if error_lines.is_empty() {
        0
    } else {
        // Room for the message to wrap once.
        error_lines.len() as u16 + 1
    };
    let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(error_height)])
        .split(inner);

    let items: Vec<ListItem> = voice
        .catalog()
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::raw(entry.display_name.clone()),
                Span::styled(
                    format!("  {}", entry.category),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .highlight_symbol(color_context.selection_marker())
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    if !error_lines.is_empty() {
        frame.render_widget(
            Paragraph::new(error_lines).wrap(Wrap { trim: true }),
            chunks[1],
        );
    }
    frame.render_stateful_widget(list, chunks[0], &mut app.voice_list);
}

fn render_duty_panel(state: &AppState, frame: &mut Frame, area: Rect, color_context: &ColorContext) {
    let duty = state.duty();
    let session = duty.session();

    let label = Style::default().fg(Color::DarkGray);
    let login = session.map_or(IDLE_PLACEHOLDER.to_string(), |s| format_clock(s.login_at));
    let logout = session.map_or(IDLE_PLACEHOLDER.to_string(), |s| format_clock(s.logout_at));

    let mut lines = vec![
        Line::from(vec![Span::styled("Login:     ", label), Span::raw(login)]),
        Line::from(vec![Span::styled("Logout:    ", label), Span::raw(logout)]),
        Line::from(vec![
            Span::styled("Remaining: ", label),
            Span::styled(
                format!(
                    "{} {}",
                    color_context.phase_symbol(duty.phase()),
                    state.countdown()
                ),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Setting:   ", label),
            Span::raw(describe_shift(state.shift_config())),
        ]),
    ];

    if state.alert_active() {
        let banner_style = if color_context.is_color_enabled() {
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        };
        lines.push(Line::styled(" Shift ends in under two minutes ", banner_style));
    }

    let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Shift "));
    frame.render_widget(panel, area);
}

/// Returns the keyboard shortcuts for Normal mode based on terminal width.
fn get_normal_mode_shortcuts(width: u16) -> Vec<(&'static str, &'static str)> {
    if width >= 110 {
        vec![
            ("G", "Generate"),
            ("P", "Play"),
            ("D", "Download"),
            ("I", "Type"),
            ("\u{2191}\u{2193}", "Voice"),
            ("S", "Start"),
            ("E", "End"),
            ("C", "Shift"),
            ("A", "API key"),
            ("O", "On-device"),
            ("Q", "Quit"),
        ]
    } else if width >= 70 {
        vec![
            ("G", "Gen"),
            ("P", "Play"),
            ("D", "Save"),
            ("I", "Type"),
            ("S", "Start"),
            ("E", "End"),
            ("C", "Shift"),
            ("A", "Key"),
            ("Q", "Quit"),
        ]
    } else {
        vec![("G", "Gen"), ("I", "Type"), ("S", "Start"), ("Q", "Quit")]
    }
}

/// Renders the footer with keyboard shortcuts appropriate for the current mode.
fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (bg_color, shortcuts) = if app.state.notice().is_some() {
        (PANEL_BG, vec![("Enter", "Dismiss")])
    } else {
        match app.mode {
            AppMode::Normal => (PANEL_BG, get_normal_mode_shortcuts(area.width)),
            AppMode::EditText => (
                Color::Yellow,
                vec![("Esc", "Done"), ("Ctrl+U", "Clear"), ("Ctrl+G", "Generate")],
            ),
            AppMode::ApiKeyModal => (PANEL_BG, vec![("Enter", "Save"), ("Esc", "Cancel")]),
            AppMode::ShiftModal => (
                PANEL_BG,
                vec![("Tab", "Next"), ("Space", "Toggle"), ("Enter", "Save"), ("Esc", "Cancel")],
            ),
            AppMode::ConfirmQuit => (PANEL_BG, vec![("Y", "Yes, Quit"), ("N", "No, Stay")]),
        }
    };

    let spans: Vec<Span> = shortcuts
        .iter()
        .flat_map(|(key, desc)| {
            vec![
                Span::styled(
                    format!(" {key} "),
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(" {desc} ")),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().bg(bg_color));

    frame.render_widget(footer, area);
}

fn format_clock(time: NaiveDateTime) -> String {
    time.format("%H:%M:%S").to_string()
}

fn describe_shift(config: &ShiftConfig) -> String {
    match (config.mode, config.target_time) {
        (ShiftMode::FixedClockTime, Some(time)) => format!("ends at {}", time.format("%H:%M")),
        (ShiftMode::FixedClockTime, None) => "ends at ?".to_string(),
        (ShiftMode::FixedDuration, _) => format!("{}h shift", config.duration_hours),
    }
}

/// Human-readable byte count.
fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let bytes = bytes as f64;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < KIB * KIB {
        format!("{:.1} KB", bytes / KIB)
    } else {
        format!("{:.1} MB", bytes / (KIB * KIB))
    }
}
