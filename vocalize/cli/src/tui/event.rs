//! Event handling and main application loop.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use vocalize_lib::AppEvent;
use vocalize_lib::voice::TextEdit;

use super::app::{App, AppMode};
use super::input_modal::{ApiKeyModal, ShiftModal};
use super::render;

/// Runs the TUI application main loop.
///
/// This function handles:
/// - Handing queued effects to the runner
/// - Rendering the UI on each frame
/// - Applying clock ticks and completed work
/// - Handling keyboard and paste input
///
/// ## Errors
///
/// Returns an I/O error if terminal operations fail.
pub fn run_app(terminal: &mut DefaultTerminal, app: &mut App) -> io::Result<()> {
    loop {
        app.flush_effects();
        terminal.draw(|frame| render::render(app, frame))?;

        // Non-blocking; ticks and completions queue up between frames.
        app.drain_events();
        app.flush_effects();

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }

        match event::read()? {
            // Only handle Press events (Windows compatibility)
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                handle_input(app, key.code, key.modifiers);
            }
            Event::Paste(text) => handle_paste(app, &text),
            _ => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Routes keyboard input to the appropriate mode handler.
///
/// A pending notice takes every key until it is dismissed.
fn handle_input(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
    if app.state.notice().is_some() {
        handle_notice(app, key);
        return;
    }

    match app.mode {
        AppMode::Normal => handle_normal_mode(app, key),
        AppMode::EditText => handle_edit_text(app, key, modifiers),
        AppMode::ApiKeyModal => handle_api_key_modal(app, key),
        AppMode::ShiftModal => handle_shift_modal(app, key),
        AppMode::ConfirmQuit => handle_confirm_quit(app, key),
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.state.notice().is_some() {
        return;
    }
    match app.mode {
        AppMode::EditText => app.dispatch(AppEvent::EditText(TextEdit::InsertStr(text.to_string()))),
        AppMode::ApiKeyModal => {
            if let Some(modal) = app.api_key_modal.as_mut() {
                modal.handle_paste(text);
            }
        }
        _ => {}
    }
}

fn handle_notice(app: &mut App, key: KeyCode) {
    let offers_on_device = app
        .state
        .notice()
        .is_some_and(|notice| notice.offer_on_device);

    match key {
        KeyCode::Enter | KeyCode::Esc => app.dispatch(AppEvent::DismissNotice),
        KeyCode::Char('o') | KeyCode::Char('O') if offers_on_device => {
            app.dispatch(AppEvent::DismissNotice);
            app.dispatch(AppEvent::UseOnDevice);
        }
        _ => {}
    }
}

/// Handles keyboard input in normal mode.
fn handle_normal_mode(app: &mut App, key: KeyCode) {
    match key {
        // Quit commands
        KeyCode::Char('q') | KeyCode::Char('Q') => {
            if app.has_work_in_progress() {
                app.mode = AppMode::ConfirmQuit;
            } else {
                app.should_quit = true;
            }
        }
        KeyCode::Esc => {
            app.should_quit = true;
        }

        // Voice selection
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),

        // Mode switching
        KeyCode::Char('i') | KeyCode::Char('I') => {
            app.mode = AppMode::EditText;
        }
        KeyCode::Char('a') | KeyCode::Char('A') => {
            app.api_key_modal = Some(ApiKeyModal::new());
            app.mode = AppMode::ApiKeyModal;
        }
        KeyCode::Char('c') | KeyCode::Char('C') => {
            app.shift_modal = Some(ShiftModal::new(app.state.shift_config()));
            app.mode = AppMode::ShiftModal;
        }

        // Shift timer
        KeyCode::Char('s') | KeyCode::Char('S') => app.dispatch(AppEvent::StartShift),
        KeyCode::Char('e') | KeyCode::Char('E') => app.dispatch(AppEvent::EndShift),

        // Audio
        KeyCode::Char('g') | KeyCode::Char('G') => app.dispatch(AppEvent::Generate),
        KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::Char(' ') => {
            app.dispatch(AppEvent::TogglePlayback);
        }
        KeyCode::Char('d') | KeyCode::Char('D') => app.dispatch(AppEvent::Download),

        // Voice source
        KeyCode::Char('o') | KeyCode::Char('O') => app.dispatch(AppEvent::UseOnDevice),
        KeyCode::Char('r') | KeyCode::Char('R') => app.dispatch(AppEvent::RefreshCatalog),

        _ => {}
    }
}

/// Handles typing into the text panel.
fn handle_edit_text(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match key {
        KeyCode::Esc => {
            app.mode = AppMode::Normal;
        }
        KeyCode::Char('u') if ctrl => app.dispatch(AppEvent::EditText(TextEdit::Clear)),
        KeyCode::Char('g') if ctrl => {
            app.mode = AppMode::Normal;
            app.dispatch(AppEvent::Generate);
        }
        KeyCode::Char(c) if !ctrl => app.dispatch(AppEvent::EditText(TextEdit::Insert(c))),
        KeyCode::Enter => app.dispatch(AppEvent::EditText(TextEdit::Insert('\n'))),
        KeyCode::Backspace => app.dispatch(AppEvent::EditText(TextEdit::Backspace)),
        _ => {}
    }
}

/// Handles keyboard input in the API key modal.
fn handle_api_key_modal(app: &mut App, key: KeyCode) {
    let Some(modal) = app.api_key_modal.as_mut() else {
        app.mode = AppMode::Normal;
        return;
    };

    match key {
        KeyCode::Esc => close_modals(app),
        KeyCode::Enter => {
            if let Ok(key) = modal.submit() {
                close_modals(app);
                app.dispatch(AppEvent::SetCredential(key));
            }
        }
        KeyCode::Backspace => modal.handle_backspace(),
        KeyCode::Char(c) => modal.handle_char(c),
        _ => {}
    }
}

/// Handles keyboard input in the shift settings modal.
fn handle_shift_modal(app: &mut App, key: KeyCode) {
    let Some(modal) = app.shift_modal.as_mut() else {
        app.mode = AppMode::Normal;
        return;
    };

    match key {
        KeyCode::Esc => close_modals(app),
        KeyCode::Tab | KeyCode::Down => modal.next_field(),
        KeyCode::BackTab | KeyCode::Up => modal.prev_field(),
        KeyCode::Enter => {
            if let Ok(config) = modal.validate() {
                close_modals(app);
                app.dispatch(AppEvent::ConfigureShift(config));
            }
        }
        KeyCode::Backspace => modal.handle_backspace(),
        KeyCode::Char(c) => modal.handle_char(c),
        _ => {}
    }
}

/// Handles keyboard input in the quit confirmation dialog.
fn handle_confirm_quit(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
            app.should_quit = true;
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.mode = AppMode::Normal;
        }
        _ => {}
    }
}

fn close_modals(app: &mut App) {
    app.api_key_modal = None;
    app.shift_modal = None;
    app.mode = AppMode::Normal;
}
