//! Terminal user interface for vocalize.
//!
//! Speech synthesis and the shift timer share one screen. All state lives in
//! [`vocalize_lib::AppState`]; this module only draws it, maps keys to
//! events and runs the effects the state asks for.

mod app;
mod color_context;
mod effects;
mod event;
mod input_modal;
mod modal;
mod render;

use ratatui::style::Color;

/// Background for the header, footer and modals.
pub const PANEL_BG: Color = Color::Rgb(30, 30, 46);

pub use app::App;
pub use event::run_app;
