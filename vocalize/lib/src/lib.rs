//! Vocalize library: text-to-speech and a shift timer for the terminal.
//!
//! This library holds all state and protocol logic for the `vocalize` CLI.
//! Nothing in it draws to the screen; the binary renders [`AppState`] and
//! carries out the [`Effect`]s it asks for.
//!
//! ## Application State
//!
//! - [`AppState`] - Everything the UI shows, mutated only by [`AppState::handle`]
//! - [`AppEvent`] - User actions, clock ticks and completed work
//! - [`Effect`] - Side effects the event loop performs
//!
//! ## Shift Timer
//!
//! - [`DutyTimer`] - Idle / Active / Alerted state machine
//! - [`ShiftConfig`] - Fixed duration or fixed clock time
//! - [`format_remaining`] - `HH:MM:SS` countdown text
//! - [`Clock`] - The 1 Hz ticker driving the timer
//!
//! ## Voice Synthesis
//!
//! - [`voice::VoiceState`] - Catalog, selection, text and latest audio
//! - [`voice::elevenlabs::ElevenLabsClient`] - The remote service
//! - [`voice::host::HostSpeech`] - On-device speech (`say`, `espeak-ng`)
//! - [`voice::playback`] - Playing and saving audio
//!
//! ## Settings
//!
//! - [`SettingsStore`] - Trait for settings backends
//! - [`JsonSettingsStore`] - JSON file with file locking
//!
//! ## Parsing Utilities
//!
//! - [`parse_at_time`] - Parse time strings like "6:00pm" or "18:00"
//! - [`parse_hours`] - Parse shift lengths like "8" or "7.5h"

mod clock;
mod duty;
mod error;
mod parse;
mod settings;
mod state;
pub mod voice;

pub use clock::{Clock, TICK_INTERVAL};
pub use duty::{
    ALERT_MESSAGE, ALERT_THRESHOLD_MS, DEFAULT_SHIFT_HOURS, DutyPhase, DutySession, DutyTimer,
    IDLE_PLACEHOLDER, ShiftConfig, ShiftMode, TickOutcome, format_remaining,
};
pub use error::{SettingsError, ShiftError, VoiceError};
pub use parse::{parse_at_time, parse_hours};
pub use settings::{JsonSettingsStore, Settings, SettingsStore};
pub use state::{AppEvent, AppState, Effect, Notice, NoticeLevel, StartupConfig};
