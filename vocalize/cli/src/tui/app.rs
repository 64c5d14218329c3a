//! Application state for the TUI.

use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use vocalize_lib::voice::elevenlabs::ElevenLabsClient;
use vocalize_lib::{AppEvent, AppState, Clock, Effect, JsonSettingsStore};

use super::effects::EffectRunner;
use super::input_modal::{ApiKeyModal, ShiftModal};

/// Capacity of the event channel shared by the clock and effect tasks.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Application mode determining keyboard behavior and UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Normal mode - voice list navigation and commands.
    #[default]
    Normal,
    /// Typing into the text panel.
    EditText,
    /// Entering an API key.
    ApiKeyModal,
    /// Editing the shift settings.
    ShiftModal,
    /// Confirm quit - awaiting Y/N to exit.
    ConfirmQuit,
}

/// TUI application state.
///
/// Wraps the library's [`AppState`] with what only the terminal needs:
/// the input mode, open modals, list scroll state and the effect runner.
pub struct App {
    /// Everything the library tracks.
    pub state: AppState,
    /// Current application mode.
    pub mode: AppMode,
    /// Flag indicating the application should exit.
    pub should_quit: bool,
    /// Receiver for clock ticks and effect completions.
    pub event_rx: Option<mpsc::Receiver<AppEvent>>,
    /// Selection state for the voice list widget.
    pub voice_list: ListState,
    /// API key modal state (present when ApiKeyModal mode is active).
    pub api_key_modal: Option<ApiKeyModal>,
    /// Shift modal state (present when ShiftModal mode is active).
    pub shift_modal: Option<ShiftModal>,
    /// Effects produced by [`App::dispatch`] not yet handed to the runner.
    pub pending_effects: Vec<Effect>,
    runner: Option<EffectRunner>,
    clock: Option<Clock>,
}

impl App {
    /// Creates the UI around `state`. Effects queue up until a runtime is
    /// attached with [`App::with_runtime`].
    pub fn new(state: AppState) -> Self {
        let mut app = Self {
            state,
            mode: AppMode::Normal,
            should_quit: false,
            event_rx: None,
            voice_list: ListState::default(),
            api_key_modal: None,
            shift_modal: None,
            pending_effects: Vec::new(),
            runner: None,
            clock: None,
        };
        let effects = app.state.startup();
        app.pending_effects.extend(effects);
        app.sync_voice_list();
        app
    }

    /// Attaches the effect runner and starts the clock.
    ///
    /// Must be called inside a tokio runtime.
    pub fn with_runtime(mut self, client: ElevenLabsClient, store: JsonSettingsStore) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.clock = Some(Clock::start(tx.clone(), AppEvent::Tick));
        self.runner = Some(EffectRunner::new(tx, client, store));
        self.event_rx = Some(rx);
        self
    }

    /// Applies an event to the state and queues the resulting effects.
    pub fn dispatch(&mut self, event: AppEvent) {
        let effects = self.state.handle(event);
        self.pending_effects.extend(effects);
        self.sync_voice_list();
    }

    /// Hands queued effects to the runner, if one is attached.
    pub fn flush_effects(&mut self) {
        if let Some(runner) = self.runner.as_mut() {
            for effect in self.pending_effects.drain(..) {
                runner.run(effect);
            }
        }
    }

    /// Dispatches every event waiting in the channel.
    pub fn drain_events(&mut self) {
        // Collect first to avoid borrowing the receiver across dispatch.
        let events: Vec<_> = self
            .event_rx
            .as_mut()
            .map(|rx| std::iter::from_fn(|| rx.try_recv().ok()).collect())
            .unwrap_or_default();

        for event in events {
            self.dispatch(event);
        }
    }

    /// Selects the next voice in the catalog (wraps around).
    pub fn select_next(&mut self) {
        let catalog = self.state.voice().catalog();
        if catalog.is_empty() {
            return;
        }
        let next = match self.state.voice().selected_index() {
            Some(index) => (index + 1) % catalog.len(),
            None => 0,
        };
        let id = catalog[next].id.clone();
        self.dispatch(AppEvent::SelectVoice(id));
    }

    /// Selects the previous voice in the catalog (stops at 0).
    pub fn select_previous(&mut self) {
        let catalog = self.state.voice().catalog();
        if catalog.is_empty() {
            return;
        }
        let previous = self
            .state
            .voice()
            .selected_index()
            .map_or(0, |index| index.saturating_sub(1));
        let id = catalog[previous].id.clone();
        self.dispatch(AppEvent::SelectVoice(id));
    }

    /// True when quitting would interrupt something the user cares about.
    pub fn has_work_in_progress(&self) -> bool {
        self.state.duty().is_active()
            || self.state.voice().is_synthesizing()
            || self.state.is_playing()
            || self.state.is_speaking()
    }

    fn sync_voice_list(&mut self) {
        self.voice_list.select(self.state.voice().selected_index());
    }
}
