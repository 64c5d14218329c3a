//! Application state and its single transition function.
//!
//! The event loop owns one [`AppState`] and feeds it [`AppEvent`]s: key
//! presses translated by the UI, clock ticks, and completions of work it
//! started earlier. [`AppState::handle`] mutates the state and returns the
//! [`Effect`]s the loop must perform. Effects never run here, which keeps
//! every transition testable without a terminal, a network or a speaker.

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::duty::{ALERT_MESSAGE, DutyPhase, DutyTimer, ShiftConfig, TickOutcome};
use crate::error::VoiceError;
use crate::settings::Settings;
use crate::voice::host::HostVoice;
use crate::voice::{
    AudioArtifact, RequestTag, SynthesisPlan, SynthesisRequest, TextEdit, VoiceCatalogEntry,
    VoiceState,
};

/// Something that happened.
#[derive(Debug)]
pub enum AppEvent {
    /// One clock tick with the current local time.
    Tick(NaiveDateTime),

    /// Start a shift with the current config.
    StartShift,
    /// End the running shift.
    EndShift,
    /// Replace the shift config.
    ConfigureShift(ShiftConfig),

    /// The user entered an API key.
    SetCredential(String),
    /// The user edited the text buffer.
    EditText(TextEdit),
    /// The user picked a voice.
    SelectVoice(String),
    /// Reload the remote catalog.
    RefreshCatalog,
    /// A catalog fetch finished.
    CatalogLoaded {
        /// Tag issued when the fetch started.
        tag: RequestTag,
        /// The fetch result.
        result: Result<Vec<VoiceCatalogEntry>, VoiceError>,
    },
    /// Switch to on-device voices.
    UseOnDevice,
    /// Host voice enumeration finished.
    HostVoicesLoaded(Result<Vec<HostVoice>, VoiceError>),

    /// Generate (or, on device, speak) the text buffer.
    Generate,
    /// A remote synthesis finished.
    SynthesisFinished {
        /// Tag issued when the request started.
        tag: RequestTag,
        /// The synthesis result.
        result: Result<AudioArtifact, VoiceError>,
    },
    /// On-device speech of the text buffer finished.
    SpeechFinished {
        /// Tag carried by the [`Effect::Speak`] that started it.
        tag: RequestTag,
        /// The speech result.
        result: Result<(), VoiceError>,
    },
    /// Play/pause the artifact, or stop on-device speech.
    TogglePlayback,
    /// Playback ran to the end.
    PlaybackFinished {
        /// Tag carried by the [`Effect::Play`] that started it.
        tag: RequestTag,
        /// The playback result.
        result: Result<(), VoiceError>,
    },
    /// Save the artifact to the download directory.
    Download,
    /// Saving finished.
    Downloaded(Result<PathBuf, VoiceError>),

    /// The spoken shift alert finished.
    AlertSpoken(Result<(), VoiceError>),
    /// Close the front notice.
    DismissNotice,
}

/// Work the event loop must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the remote catalog; answer with [`AppEvent::CatalogLoaded`].
    FetchCatalog {
        /// Tag to echo back.
        tag: RequestTag,
        /// API key to send.
        credential: String,
    },
    /// Enumerate host voices; answer with [`AppEvent::HostVoicesLoaded`].
    ListHostVoices,
    /// Synthesize remotely; answer with [`AppEvent::SynthesisFinished`].
    Synthesize {
        /// Tag to echo back.
        tag: RequestTag,
        /// The request.
        request: SynthesisRequest,
        /// API key to send.
        credential: String,
    },
    /// Speak on device; answer with [`AppEvent::SpeechFinished`].
    Speak {
        /// Tag to echo back.
        tag: RequestTag,
        /// Text to speak.
        text: String,
        /// Host voice id.
        voice_id: Option<String>,
    },
    /// Cancel on-device speech started by [`Effect::Speak`].
    StopSpeech,
    /// Speak a fixed announcement; answer with [`AppEvent::AlertSpoken`].
    Announce(String),
    /// Play audio; answer with [`AppEvent::PlaybackFinished`].
    Play {
        /// Tag to echo back.
        tag: RequestTag,
        /// The audio.
        artifact: AudioArtifact,
    },
    /// Cancel playback started by [`Effect::Play`]. No completion follows.
    StopPlayback,
    /// Save audio; answer with [`AppEvent::Downloaded`].
    Save(AudioArtifact),
    /// Write the settings store.
    Persist(Settings),
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something was refused.
    Warning,
    /// Something failed.
    Error,
}

/// A message shown to the user until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Short heading.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Whether to offer switching to on-device voices.
    pub offer_on_device: bool,
}

impl Notice {
    fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            offer_on_device: false,
        }
    }

    fn from_voice_error(title: &str, err: &VoiceError) -> Self {
        let level = match err {
            VoiceError::EmptyInput | VoiceError::Busy | VoiceError::NoVoiceSelected => {
                NoticeLevel::Warning
            }
            _ => NoticeLevel::Error,
        };
        Self {
            offer_on_device: err.suggests_on_device(),
            ..Self::new(level, title, err.user_message())
        }
    }
}

/// Inputs for [`AppState::new`].
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    /// API key to start with (may be empty).
    pub credential: String,
    /// Voice id picked in a previous run.
    pub remembered_voice: Option<String>,
    /// Initial shift config.
    pub shift: ShiftConfig,
}

/// Everything the UI shows, owned by the event loop.
#[derive(Debug)]
pub struct AppState {
    now: NaiveDateTime,
    duty: DutyTimer,
    shift_config: ShiftConfig,
    voice: VoiceState,
    notices: VecDeque<Notice>,
    playback: Option<RequestTag>,
    speech: Option<RequestTag>,
}

impl AppState {
    /// Creates the state at `now`.
    pub fn new(config: StartupConfig, now: NaiveDateTime) -> Self {
        Self {
            now,
            duty: DutyTimer::new(),
            shift_config: config.shift,
            voice: VoiceState::new(config.credential, config.remembered_voice),
            notices: VecDeque::new(),
            playback: None,
            speech: None,
        }
    }

    /// Effects to run once at startup: the initial catalog fetch.
    pub fn startup(&mut self) -> Vec<Effect> {
        vec![self.fetch_catalog()]
    }

    // Accessors

    /// Time of the latest tick.
    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// The shift timer.
    pub fn duty(&self) -> &DutyTimer {
        &self.duty
    }

    /// The shift config used by the next start.
    pub fn shift_config(&self) -> &ShiftConfig {
        &self.shift_config
    }

    /// Voice state.
    pub fn voice(&self) -> &VoiceState {
        &self.voice
    }

    /// The notice to show, if any.
    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    /// True while audio is playing.
    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    /// True while on-device speech of the text buffer is running.
    pub fn is_speaking(&self) -> bool {
        self.speech.is_some()
    }

    /// Countdown text at the latest tick.
    pub fn countdown(&self) -> String {
        self.duty.countdown(self.now)
    }

    /// True once the two-minute alert has fired for the running shift.
    pub fn alert_active(&self) -> bool {
        self.duty.phase() == DutyPhase::Alerted
    }

    /// Applies one event and returns the effects to perform.
    pub fn handle(&mut self, event: AppEvent) -> Vec<Effect> {
        match event {
            AppEvent::Tick(now) => self.on_tick(now),

            AppEvent::StartShift => {
                if let Err(err) = self.duty.start(&self.shift_config, self.now) {
                    self.push_notice(Notice::new(
                        NoticeLevel::Warning,
                        "Cannot start shift",
                        capitalize(&err.to_string()),
                    ));
                }
                Vec::new()
            }
            AppEvent::EndShift => {
                if let Err(err) = self.duty.end() {
                    debug!(error = %err, "End shift ignored");
                }
                Vec::new()
            }
            AppEvent::ConfigureShift(config) => {
                match config.validate() {
                    Ok(()) => self.shift_config = config,
                    Err(err) => self.push_notice(Notice::new(
                        NoticeLevel::Warning,
                        "Shift settings not saved",
                        capitalize(&err.to_string()),
                    )),
                }
                Vec::new()
            }

            AppEvent::SetCredential(key) => {
                let refetch = self.voice.set_credential(key);
                let mut effects = vec![Effect::Persist(self.settings())];
                if refetch {
                    effects.push(self.fetch_catalog());
                }
                effects
            }
            AppEvent::EditText(edit) => {
                self.voice.edit_text(edit);
                Vec::new()
            }
            AppEvent::SelectVoice(id) => {
                let persist = match self.voice.select_voice(&id) {
                    Ok(voice) => !voice.is_on_device(),
                    Err(err) => {
                        self.push_notice(Notice::from_voice_error("Voice unavailable", &err));
                        false
                    }
                };
                if persist {
                    vec![Effect::Persist(self.settings())]
                } else {
                    Vec::new()
                }
            }
            AppEvent::RefreshCatalog => vec![self.fetch_catalog()],
            AppEvent::CatalogLoaded { tag, result } => {
                // Failures are shown inline next to the voice list.
                self.voice.apply_catalog(tag, result);
                Vec::new()
            }
            AppEvent::UseOnDevice => vec![Effect::ListHostVoices],
            AppEvent::HostVoicesLoaded(result) => {
                match result {
                    Ok(voices) => {
                        self.voice.use_on_device(&voices);
                        if self.voice.catalog().is_empty() {
                            self.push_notice(Notice::new(
                                NoticeLevel::Warning,
                                "On-device voices",
                                "No English voices were found on this device.",
                            ));
                        }
                    }
                    Err(err) => {
                        self.push_notice(Notice::from_voice_error("On-device voices", &err))
                    }
                }
                Vec::new()
            }

            AppEvent::Generate => self.on_generate(),
            AppEvent::SynthesisFinished { tag, result } => {
                if let Some(Err(err)) = self.voice.apply_synthesis(tag, result) {
                    self.push_notice(Notice::from_voice_error("Generation failed", &err));
                }
                Vec::new()
            }
            AppEvent::SpeechFinished { tag, result } => {
                if self.speech != Some(tag) {
                    debug!(tag = tag.value(), "Ignoring stale speech completion");
                    return Vec::new();
                }
                self.speech = None;
                if let Err(err) = result {
                    self.push_notice(Notice::from_voice_error("On-device speech failed", &err));
                }
                Vec::new()
            }
            AppEvent::TogglePlayback => self.on_toggle_playback(),
            AppEvent::PlaybackFinished { tag, result } => {
                if self.playback != Some(tag) {
                    debug!(tag = tag.value(), "Ignoring stale playback completion");
                    return Vec::new();
                }
                self.playback = None;
                if let Err(err) = result {
                    self.push_notice(Notice::from_voice_error("Playback failed", &err));
                }
                Vec::new()
            }
            AppEvent::Download => match self.voice.artifact() {
                Some(artifact) => vec![Effect::Save(artifact.clone())],
                None => {
                    self.push_notice(Notice::new(
                        NoticeLevel::Warning,
                        "Nothing to download",
                        "Generate speech first.",
                    ));
                    Vec::new()
                }
            },
            AppEvent::Downloaded(result) => {
                match result {
                    Ok(path) => self.push_notice(Notice::new(
                        NoticeLevel::Info,
                        "Saved",
                        format!("Audio saved to {}", path.display()),
                    )),
                    Err(err) => self.push_notice(Notice::from_voice_error("Download failed", &err)),
                }
                Vec::new()
            }

            AppEvent::AlertSpoken(result) => {
                if let Err(err) = result {
                    warn!(error = %err, "Shift alert could not be spoken");
                }
                Vec::new()
            }
            AppEvent::DismissNotice => {
                self.notices.pop_front();
                Vec::new()
            }
        }
    }

    fn on_tick(&mut self, now: NaiveDateTime) -> Vec<Effect> {
        self.now = now;
        match self.duty.tick(now) {
            TickOutcome::Unchanged => Vec::new(),
            TickOutcome::Alert => vec![Effect::Announce(ALERT_MESSAGE.to_string())],
            TickOutcome::Completed(session) => {
                self.push_notice(Notice::new(
                    NoticeLevel::Info,
                    "Shift complete",
                    format!(
                        "Your shift ended at {}. You have been logged out.",
                        session.logout_at.format("%H:%M")
                    ),
                ));
                Vec::new()
            }
        }
    }

    fn on_generate(&mut self) -> Vec<Effect> {
        if self.voice.is_loading_catalog() {
            self.push_notice(Notice::new(
                NoticeLevel::Warning,
                "Please wait",
                "Voices are still loading.",
            ));
            return Vec::new();
        }

        match self.voice.begin_synthesis() {
            Ok(SynthesisPlan::Remote {
                tag,
                request,
                credential,
            }) => {
                let mut effects = Vec::new();
                if self.playback.take().is_some() {
                    effects.push(Effect::StopPlayback);
                }
                effects.push(Effect::Synthesize {
                    tag,
                    request,
                    credential,
                });
                effects
            }
            Ok(SynthesisPlan::OnDevice { text, voice_id }) => {
                let tag = self.voice.issue_tag();
                self.speech = Some(tag);
                vec![
                    Effect::StopSpeech,
                    Effect::Speak {
                        tag,
                        text,
                        voice_id,
                    },
                ]
            }
            Err(err) => {
                self.push_notice(Notice::from_voice_error("Cannot generate", &err));
                Vec::new()
            }
        }
    }

    fn on_toggle_playback(&mut self) -> Vec<Effect> {
        if self.speech.take().is_some() {
            return vec![Effect::StopSpeech];
        }
        if self.playback.take().is_some() {
            return vec![Effect::StopPlayback];
        }
        if self.voice.is_on_device() {
            return Vec::new();
        }
        match self.voice.artifact().cloned() {
            Some(artifact) => {
                let tag = self.voice.issue_tag();
                self.playback = Some(tag);
                vec![Effect::Play { tag, artifact }]
            }
            None => Vec::new(),
        }
    }

    fn fetch_catalog(&mut self) -> Effect {
        let tag = self.voice.begin_catalog_fetch();
        Effect::FetchCatalog {
            tag,
            credential: self.voice.credential().to_string(),
        }
    }

    fn settings(&self) -> Settings {
        let credential = self.voice.credential();
        Settings {
            api_key: (!credential.is_empty()).then(|| credential.to_string()),
            voice_id: self.voice.remembered_voice().map(str::to_string),
        }
    }

    fn push_notice(&mut self, notice: Notice) {
        debug!(title = %notice.title, message = %notice.message, "Notice");
        self.notices.push_back(notice);
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{AudioFormat, STARTER_VOICE_ID};
    use chrono::NaiveDate;

    const KEY: &str = "sk_1ddb09f1b42c13fa43bbf08761d59839c3a8";

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn state() -> AppState {
        AppState::new(
            StartupConfig {
                credential: KEY.into(),
                remembered_voice: None,
                shift: ShiftConfig::fixed_duration(8.0),
            },
            at(9, 0, 0),
        )
    }

    fn catalog_tag(effects: &[Effect]) -> RequestTag {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::FetchCatalog { tag, .. } => Some(*tag),
                _ => None,
            })
            .expect("catalog fetch effect")
    }

    fn type_text(state: &mut AppState, text: &str) {
        state.handle(AppEvent::EditText(TextEdit::InsertStr(text.into())));
    }

    fn generate_remote(state: &mut AppState) -> RequestTag {
        let effects = state.handle(AppEvent::Generate);
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Synthesize { tag, .. } => Some(*tag),
                _ => None,
            })
            .expect("synthesize effect")
    }

    fn artifact() -> AudioArtifact {
        AudioArtifact {
            bytes: vec![0xFF, 0xFB],
            format: AudioFormat::Mp3,
            voice_name: "Rachel".into(),
        }
    }

    #[test]
    fn startup_fetches_catalog_with_credential() {
        let mut state = state();
        let effects = state.startup();
        assert!(matches!(
            &effects[..],
            [Effect::FetchCatalog { credential, .. }] if credential == KEY
        ));
        assert!(state.voice().is_loading_catalog());
    }

    #[test]
    fn eight_hour_shift_alerts_once_and_logs_out() {
        let mut state = state();
        state.handle(AppEvent::StartShift);
        assert_eq!(state.countdown(), "08:00:00");

        let mut announcements = 0;
        for now in [at(16, 58, 30), at(16, 58, 31), at(16, 59, 59)] {
            for effect in state.handle(AppEvent::Tick(now)) {
                if let Effect::Announce(message) = effect {
                    assert_eq!(message, ALERT_MESSAGE);
                    announcements += 1;
                }
            }
            if now == at(16, 58, 30) {
                assert_eq!(state.countdown(), "00:01:30");
                assert!(state.alert_active());
            }
        }
        assert_eq!(announcements, 1);
        assert!(state.notice().is_none());

        state.handle(AppEvent::Tick(at(17, 0, 0)));
        assert!(!state.duty().is_active());
        assert!(!state.alert_active());
        assert_eq!(state.notice().unwrap().title, "Shift complete");
        assert!(state.notice().unwrap().message.contains("17:00"));
    }

    #[test]
    fn invalid_shift_config_is_refused_with_notice() {
        let mut state = state();
        state.handle(AppEvent::ConfigureShift(ShiftConfig::fixed_duration(0.0)));
        assert_eq!(state.shift_config(), &ShiftConfig::fixed_duration(8.0));
        assert_eq!(state.notice().unwrap().level, NoticeLevel::Warning);
    }

    #[test]
    fn start_while_running_is_refused() {
        let mut state = state();
        state.handle(AppEvent::StartShift);
        state.handle(AppEvent::StartShift);
        let notice = state.notice().unwrap();
        assert_eq!(notice.title, "Cannot start shift");
        assert_eq!(notice.message, "A shift is already running");
    }

    #[test]
    fn end_shift_returns_to_idle_and_rearms_alert() {
        let mut state = state();
        state.handle(AppEvent::StartShift);
        state.handle(AppEvent::Tick(at(16, 59, 0)));
        assert!(state.alert_active());

        state.handle(AppEvent::EndShift);
        assert!(!state.duty().is_active());
        assert_eq!(state.countdown(), "--:--:--");

        state.handle(AppEvent::StartShift);
        let effects = state.handle(AppEvent::Tick(at(16, 58, 0) + chrono::TimeDelta::hours(8)));
        assert!(effects.contains(&Effect::Announce(ALERT_MESSAGE.to_string())));
    }

    #[test]
    fn catalog_401_falls_back_to_starter_voice() {
        let mut state = state();
        let tag = catalog_tag(&state.startup());

        state.handle(AppEvent::CatalogLoaded {
            tag,
            result: Err(VoiceError::InvalidCredential),
        });

        let voice = state.voice();
        assert_eq!(voice.catalog().len(), 1);
        assert_eq!(voice.selected().unwrap().id, STARTER_VOICE_ID);
        assert_eq!(
            voice.catalog_error().unwrap().user_message(),
            "Invalid API Key. Please check your ElevenLabs settings."
        );
    }

    #[test]
    fn stale_catalog_completion_is_ignored() {
        let mut state = state();
        let first = catalog_tag(&state.startup());
        let second = catalog_tag(&state.handle(AppEvent::RefreshCatalog));

        state.handle(AppEvent::CatalogLoaded {
            tag: second,
            result: Ok(vec![VoiceCatalogEntry::remote("new", "New", "premade")]),
        });
        state.handle(AppEvent::CatalogLoaded {
            tag: first,
            result: Err(VoiceError::InvalidCredential),
        });

        assert_eq!(state.voice().selected().unwrap().id, "new");
        assert!(state.voice().catalog_error().is_none());
    }

    #[test]
    fn long_credential_persists_and_refetches() {
        let mut state = state();
        let long_key = format!("{KEY}x");
        let effects = state.handle(AppEvent::SetCredential(long_key.clone()));
        assert!(matches!(&effects[0], Effect::Persist(s) if s.api_key.as_deref() == Some(long_key.as_str())));
        assert!(matches!(effects[1], Effect::FetchCatalog { .. }));

        let effects = state.handle(AppEvent::SetCredential("short".into()));
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn selecting_a_voice_persists_it() {
        let mut state = state();
        let tag = catalog_tag(&state.startup());
        state.handle(AppEvent::CatalogLoaded {
            tag,
            result: Ok(vec![
                VoiceCatalogEntry::remote("a", "A", "premade"),
                VoiceCatalogEntry::remote("b", "B", "premade"),
            ]),
        });

        let effects = state.handle(AppEvent::SelectVoice("b".into()));
        assert!(matches!(&effects[..], [Effect::Persist(s)] if s.voice_id.as_deref() == Some("b")));

        let effects = state.handle(AppEvent::SelectVoice("nope".into()));
        assert!(effects.is_empty());
        assert_eq!(state.notice().unwrap().title, "Voice unavailable");
    }

    #[test]
    fn generate_with_empty_text_makes_no_request() {
        let mut state = state();
        let tag = catalog_tag(&state.startup());
        state.handle(AppEvent::CatalogLoaded { tag, result: Ok(Vec::new()) });

        let effects = state.handle(AppEvent::Generate);
        assert!(effects.is_empty());
        assert_eq!(state.notice().unwrap().message, "Please enter some text.");
    }

    #[test]
    fn generate_waits_for_catalog() {
        let mut state = state();
        state.startup();
        type_text(&mut state, "Hello");
        assert!(state.handle(AppEvent::Generate).is_empty());
        assert_eq!(state.notice().unwrap().title, "Please wait");
    }

    #[test]
    fn generate_then_play_then_download() {
        let mut state = state();
        let tag = catalog_tag(&state.startup());
        state.handle(AppEvent::CatalogLoaded { tag, result: Ok(Vec::new()) });
        type_text(&mut state, "Hello world");

        let tag = generate_remote(&mut state);
        assert!(state.voice().is_synthesizing());
        state.handle(AppEvent::SynthesisFinished {
            tag,
            result: Ok(artifact()),
        });

        assert!(matches!(
            &state.handle(AppEvent::TogglePlayback)[..],
            [Effect::Play { artifact: played, .. }] if *played == artifact()
        ));
        assert!(state.is_playing());
        assert_eq!(state.handle(AppEvent::TogglePlayback), vec![Effect::StopPlayback]);
        assert!(!state.is_playing());

        assert_eq!(state.handle(AppEvent::Download), vec![Effect::Save(artifact())]);
        state.handle(AppEvent::Downloaded(Ok(PathBuf::from("/tmp/voice-Rachel.mp3"))));
        assert!(state.notice().unwrap().message.contains("voice-Rachel.mp3"));
    }

    #[test]
    fn generate_while_playing_stops_playback_first() {
        let mut state = state();
        let tag = catalog_tag(&state.startup());
        state.handle(AppEvent::CatalogLoaded { tag, result: Ok(Vec::new()) });
        type_text(&mut state, "Hello");

        let tag = generate_remote(&mut state);
        state.handle(AppEvent::SynthesisFinished { tag, result: Ok(artifact()) });
        state.handle(AppEvent::TogglePlayback);

        let effects = state.handle(AppEvent::Generate);
        assert_eq!(effects[0], Effect::StopPlayback);
        assert!(state.voice().artifact().is_none());
    }

    #[test]
    fn synthesis_error_shows_service_message() {
        let mut state = state();
        let tag = catalog_tag(&state.startup());
        state.handle(AppEvent::CatalogLoaded { tag, result: Ok(Vec::new()) });
        type_text(&mut state, "Hello");

        let tag = generate_remote(&mut state);
        state.handle(AppEvent::SynthesisFinished {
            tag,
            result: Err(VoiceError::Api {
                status: 400,
                message: "Text is too long".into(),
            }),
        });

        let notice = state.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Text is too long");
        assert!(!notice.offer_on_device);
    }

    #[test]
    fn permission_error_offers_on_device_switch() {
        let mut state = state();
        let tag = catalog_tag(&state.startup());
        state.handle(AppEvent::CatalogLoaded { tag, result: Ok(Vec::new()) });
        type_text(&mut state, "Hello");

        let tag = generate_remote(&mut state);
        state.handle(AppEvent::SynthesisFinished {
            tag,
            result: Err(VoiceError::PermissionDenied {
                scope: "text_to_speech".into(),
            }),
        });
        assert!(state.notice().unwrap().offer_on_device);

        state.handle(AppEvent::DismissNotice);
        assert!(state.notice().is_none());
    }

    #[test]
    fn on_device_flow_speaks_locally_and_can_be_stopped() {
        let mut state = AppState::new(StartupConfig::default(), at(9, 0, 0));
        assert_eq!(state.handle(AppEvent::UseOnDevice), vec![Effect::ListHostVoices]);

        state.handle(AppEvent::HostVoicesLoaded(Ok(vec![HostVoice {
            id: "Samantha".into(),
            name: "Samantha".into(),
            language: "en_US".into(),
        }])));
        assert!(state.voice().is_on_device());
        type_text(&mut state, "Hi there");

        let effects = state.handle(AppEvent::Generate);
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0], Effect::StopSpeech);
        assert!(matches!(
            &effects[1],
            Effect::Speak { text, voice_id, .. }
                if text == "Hi there" && voice_id.as_deref() == Some("Samantha")
        ));
        assert!(state.is_speaking());

        assert_eq!(state.handle(AppEvent::TogglePlayback), vec![Effect::StopSpeech]);
        assert!(!state.is_speaking());
    }

    #[test]
    fn missing_host_engine_is_reported() {
        let mut state = state();
        state.handle(AppEvent::HostVoicesLoaded(Err(VoiceError::NoHostSpeech)));
        assert_eq!(state.notice().unwrap().level, NoticeLevel::Error);
        assert!(!state.voice().is_on_device());
    }

    #[test]
    fn notices_queue_in_order() {
        let mut state = state();
        state.handle(AppEvent::Download);
        state.handle(AppEvent::EndShift);
        state.handle(AppEvent::HostVoicesLoaded(Err(VoiceError::NoHostSpeech)));

        assert_eq!(state.notice().unwrap().title, "Nothing to download");
        state.handle(AppEvent::DismissNotice);
        assert_eq!(state.notice().unwrap().title, "On-device voices");
    }

    fn play_tag(effects: &[Effect]) -> RequestTag {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Play { tag, .. } => Some(*tag),
                _ => None,
            })
            .expect("play effect")
    }

    #[test]
    fn completion_of_stopped_playback_is_ignored() {
        let mut state = state();
        let tag = catalog_tag(&state.startup());
        state.handle(AppEvent::CatalogLoaded { tag, result: Ok(Vec::new()) });
        type_text(&mut state, "Hello");
        let tag = generate_remote(&mut state);
        state.handle(AppEvent::SynthesisFinished { tag, result: Ok(artifact()) });

        let first = play_tag(&state.handle(AppEvent::TogglePlayback));
        state.handle(AppEvent::TogglePlayback);
        let second = play_tag(&state.handle(AppEvent::TogglePlayback));
        assert_ne!(first, second);

        // The first player finished just before it was stopped.
        state.handle(AppEvent::PlaybackFinished {
            tag: first,
            result: Err(VoiceError::NoAudioPlayer),
        });
        assert!(state.is_playing());
        assert!(state.notice().is_none());

        state.handle(AppEvent::PlaybackFinished {
            tag: second,
            result: Ok(()),
        });
        assert!(!state.is_playing());
    }

    #[test]
    fn playback_failure_is_reported() {
        let mut state = state();
        let tag = catalog_tag(&state.startup());
        state.handle(AppEvent::CatalogLoaded { tag, result: Ok(Vec::new()) });
        type_text(&mut state, "Hello");
        let tag = generate_remote(&mut state);
        state.handle(AppEvent::SynthesisFinished { tag, result: Ok(artifact()) });

        let tag = play_tag(&state.handle(AppEvent::TogglePlayback));
        state.handle(AppEvent::PlaybackFinished {
            tag,
            result: Err(VoiceError::NoAudioPlayer),
        });
        assert!(!state.is_playing());
        assert_eq!(state.notice().unwrap().title, "Playback failed");
    }

    #[test]
    fn completion_of_replaced_speech_is_ignored() {
        let mut state = AppState::new(StartupConfig::default(), at(9, 0, 0));
        state.handle(AppEvent::HostVoicesLoaded(Ok(vec![HostVoice {
            id: "Samantha".into(),
            name: "Samantha".into(),
            language: "en_US".into(),
        }])));
        type_text(&mut state, "Hi there");

        let speak_tag = |effects: Vec<Effect>| {
            effects
                .into_iter()
                .find_map(|effect| match effect {
                    Effect::Speak { tag, .. } => Some(tag),
                    _ => None,
                })
                .expect("speak effect")
        };
        let first = speak_tag(state.handle(AppEvent::Generate));
        let second = speak_tag(state.handle(AppEvent::Generate));

        state.handle(AppEvent::SpeechFinished {
            tag: first,
            result: Ok(()),
        });
        assert!(state.is_speaking());

        state.handle(AppEvent::SpeechFinished {
            tag: second,
            result: Ok(()),
        });
        assert!(!state.is_speaking());
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("no shift"), "No shift");
        assert_eq!(capitalize(""), "");
    }
}
