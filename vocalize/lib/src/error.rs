//! Error types for the vocalize library.

use thiserror::Error;

/// Errors raised by the voice-synthesis module.
///
/// Every variant is terminal for the action that produced it. Nothing is
/// retried automatically; the UI shows [`VoiceError::user_message`] and
/// leaves the rest of the application state untouched.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// The API key is missing or was rejected with HTTP 401.
    #[error("invalid or missing API key")]
    InvalidCredential,

    /// The API key is valid but lacks a required permission scope.
    #[error("API key is missing the '{scope}' permission")]
    PermissionDenied {
        /// The permission the service reported as missing (e.g. `voices_read`).
        scope: String,
    },

    /// The request never produced an HTTP response.
    #[error("network failure: {message}")]
    NetworkFailure {
        /// Transport-level error description.
        message: String,
    },

    /// The text buffer is empty; no request was made.
    #[error("no text to synthesize")]
    EmptyInput,

    /// The service answered with an error body we could decode.
    #[error("ElevenLabs error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The service's own message, shown verbatim.
        message: String,
    },

    /// The service answered with an error body we could not decode.
    #[error("request rejected with HTTP {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// No voice is selected.
    #[error("no voice selected")]
    NoVoiceSelected,

    /// The requested voice is not part of the loaded catalog.
    #[error("voice '{id}' is not in the current catalog")]
    UnknownVoice {
        /// The voice id that was requested.
        id: String,
    },

    /// A synthesis request is already in flight.
    #[error("a synthesis request is already in flight")]
    Busy,

    /// No on-device speech engine was found on this host.
    #[error("no on-device speech engine found (tried say, espeak-ng, espeak)")]
    NoHostSpeech,

    /// The on-device speech engine failed.
    #[error("{provider} failed: {message}")]
    SpeechFailed {
        /// The engine binary (`say`, `espeak-ng`, ...).
        provider: String,
        /// Captured stderr or spawn error.
        message: String,
    },

    /// No audio player capable of MP3 playback was found.
    #[error("no audio player found")]
    NoAudioPlayer,

    /// The audio player exited unsuccessfully.
    #[error("{player} failed: {stderr}")]
    PlaybackFailed {
        /// The player binary.
        player: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Local I/O failed (temp files, downloads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// Returns the message shown to the user for this error.
    ///
    /// ## Examples
    ///
    /// ```
    /// use vocalize_lib::VoiceError;
    ///
    /// let err = VoiceError::Api { status: 400, message: "Text too long".into() };
    /// assert_eq!(err.user_message(), "Text too long");
    /// ```
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredential => {
                "Invalid API Key. Please check your ElevenLabs settings.".to_string()
            }
            Self::PermissionDenied { scope } => format!(
                "API Key missing '{scope}' permission. Grant it in your ElevenLabs key settings or switch to on-device voices."
            ),
            Self::NetworkFailure { .. } => {
                "Could not reach ElevenLabs. Check your connection and try again.".to_string()
            }
            Self::EmptyInput => "Please enter some text.".to_string(),
            Self::Api { message, .. } => message.clone(),
            Self::Rejected { .. } => "Generation failed.".to_string(),
            Self::NoVoiceSelected => "Please select a voice.".to_string(),
            Self::UnknownVoice { id } => format!("Voice '{id}' is not available."),
            Self::Busy => "Still generating, please wait.".to_string(),
            other => other.to_string(),
        }
    }

    /// Returns the message shown next to the voice list when loading the
    /// catalog failed.
    ///
    /// Generic rejections name the catalog instead of generation; every
    /// other kind reads the same as [`VoiceError::user_message`].
    ///
    /// ## Examples
    ///
    /// ```
    /// use vocalize_lib::VoiceError;
    ///
    /// let err = VoiceError::Rejected { status: 500 };
    /// assert_eq!(err.catalog_message(), "Could not fetch voice list.");
    /// ```
    pub fn catalog_message(&self) -> String {
        match self {
            Self::Rejected { .. } => "Could not fetch voice list.".to_string(),
            other => other.user_message(),
        }
    }

    /// Returns true when switching to on-device voices is a sensible remedy.
    pub fn suggests_on_device(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::NetworkFailure { .. } | Self::InvalidCredential
        )
    }
}

/// Errors raised by the duty timer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShiftError {
    /// The shift configuration cannot produce a logout time.
    #[error("invalid shift config: {0}")]
    InvalidConfig(String),

    /// `start` was called while a session is running.
    #[error("a shift is already running")]
    AlreadyActive,

    /// `end` was called with no running session.
    #[error("no shift is running")]
    NotActive,
}

/// Errors that can occur when reading or writing persisted settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read or write the settings file.
    #[error("failed to access settings: {0}")]
    Read(#[from] std::io::Error),

    /// The settings file is not valid JSON.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// Failed to acquire a file lock.
    #[error("failed to acquire lock")]
    Lock,
}
