//! Voice synthesis: catalog, requests, audio artifacts and the services
//! that produce them.
//!
//! Two backends exist:
//!
//! - [`ElevenLabsClient`](elevenlabs::ElevenLabsClient), the remote service.
//! - [`HostSpeech`](host::HostSpeech), the host's own synthesizer (`say` or
//!   `espeak-ng`), used as the offline fallback. It never touches the network.
//!
//! [`VoiceState`] holds everything the UI shows about voices and decides what
//! to do with completed requests.

pub mod elevenlabs;
pub mod host;
pub mod playback;
mod state;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::VoiceError;

pub use state::{REFETCH_MIN_KEY_LEN, RequestTag, SynthesisPlan, TextEdit, VoiceState};

/// Voice selected when the catalog cannot be loaded.
pub const STARTER_VOICE_ID: &str = "6AUOG2nbfr0yFEeI0784";

/// Display name of the starter voice.
pub const STARTER_VOICE_NAME: &str = "Rachel";

/// Category label of the starter voice.
pub const STARTER_VOICE_CATEGORY: &str = "Premium";

/// Category label for on-device voices.
pub const ON_DEVICE_CATEGORY: &str = "System Voice";

/// Where a catalog entry can be synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceSource {
    /// The remote synthesis service.
    Remote,
    /// The host's speech engine.
    OnDevice,
}

/// One selectable voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceCatalogEntry {
    /// Identifier sent to the backend.
    pub id: String,
    /// Name shown to the user.
    pub display_name: String,
    /// Free-form grouping label (`premade`, `cloned`, `System Voice`, ...).
    pub category: String,
    /// Which backend the voice belongs to.
    pub source: VoiceSource,
}

impl VoiceCatalogEntry {
    /// A remote voice.
    pub fn remote(
        id: impl Into<String>,
        display_name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category: category.into(),
            source: VoiceSource::Remote,
        }
    }

    /// The hard-coded entry used when the remote catalog is unavailable.
    ///
    /// ## Examples
    ///
    /// ```
    /// use vocalize_lib::voice::{VoiceCatalogEntry, STARTER_VOICE_ID};
    ///
    /// assert_eq!(VoiceCatalogEntry::starter().id, STARTER_VOICE_ID);
    /// ```
    pub fn starter() -> Self {
        Self::remote(STARTER_VOICE_ID, STARTER_VOICE_NAME, STARTER_VOICE_CATEGORY)
    }

    /// Builds an on-device entry from a host voice, tidying vendor prefixes
    /// out of the display name.
    pub fn on_device(voice: &host::HostVoice) -> Self {
        Self {
            id: voice.id.clone(),
            display_name: tidy_display_name(&voice.name),
            category: ON_DEVICE_CATEGORY.to_string(),
            source: VoiceSource::OnDevice,
        }
    }

    /// Returns true for on-device voices.
    pub fn is_on_device(&self) -> bool {
        self.source == VoiceSource::OnDevice
    }
}

fn tidy_display_name(name: &str) -> String {
    name.replacen("Google ", "", 1)
        .replacen("Microsoft ", "", 1)
        .trim()
        .to_string()
}

/// A validated "generate" action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    /// Text to speak. Never blank.
    pub text: String,
    /// Backend voice identifier.
    pub voice_id: String,
    /// Display name of the voice, carried through to the artifact.
    pub voice_name: String,
}

impl SynthesisRequest {
    /// Builds a request for `voice`.
    ///
    /// ## Errors
    ///
    /// Returns [`VoiceError::EmptyInput`] when `text` is blank.
    pub fn new(text: impl Into<String>, voice: &VoiceCatalogEntry) -> Result<Self, VoiceError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(VoiceError::EmptyInput);
        }
        Ok(Self {
            text,
            voice_id: voice.id.clone(),
            voice_name: voice.display_name.clone(),
        })
    }
}

/// Encoding of an [`AudioArtifact`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioFormat {
    /// MPEG-1 Layer III, what the remote service returns.
    #[default]
    Mp3,
}

impl AudioFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
        }
    }

    /// Value for the HTTP `Accept` header.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
        }
    }
}

/// The most recently generated audio, held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    /// Encoded audio.
    pub bytes: Vec<u8>,
    /// Encoding of `bytes`.
    pub format: AudioFormat,
    /// Display name of the voice that produced it.
    pub voice_name: String,
}

impl std::fmt::Debug for AudioArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioArtifact")
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .field("voice_name", &self.voice_name)
            .finish()
    }
}

impl AudioArtifact {
    /// File name used when the artifact is downloaded, e.g. `voice-Rachel.mp3`.
    ///
    /// Path separators in the voice name are replaced so the name can never
    /// escape the target directory.
    pub fn file_name(&self) -> String {
        let name: String = self
            .voice_name
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
            .collect();
        format!("voice-{name}.{}", self.format.extension())
    }
}

/// A remote text-to-speech backend.
///
/// Uses native async functions in traits, so implementations need no
/// `async-trait` shim.
pub trait VoiceService: Send + Sync {
    /// Fetches the voices available to `credential`.
    fn list_voices(
        &self,
        credential: &str,
    ) -> impl Future<Output = Result<Vec<VoiceCatalogEntry>, VoiceError>> + Send;

    /// Synthesizes `request` into audio.
    fn synthesize(
        &self,
        request: &SynthesisRequest,
        credential: &str,
    ) -> impl Future<Output = Result<AudioArtifact, VoiceError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_entry_is_rachel() {
        let starter = VoiceCatalogEntry::starter();
        assert_eq!(starter.id, "6AUOG2nbfr0yFEeI0784");
        assert_eq!(starter.display_name, "Rachel");
        assert_eq!(starter.category, "Premium");
        assert_eq!(starter.source, VoiceSource::Remote);
    }

    #[test]
    fn blank_text_is_rejected() {
        let voice = VoiceCatalogEntry::starter();
        for text in ["", "   ", "\n\t"] {
            assert!(matches!(
                SynthesisRequest::new(text, &voice),
                Err(VoiceError::EmptyInput)
            ));
        }
    }

    #[test]
    fn request_keeps_text_verbatim() {
        let voice = VoiceCatalogEntry::starter();
        let request = SynthesisRequest::new("  Hello  ", &voice).unwrap();
        assert_eq!(request.text, "  Hello  ");
        assert_eq!(request.voice_id, STARTER_VOICE_ID);
        assert_eq!(request.voice_name, "Rachel");
    }

    #[test]
    fn on_device_entries_strip_vendor_prefixes() {
        let voice = host::HostVoice {
            id: "Microsoft Zira".into(),
            name: "Microsoft Zira".into(),
            language: "en-US".into(),
        };
        let entry = VoiceCatalogEntry::on_device(&voice);
        assert_eq!(entry.id, "Microsoft Zira");
        assert_eq!(entry.display_name, "Zira");
        assert_eq!(entry.category, ON_DEVICE_CATEGORY);
        assert!(entry.is_on_device());

        assert_eq!(tidy_display_name("Google UK English Female"), "UK English Female");
    }

    #[test]
    fn artifact_file_name_uses_voice_name() {
        let artifact = AudioArtifact {
            bytes: vec![1, 2, 3],
            format: AudioFormat::Mp3,
            voice_name: "Rachel".into(),
        };
        assert_eq!(artifact.file_name(), "voice-Rachel.mp3");

        let sneaky = AudioArtifact {
            voice_name: "../etc/passwd".into(),
            ..artifact
        };
        assert_eq!(sneaky.file_name(), "voice-.._etc_passwd.mp3");
    }

    #[test]
    fn artifact_debug_hides_bytes() {
        let artifact = AudioArtifact {
            bytes: vec![0; 1024],
            format: AudioFormat::Mp3,
            voice_name: "Rachel".into(),
        };
        let debug = format!("{artifact:?}");
        assert!(debug.contains("len: 1024"));
        assert!(!debug.contains("0, 0"));
    }
}
