//! What the UI knows about voices, and how completed requests change it.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::VoiceError;
use crate::voice::host::HostVoice;
use crate::voice::{AudioArtifact, STARTER_VOICE_ID, SynthesisRequest, VoiceCatalogEntry};

/// Credentials longer than this trigger a catalog refresh when entered.
pub const REFETCH_MIN_KEY_LEN: usize = 30;

/// Identifies one outstanding request. Completions carrying any tag other
/// than the latest one issued for their kind are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTag(u64);

impl RequestTag {
    /// Raw value, for logging.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A single edit to the text buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
    /// Append a character.
    Insert(char),
    /// Append a string (paste).
    InsertStr(String),
    /// Remove the last character.
    Backspace,
    /// Empty the buffer.
    Clear,
}

/// What `begin_synthesis` decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisPlan {
    /// Call the remote service.
    Remote {
        /// Tag for the completion.
        tag: RequestTag,
        /// The validated request.
        request: SynthesisRequest,
        /// API key to send.
        credential: String,
    },
    /// Speak locally with the host engine.
    OnDevice {
        /// Text to speak.
        text: String,
        /// Host voice id, if one is selected.
        voice_id: Option<String>,
    },
}

/// Voice-synthesis state.
#[derive(Debug)]
pub struct VoiceState {
    credential: String,
    catalog: Vec<VoiceCatalogEntry>,
    selected: Option<usize>,
    remembered_voice: Option<String>,
    text: String,
    artifact: Option<AudioArtifact>,
    on_device: bool,
    catalog_error: Option<VoiceError>,
    next_tag: u64,
    catalog_tag: Option<RequestTag>,
    synthesis_tag: Option<RequestTag>,
}

impl Default for VoiceState {
    fn default() -> Self {
        Self::new(String::new(), None)
    }
}

impl VoiceState {
    /// Starts with the starter voice selected, as before any fetch.
    pub fn new(credential: String, remembered_voice: Option<String>) -> Self {
        Self {
            credential,
            catalog: vec![VoiceCatalogEntry::starter()],
            selected: Some(0),
            remembered_voice,
            text: String::new(),
            artifact: None,
            on_device: false,
            catalog_error: None,
            next_tag: 0,
            catalog_tag: None,
            synthesis_tag: None,
        }
    }

    /// Issues a fresh tag. Tags for every kind of request share one counter.
    pub(crate) fn issue_tag(&mut self) -> RequestTag {
        self.next_tag += 1;
        RequestTag(self.next_tag)
    }

    // Accessors

    /// The API key, possibly empty.
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// The API key with all but its ends hidden.
    pub fn masked_credential(&self) -> String {
        let chars: Vec<char> = self.credential.chars().collect();
        match chars.len() {
            0 => "not set".to_string(),
            n if n <= 12 => "•".repeat(n),
            n => {
                let head: String = chars[..4].iter().collect();
                let tail: String = chars[n - 4..].iter().collect();
                format!("{head}…{tail}")
            }
        }
    }

    /// The loaded catalog. Never empty unless on-device mode found no voices.
    pub fn catalog(&self) -> &[VoiceCatalogEntry] {
        &self.catalog
    }

    /// The selected voice.
    pub fn selected(&self) -> Option<&VoiceCatalogEntry> {
        self.selected.and_then(|i| self.catalog.get(i))
    }

    /// Index of the selected voice within the catalog.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// The voice id the user last picked, persisted across restarts.
    pub fn remembered_voice(&self) -> Option<&str> {
        self.remembered_voice.as_deref()
    }

    /// The text buffer.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The latest generated audio.
    pub fn artifact(&self) -> Option<&AudioArtifact> {
        self.artifact.as_ref()
    }

    /// True while the catalog shows host voices.
    pub fn is_on_device(&self) -> bool {
        self.on_device
    }

    /// The error from the last catalog fetch, for inline display.
    pub fn catalog_error(&self) -> Option<&VoiceError> {
        self.catalog_error.as_ref()
    }

    /// True while a catalog fetch is outstanding.
    pub fn is_loading_catalog(&self) -> bool {
        self.catalog_tag.is_some()
    }

    /// True while a synthesis request is outstanding.
    pub fn is_synthesizing(&self) -> bool {
        self.synthesis_tag.is_some()
    }

    // Mutations

    /// Replaces the API key. Returns true when the key is long enough to be
    /// worth fetching the catalog with.
    pub fn set_credential(&mut self, key: impl Into<String>) -> bool {
        self.credential = key.into().trim().to_string();
        self.credential.chars().count() > REFETCH_MIN_KEY_LEN
    }

    /// Applies one edit to the text buffer.
    pub fn edit_text(&mut self, edit: TextEdit) {
        match edit {
            TextEdit::Insert(c) => self.text.push(c),
            TextEdit::InsertStr(s) => self.text.push_str(&s),
            TextEdit::Backspace => {
                self.text.pop();
            }
            TextEdit::Clear => self.text.clear(),
        }
    }

    /// Selects a voice from the current catalog and remembers it.
    ///
    /// ## Errors
    ///
    /// Returns [`VoiceError::UnknownVoice`] if `id` is not in the catalog.
    pub fn select_voice(&mut self, id: &str) -> Result<&VoiceCatalogEntry, VoiceError> {
        let index = self
            .catalog
            .iter()
            .position(|voice| voice.id == id)
            .ok_or_else(|| VoiceError::UnknownVoice { id: id.to_string() })?;

        self.selected = Some(index);
        if !self.on_device {
            self.remembered_voice = Some(id.to_string());
        }
        Ok(&self.catalog[index])
    }

    /// Starts a catalog fetch: returns the tag its completion must carry.
    ///
    /// Leaves on-device mode and clears the previous error.
    pub fn begin_catalog_fetch(&mut self) -> RequestTag {
        let tag = self.issue_tag();
        self.catalog_tag = Some(tag);
        self.catalog_error = None;
        self.on_device = false;
        debug!(tag = tag.value(), "Catalog fetch started");
        tag
    }

    /// Applies a catalog fetch result. Returns false when `tag` is stale and
    /// the result was ignored.
    ///
    /// On success the selection prefers the remembered voice, then the starter
    /// voice, then the first entry. Repeated ids keep their first entry. On failure the catalog collapses to the
    /// starter voice, which becomes selected.
    pub fn apply_catalog(
        &mut self,
        tag: RequestTag,
        result: Result<Vec<VoiceCatalogEntry>, VoiceError>,
    ) -> bool {
        if self.catalog_tag != Some(tag) {
            debug!(tag = tag.value(), "Ignoring stale catalog response");
            return false;
        }
        self.catalog_tag = None;

        match result {
            Ok(mut voices) if !voices.is_empty() => {
                let received = voices.len();
                let mut seen = HashSet::new();
                voices.retain(|voice| seen.insert(voice.id.clone()));
                if voices.len() < received {
                    warn!(
                        duplicates = received - voices.len(),
                        "Dropped voices with repeated ids"
                    );
                }
                info!(voice_count = voices.len(), "Voice catalog loaded");
                self.catalog = voices;
                let find = |id: &str| self.catalog.iter().position(|v| v.id == id);
                self.selected = self
                    .remembered_voice
                    .as_deref()
                    .and_then(find)
                    .or_else(|| find(STARTER_VOICE_ID))
                    .or(Some(0));
            }
            Ok(_) => {
                warn!("Voice catalog is empty, using the starter voice");
                self.reset_to_starter();
            }
            Err(err) => {
                warn!(error = %err, "Voice catalog unavailable, using the starter voice");
                self.reset_to_starter();
                self.catalog_error = Some(err);
            }
        }
        true
    }

    fn reset_to_starter(&mut self) {
        self.catalog = vec![VoiceCatalogEntry::starter()];
        self.selected = Some(0);
    }

    /// Switches the catalog to the host's English voices and selects the
    /// first. Any outstanding catalog fetch becomes stale.
    pub fn use_on_device(&mut self, voices: &[HostVoice]) {
        self.catalog = voices
            .iter()
            .filter(|voice| voice.is_english())
            .map(VoiceCatalogEntry::on_device)
            .collect();
        self.selected = if self.catalog.is_empty() { None } else { Some(0) };
        self.on_device = true;
        self.catalog_error = None;
        self.catalog_tag = None;
        info!(voice_count = self.catalog.len(), "Switched to on-device voices");
    }

    /// Validates a generate action and decides how to carry it out.
    ///
    /// A remote plan clears the previous artifact and marks a request in
    /// flight.
    ///
    /// ## Errors
    ///
    /// In order of precedence: [`VoiceError::Busy`],
    /// [`VoiceError::EmptyInput`], [`VoiceError::InvalidCredential`],
    /// [`VoiceError::NoVoiceSelected`]. On-device mode needs no credential.
    pub fn begin_synthesis(&mut self) -> Result<SynthesisPlan, VoiceError> {
        if self.is_synthesizing() {
            return Err(VoiceError::Busy);
        }
        if self.text.trim().is_empty() {
            return Err(VoiceError::EmptyInput);
        }

        if self.on_device {
            return Ok(SynthesisPlan::OnDevice {
                text: self.text.clone(),
                voice_id: self.selected().map(|voice| voice.id.clone()),
            });
        }

        if self.credential.is_empty() {
            return Err(VoiceError::InvalidCredential);
        }
        let voice = self.selected().ok_or(VoiceError::NoVoiceSelected)?;
        let request = SynthesisRequest::new(self.text.clone(), voice)?;

        let tag = self.issue_tag();
        self.synthesis_tag = Some(tag);
        self.artifact = None;
        debug!(tag = tag.value(), voice_id = %request.voice_id, "Synthesis started");

        Ok(SynthesisPlan::Remote {
            tag,
            request,
            credential: self.credential.clone(),
        })
    }

    /// Applies a synthesis result. Returns `None` when `tag` is stale,
    /// otherwise the outcome for the user.
    pub fn apply_synthesis(
        &mut self,
        tag: RequestTag,
        result: Result<AudioArtifact, VoiceError>,
    ) -> Option<Result<(), VoiceError>> {
        if self.synthesis_tag != Some(tag) {
            debug!(tag = tag.value(), "Ignoring stale synthesis response");
            return None;
        }
        self.synthesis_tag = None;

        Some(result.map(|artifact| {
            info!(bytes = artifact.bytes.len(), voice = %artifact.voice_name, "Audio ready");
            self.artifact = Some(artifact);
        }))
    }
}
