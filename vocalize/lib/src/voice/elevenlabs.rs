//! ElevenLabs REST client.
//!
//! Two endpoints are used:
//!
//! - `GET /v1/voices` lists the voices the API key can use.
//! - `POST /v1/text-to-speech/{voice_id}` returns MP3 audio.
//!
//! Calls are made directly: no retry, backoff or caching. Failures are mapped
//! onto [`VoiceError`] from the status code and the `detail` field of the
//! error body.
//!
//! ## Environment Variables
//!
//! - `VOCALIZE_API_BASE_URL` overrides the service origin (mock servers,
//!   proxies).

use reqwest::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::VoiceError;
use crate::voice::{AudioArtifact, AudioFormat, SynthesisRequest, VoiceCatalogEntry, VoiceService};

/// Production service origin.
pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "VOCALIZE_API_BASE_URL";

/// Synthesis model.
pub const MODEL_ID: &str = "eleven_multilingual_v2";

const STABILITY: f32 = 0.5;
const SIMILARITY_BOOST: f32 = 0.75;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "xi-api-key";

/// Permission needed to list voices.
const CATALOG_SCOPE: &str = "voices_read";

/// Permission needed to synthesize.
const SYNTHESIS_SCOPE: &str = "text_to_speech";

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<RemoteVoice>,
}

#[derive(Debug, Deserialize)]
struct RemoteVoice {
    voice_id: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Structured {
        #[serde(default)]
        status: Option<String>,
        message: String,
    },
    Plain(String),
    Validation(Vec<ValidationIssue>),
}

#[derive(Debug, Deserialize)]
struct ValidationIssue {
    msg: String,
}

/// Client for the ElevenLabs API.
///
/// ## Examples
///
/// ```no_run
/// use vocalize_lib::voice::elevenlabs::ElevenLabsClient;
/// use vocalize_lib::voice::VoiceService;
///
/// # async fn example() -> Result<(), vocalize_lib::VoiceError> {
/// let client = ElevenLabsClient::new();
/// let voices = client.list_voices("sk_...").await?;
/// for voice in voices {
///     println!("{}: {}", voice.id, voice.display_name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    http: Client,
    base_url: String,
}

impl Default for ElevenLabsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ElevenLabsClient {
    /// Creates a client for the production service, honouring
    /// `VOCALIZE_API_BASE_URL` when set.
    pub fn new() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(url),
            _ => Self::with_base_url(DEFAULT_BASE_URL),
        }
    }

    /// Creates a client against a custom origin.
    pub fn with_base_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            http: Client::new(),
            base_url: url.trim().trim_end_matches('/').to_string(),
        }
    }

    /// The origin requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_voices(&self, credential: &str) -> Result<Vec<VoiceCatalogEntry>, VoiceError> {
        let credential = require_credential(credential)?;
        let url = format!("{}/v1/voices", self.base_url);

        debug!(url = %url, "Fetching ElevenLabs voice catalog");

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, credential)
            .send()
            .await
            .map_err(network_failure)?;

        let status = response.status();
        let body = response.bytes().await.map_err(network_failure)?;

        if !status.is_success() {
            let err = classify_error(status, &body, CATALOG_SCOPE);
            warn!(status = status.as_u16(), error = %err, "Voice catalog request failed");
            return Err(err);
        }

        let parsed: VoicesResponse = serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, "Voice catalog response was not valid JSON");
            VoiceError::Rejected {
                status: status.as_u16(),
            }
        })?;

        let voices: Vec<VoiceCatalogEntry> = parsed
            .voices
            .into_iter()
            .map(|voice| {
                VoiceCatalogEntry::remote(
                    voice.voice_id,
                    voice.name,
                    voice.category.unwrap_or_default(),
                )
            })
            .collect();

        debug!(voice_count = voices.len(), "Received ElevenLabs voice catalog");
        Ok(voices)
    }

    async fn create_speech(
        &self,
        request: &SynthesisRequest,
        credential: &str,
    ) -> Result<AudioArtifact, VoiceError> {
        if request.text.trim().is_empty() {
            return Err(VoiceError::EmptyInput);
        }
        let credential = require_credential(credential)?;

        let url = format!("{}/v1/text-to-speech/{}", self.base_url, request.voice_id);
        let format = AudioFormat::Mp3;
        let body = SpeechBody {
            text: &request.text,
            model_id: MODEL_ID,
            voice_settings: VoiceSettings {
                stability: STABILITY,
                similarity_boost: SIMILARITY_BOOST,
            },
        };

        debug!(
            voice_id = %request.voice_id,
            text_len = request.text.len(),
            model = MODEL_ID,
            "Sending ElevenLabs TTS request"
        );

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, credential)
            .header(reqwest::header::ACCEPT, format.mime_type())
            .json(&body)
            .send()
            .await
            .map_err(network_failure)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(network_failure)?;

        if !status.is_success() {
            let err = classify_error(status, &bytes, SYNTHESIS_SCOPE);
            warn!(status = status.as_u16(), error = %err, "Speech synthesis failed");
            return Err(err);
        }

        debug!(audio_size = bytes.len(), "Received ElevenLabs audio response");

        Ok(AudioArtifact {
            bytes: bytes.to_vec(),
            format,
            voice_name: request.voice_name.clone(),
        })
    }
}

impl VoiceService for ElevenLabsClient {
    async fn list_voices(&self, credential: &str) -> Result<Vec<VoiceCatalogEntry>, VoiceError> {
        self.fetch_voices(credential).await
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        credential: &str,
    ) -> Result<AudioArtifact, VoiceError> {
        self.create_speech(request, credential).await
    }
}

fn require_credential(credential: &str) -> Result<&str, VoiceError> {
    let trimmed = credential.trim();
    if trimmed.is_empty() {
        return Err(VoiceError::InvalidCredential);
    }
    Ok(trimmed)
}

fn network_failure(err: reqwest::Error) -> VoiceError {
    VoiceError::NetworkFailure {
        message: err.to_string(),
    }
}

/// Maps an unsuccessful response onto a [`VoiceError`].
///
/// Permission problems are checked before the bare 401, since the service
/// reports a missing scope with 401 as well.
fn classify_error(status: StatusCode, body: &[u8], default_scope: &str) -> VoiceError {
    let detail = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|parsed| parsed.detail);

    let (detail_status, message) = match detail {
        Some(ErrorDetail::Structured { status, message }) => (status, Some(message)),
        Some(ErrorDetail::Plain(message)) => (None, Some(message)),
        Some(ErrorDetail::Validation(issues)) if !issues.is_empty() => {
            let joined = issues
                .into_iter()
                .map(|issue| issue.msg)
                .collect::<Vec<_>>()
                .join("; ");
            (None, Some(joined))
        }
        _ => (None, None),
    };

    let scope = message.as_deref().and_then(find_scope);
    let mentions_permission = message
        .as_deref()
        .is_some_and(|m| m.to_lowercase().contains("permission"));

    if detail_status.as_deref() == Some("missing_permissions")
        || (mentions_permission && scope.is_some())
    {
        return VoiceError::PermissionDenied {
            scope: scope.unwrap_or_else(|| default_scope.to_string()),
        };
    }

    if status == StatusCode::UNAUTHORIZED {
        return VoiceError::InvalidCredential;
    }

    match message {
        Some(message) if !message.trim().is_empty() => VoiceError::Api {
            status: status.as_u16(),
            message,
        },
        _ => VoiceError::Rejected {
            status: status.as_u16(),
        },
    }
}

/// Finds a permission name such as `voices_read` in a service message.
fn find_scope(message: &str) -> Option<String> {
    message
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|token| {
            ["_read", "_write"]
                .iter()
                .any(|suffix| token.len() > suffix.len() && token.ends_with(suffix))
        })
        .map(str::to_string)
}
