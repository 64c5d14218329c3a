//! On-device speech through the host's synthesizer.
//!
//! macOS ships `say`; most Linux desktops have `espeak-ng` (or the older
//! `espeak`). The engine is located with `which`, text is piped through
//! stdin, and nothing here touches the network.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::VoiceError;

/// A host speech engine binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEngine {
    /// macOS `say`.
    Say,
    /// `espeak-ng` or `espeak`, by binary name.
    Espeak(String),
}

impl HostEngine {
    /// The binary to execute.
    pub fn binary(&self) -> &str {
        match self {
            Self::Say => "say",
            Self::Espeak(binary) => binary,
        }
    }
}

/// A voice reported by the host engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostVoice {
    /// Value passed to `-v`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Locale or language code (`en_US`, `en-gb`, `fr`).
    pub language: String,
}

impl HostVoice {
    /// Returns true for English voices.
    pub fn is_english(&self) -> bool {
        self.language.to_ascii_lowercase().starts_with("en")
    }
}

/// Speaks text with the host engine.
#[derive(Debug, Clone)]
pub struct HostSpeech {
    engine: HostEngine,
}

impl HostSpeech {
    /// Finds the first available engine: `say` on macOS, then `espeak-ng`,
    /// then `espeak`.
    ///
    /// ## Errors
    ///
    /// Returns [`VoiceError::NoHostSpeech`] when none is installed.
    pub fn detect() -> Result<Self, VoiceError> {
        if cfg!(target_os = "macos") && which::which("say").is_ok() {
            return Ok(Self::with_engine(HostEngine::Say));
        }

        ["espeak-ng", "espeak"]
            .into_iter()
            .find(|binary| which::which(binary).is_ok())
            .map(|binary| Self::with_engine(HostEngine::Espeak(binary.to_string())))
            .ok_or(VoiceError::NoHostSpeech)
    }

    /// Uses a specific engine.
    pub fn with_engine(engine: HostEngine) -> Self {
        Self { engine }
    }

    /// The engine in use.
    pub fn engine(&self) -> &HostEngine {
        &self.engine
    }

    /// Lists every voice the engine offers.
    ///
    /// ## Errors
    ///
    /// Returns [`VoiceError::SpeechFailed`] when the engine cannot be run or
    /// exits unsuccessfully.
    pub async fn list_voices(&self) -> Result<Vec<HostVoice>, VoiceError> {
        let binary = self.engine.binary();
        let mut cmd = Command::new(binary);
        match self.engine {
            HostEngine::Say => cmd.arg("-v").arg("?"),
            HostEngine::Espeak(_) => cmd.arg("--voices"),
        };

        let output = cmd.output().await.map_err(|e| VoiceError::SpeechFailed {
            provider: binary.to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(VoiceError::SpeechFailed {
                provider: binary.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let voices = match self.engine {
            HostEngine::Say => parse_say_voices(&stdout),
            HostEngine::Espeak(_) => parse_espeak_voices(&stdout),
        };

        debug!(provider = binary, voice_count = voices.len(), "Enumerated host voices");
        Ok(voices)
    }

    /// Speaks `text`, optionally with a specific voice, and waits until the
    /// engine finishes.
    ///
    /// The child is killed if the returned future is dropped, so aborting
    /// the task running it stops speech.
    ///
    /// ## Errors
    ///
    /// Returns [`VoiceError::EmptyInput`] for blank text and
    /// [`VoiceError::SpeechFailed`] when the engine fails.
    pub async fn speak(&self, text: &str, voice: Option<&str>) -> Result<(), VoiceError> {
        if text.trim().is_empty() {
            return Err(VoiceError::EmptyInput);
        }

        let binary = self.engine.binary();
        let failed = |message: String| VoiceError::SpeechFailed {
            provider: binary.to_string(),
            message,
        };

        let mut cmd = Command::new(binary);
        if let Some(voice) = voice {
            cmd.arg("-v").arg(voice);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(provider = binary, voice = ?voice, text_len = text.len(), "Speaking on device");

        let mut child = cmd.spawn().map_err(|e| failed(e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| failed("stdin was not piped".to_string()))?;
        stdin
            .write_all(text.as_bytes())
            .await
            .map_err(|e| failed(e.to_string()))?;
        // EOF tells the engine the text is complete.
        drop(stdin);

        let output = child.wait_with_output().await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

/// Parses `say -v '?'` output.
///
/// Lines look like `Samantha (Enhanced) en_US    # Hello! My name is ...`:
/// the locale is the last token before `#`, the name is everything before it.
pub fn parse_say_voices(output: &str) -> Vec<HostVoice> {
    output.lines().filter_map(parse_say_line).collect()
}

fn parse_say_line(line: &str) -> Option<HostVoice> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let metadata = line.split('#').next()?.trim();
    let locale = metadata.split_whitespace().last()?;
    let name = metadata[..metadata.rfind(locale)?].trim();

    if name.is_empty() {
        trace!(line, "Skipping say line without a name");
        return None;
    }
    // Eloquence voices are robotic novelty voices.
    if name.contains("Eloquence") {
        return None;
    }

    Some(HostVoice {
        id: name.to_string(),
        name: name.to_string(),
        language: locale.to_string(),
    })
}

/// Parses `espeak-ng --voices` output.
///
/// Columns are whitespace separated:
/// `Pty Language Age/Gender VoiceName File [OtherLanguages]`. The language
/// code is what `-v` accepts; underscores in names stand for spaces.
pub fn parse_espeak_voices(output: &str) -> Vec<HostVoice> {
    output.lines().filter_map(parse_espeak_line).collect()
}

fn parse_espeak_line(line: &str) -> Option<HostVoice> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 || parts[0].parse::<u32>().is_err() {
        return None;
    }

    let language = parts[1];
    Some(HostVoice {
        id: language.to_string(),
        name: parts[3].replace('_', " "),
        language: language.to_string(),
    })
}
