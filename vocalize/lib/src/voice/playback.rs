//! Playing and saving generated audio.
//!
//! Playback writes the artifact to a temporary file and hands it to the first
//! system player that can decode the format. Saving writes
//! `voice-{name}.mp3` into the user's download directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::VoiceError;
use crate::voice::{AudioArtifact, AudioFormat};

/// Players that decode MP3, in preference order.
#[cfg(target_os = "macos")]
const MP3_PLAYERS: &[&str] = &["afplay", "mpv", "ffplay"];

/// Players that decode MP3, in preference order. `paplay` and `aplay` only
/// handle PCM and turn MP3 into static.
#[cfg(not(target_os = "macos"))]
const MP3_PLAYERS: &[&str] = &["mpv", "ffplay", "play"];

/// Returns the first installed player for `format`.
pub fn player_for(format: AudioFormat) -> Option<&'static str> {
    let candidates = match format {
        AudioFormat::Mp3 => MP3_PLAYERS,
    };
    candidates
        .iter()
        .copied()
        .find(|player| which::which(player).is_ok())
}

fn build_player_args(player: &str, path: &Path) -> Vec<String> {
    let path = path.to_string_lossy().to_string();
    match player {
        "ffplay" => vec![
            "-nodisp".to_string(),
            "-autoexit".to_string(),
            "-loglevel".to_string(),
            "quiet".to_string(),
            path,
        ],
        "mpv" => vec![
            "--no-video".to_string(),
            "--really-quiet".to_string(),
            path,
        ],
        "play" => vec!["-q".to_string(), path],
        _ => vec![path],
    }
}

/// Plays `artifact` to completion.
///
/// The player is killed if the returned future is dropped, which is how a
/// "stop" toggle is implemented: abort the task awaiting this.
///
/// ## Errors
///
/// - [`VoiceError::NoAudioPlayer`] when no suitable player is installed.
/// - [`VoiceError::PlaybackFailed`] when the player exits unsuccessfully.
/// - [`VoiceError::Io`] when the temp file cannot be written.
pub async fn play(artifact: &AudioArtifact) -> Result<(), VoiceError> {
    let player = player_for(artifact.format).ok_or(VoiceError::NoAudioPlayer)?;

    let temp_file = NamedTempFile::with_suffix(format!(".{}", artifact.format.extension()))?;
    tokio::fs::write(temp_file.path(), &artifact.bytes).await?;

    let args = build_player_args(player, temp_file.path());
    debug!(player, path = %temp_file.path().display(), "Playing audio");

    let output = Command::new(player)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| VoiceError::PlaybackFailed {
            player: player.to_string(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(VoiceError::PlaybackFailed {
            player: player.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}

/// The directory downloads are written to: the platform download directory,
/// or the current directory when there is none.
pub fn download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Writes `artifact` into `dir` as `voice-{name}.mp3`, never overwriting an
/// existing file (`voice-Rachel (1).mp3`, ...). Returns the written path.
///
/// ## Errors
///
/// Returns [`VoiceError::Io`] if the directory or file cannot be written.
pub async fn save(artifact: &AudioArtifact, dir: &Path) -> Result<PathBuf, VoiceError> {
    tokio::fs::create_dir_all(dir).await?;

    let path = unique_path(dir, &artifact.file_name());
    tokio::fs::write(&path, &artifact.bytes).await?;

    info!(path = %path.display(), bytes = artifact.bytes.len(), "Saved audio");
    Ok(path)
}

fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (file_name, String::new()),
    };

    (1..)
        .map(|n| dir.join(format!("{stem} ({n}){ext}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
