//! Non-interactive subcommands: `vocalize voices` and `vocalize speak`.

use std::path::PathBuf;

use tracing::{info, warn};
use vocalize_lib::VoiceError;
use vocalize_lib::voice::elevenlabs::ElevenLabsClient;
use vocalize_lib::voice::host::HostSpeech;
use vocalize_lib::voice::{
    STARTER_VOICE_ID, SynthesisRequest, VoiceCatalogEntry, VoiceService, playback,
};

/// Prints one voice per line: id, name and category separated by tabs.
pub async fn voices(credential: &str, on_device: bool) -> Result<(), VoiceError> {
    let entries: Vec<VoiceCatalogEntry> = if on_device {
        let host = HostSpeech::detect()?;
        host.list_voices()
            .await?
            .iter()
            .filter(|voice| voice.is_english())
            .map(VoiceCatalogEntry::on_device)
            .collect()
    } else {
        ElevenLabsClient::new().list_voices(credential).await?
    };

    for line in entries.iter().map(format_entry) {
        println!("{line}");
    }
    Ok(())
}

/// Speaks `text` on device, or synthesizes it and writes the MP3.
pub async fn speak(
    text: &str,
    credential: &str,
    voice: Option<&str>,
    out: Option<PathBuf>,
    on_device: bool,
) -> Result<(), VoiceError> {
    if on_device {
        let host = HostSpeech::detect()?;
        return host.speak(text, voice).await;
    }

    let client = ElevenLabsClient::new();
    let voice_id = voice.unwrap_or(STARTER_VOICE_ID);
    let entry = resolve_voice(&client, credential, voice_id).await;
    let request = SynthesisRequest::new(text, &entry)?;

    let artifact = client.synthesize(&request, credential).await?;

    let path = match out {
        Some(path) => {
            tokio::fs::write(&path, &artifact.bytes).await?;
            path
        }
        None => playback::save(&artifact, &playback::download_dir()).await?,
    };

    info!(path = %path.display(), voice = %entry.display_name, "Synthesized to file");
    println!("{}", path.display());
    Ok(())
}

/// Looks `voice_id` up in the catalog to learn its display name.
///
/// A key may be allowed to synthesize without being allowed to list voices,
/// so lookup failures fall back to an entry named after the id.
async fn resolve_voice(
    client: &ElevenLabsClient,
    credential: &str,
    voice_id: &str,
) -> VoiceCatalogEntry {
    if voice_id == STARTER_VOICE_ID {
        return VoiceCatalogEntry::starter();
    }

    match client.list_voices(credential).await {
        Ok(catalog) => catalog
            .into_iter()
            .find(|entry| entry.id == voice_id)
            .unwrap_or_else(|| VoiceCatalogEntry::remote(voice_id, voice_id, "custom")),
        Err(err) => {
            warn!(error = %err, voice_id, "Voice lookup failed, using the id as its name");
            VoiceCatalogEntry::remote(voice_id, voice_id, "custom")
        }
    }
}

fn format_entry(entry: &VoiceCatalogEntry) -> String {
    format!("{}\t{}\t{}", entry.id, entry.display_name, entry.category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_tab_separated() {
        assert_eq!(
            format_entry(&VoiceCatalogEntry::starter()),
            "6AUOG2nbfr0yFEeI0784\tRachel\tPremium"
        );
    }

    #[tokio::test]
    async fn starter_voice_resolves_without_a_request() {
        // Port 9 is discard; any request would fail and fall back to the id.
        let client = ElevenLabsClient::with_base_url("http://127.0.0.1:9");
        let entry = resolve_voice(&client, "key", STARTER_VOICE_ID).await;
        assert_eq!(entry.display_name, "Rachel");
    }

    #[tokio::test]
    async fn unknown_voice_falls_back_to_its_id() {
        let client = ElevenLabsClient::with_base_url("http://127.0.0.1:9");
        let entry = resolve_voice(&client, "key", "custom-id").await;
        assert_eq!(entry.id, "custom-id");
        assert_eq!(entry.display_name, "custom-id");
    }

    #[tokio::test]
    async fn blank_text_is_refused_before_any_request() {
        let err = speak("   ", "key", None, None, false).await.unwrap_err();
        assert!(matches!(err, VoiceError::EmptyInput));
    }
}
