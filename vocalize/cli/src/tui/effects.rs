//! Executes [`Effect`]s as tokio tasks.
//!
//! Every task reports back over the event channel, so the UI loop remains the
//! only place that mutates [`AppState`](vocalize_lib::AppState). Playback and
//! on-device speech keep their task handle: stopping them aborts the task,
//! which drops the child process future and kills the child. Settings go
//! through a single writer task so saves land in the order they were made.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vocalize_lib::voice::elevenlabs::ElevenLabsClient;
use vocalize_lib::voice::host::HostSpeech;
use vocalize_lib::voice::{VoiceService, playback};
use vocalize_lib::{AppEvent, Effect, JsonSettingsStore, Settings, SettingsStore};

/// Runs effects on the ambient tokio runtime.
pub struct EffectRunner {
    tx: mpsc::Sender<AppEvent>,
    client: Arc<ElevenLabsClient>,
    persist: mpsc::UnboundedSender<Settings>,
    playback: Option<JoinHandle<()>>,
    speech: Option<JoinHandle<()>>,
}

impl EffectRunner {
    /// Creates a runner that reports completions on `tx`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        tx: mpsc::Sender<AppEvent>,
        client: ElevenLabsClient,
        store: JsonSettingsStore,
    ) -> Self {
        Self {
            tx,
            client: Arc::new(client),
            persist: spawn_settings_writer(store),
            playback: None,
            speech: None,
        }
    }

    /// Starts one effect. Must be called inside a tokio runtime.
    pub fn run(&mut self, effect: Effect) {
        // Effects carry the API key, so only the kind is logged.
        debug!(effect = kind(&effect), "Running effect");

        match effect {
            Effect::FetchCatalog { tag, credential } => {
                let client = Arc::clone(&self.client);
                self.report(async move {
                    let result = client.list_voices(&credential).await;
                    AppEvent::CatalogLoaded { tag, result }
                });
            }
            Effect::ListHostVoices => {
                self.report(async move {
                    let result = match HostSpeech::detect() {
                        Ok(host) => host.list_voices().await,
                        Err(err) => Err(err),
                    };
                    AppEvent::HostVoicesLoaded(result)
                });
            }
            Effect::Synthesize {
                tag,
                request,
                credential,
            } => {
                let client = Arc::clone(&self.client);
                self.report(async move {
                    let result = client.synthesize(&request, &credential).await;
                    AppEvent::SynthesisFinished { tag, result }
                });
            }
            Effect::Speak {
                tag,
                text,
                voice_id,
            } => {
                abort(&mut self.speech);
                self.speech = Some(self.report(async move {
                    let result = match HostSpeech::detect() {
                        Ok(host) => host.speak(&text, voice_id.as_deref()).await,
                        Err(err) => Err(err),
                    };
                    AppEvent::SpeechFinished { tag, result }
                }));
            }
            Effect::StopSpeech => abort(&mut self.speech),
            Effect::Announce(message) => {
                self.report(async move {
                    let result = match HostSpeech::detect() {
                        Ok(host) => host.speak(&message, None).await,
                        Err(err) => Err(err),
                    };
                    AppEvent::AlertSpoken(result)
                });
            }
            Effect::Play { tag, artifact } => {
                abort(&mut self.playback);
                self.playback = Some(self.report(async move {
                    let result = playback::play(&artifact).await;
                    AppEvent::PlaybackFinished { tag, result }
                }));
            }
            Effect::StopPlayback => abort(&mut self.playback),
            Effect::Save(artifact) => {
                self.report(async move {
                    let dir = playback::download_dir();
                    AppEvent::Downloaded(playback::save(&artifact, &dir).await)
                });
            }
            Effect::Persist(settings) => {
                if self.persist.send(settings).is_err() {
                    warn!("Settings writer stopped, dropping save");
                }
            }
        }
    }

    /// Spawns `work` and sends the event it produces.
    fn report<F>(&self, work: F) -> JoinHandle<()>
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = work.await;
            if tx.send(event).await.is_err() {
                debug!("Event loop gone, dropping completion");
            }
        })
    }
}

impl Drop for EffectRunner {
    fn drop(&mut self) {
        abort(&mut self.playback);
        abort(&mut self.speech);
    }
}

/// Saves snapshots one at a time, in the order they were sent.
fn spawn_settings_writer(store: JsonSettingsStore) -> mpsc::UnboundedSender<Settings> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Settings>();
    let store = Arc::new(store);

    tokio::spawn(async move {
        while let Some(settings) = rx.recv().await {
            let writer = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || writer.save(&settings)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(path = %store.path().display(), error = %err, "Failed to save settings");
                }
                Err(err) => warn!(error = %err, "Settings write task failed"),
            }
        }
    });

    tx
}

fn kind(effect: &Effect) -> &'static str {
    match effect {
        Effect::FetchCatalog { .. } => "fetch_catalog",
        Effect::ListHostVoices => "list_host_voices",
        Effect::Synthesize { .. } => "synthesize",
        Effect::Speak { .. } => "speak",
        Effect::StopSpeech => "stop_speech",
        Effect::Announce(_) => "announce",
        Effect::Play { .. } => "play",
        Effect::StopPlayback => "stop_playback",
        Effect::Save(_) => "save",
        Effect::Persist(_) => "persist",
    }
}

fn abort(handle: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = handle.take() {
        handle.abort();
    }
}
