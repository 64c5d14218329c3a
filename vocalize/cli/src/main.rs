mod commands;
mod tui;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveTime};
use clap::{Parser, Subcommand};
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste};
use thiserror::Error;
use tracing::warn;
use vocalize_lib::{
    AppState, JsonSettingsStore, Settings, SettingsError, SettingsStore, ShiftConfig,
    StartupConfig, VoiceError, parse_at_time, parse_hours, voice::elevenlabs::ElevenLabsClient,
};

use crate::tui::{App, run_app};

/// Environment variables consulted for the API key, in order.
const CREDENTIAL_ENV_VARS: [&str; 2] = ["ELEVENLABS_API_KEY", "ELEVEN_LABS_API_KEY"];

/// Text-to-speech with ElevenLabs and a shift timer, in your terminal.
///
/// Without a subcommand the interactive TUI opens.
///
/// Examples:
///   vocalize                               # Open TUI with an 8 hour shift
///   vocalize --logout-at 5:30pm            # Open TUI, shift ends at 17:30
///   vocalize voices                        # Print the voice catalog
///   vocalize speak "Hello there" -o hi.mp3 # Synthesize to a file
///   vocalize speak --on-device "Hello"     # Speak with the host's voice
#[derive(Debug, Parser)]
#[command(name = "vocalize")]
#[command(version)]
#[command(about = "Text-to-speech and a shift timer with an interactive TUI")]
struct Cli {
    /// ElevenLabs API key (overrides the saved key and ELEVENLABS_API_KEY).
    #[arg(long, value_name = "KEY", global = true)]
    api_key: Option<String>,

    /// Voice id to use instead of the remembered one.
    #[arg(long, value_name = "VOICE_ID", global = true)]
    voice: Option<String>,

    /// Shift length in hours (e.g. 8, 7.5, 7.5h).
    #[arg(long, value_parser = parse_hours, value_name = "HOURS", conflicts_with = "logout_at")]
    hours: Option<f64>,

    /// End the shift at a clock time instead (e.g. 5:30pm, 17:30).
    #[arg(long, value_parser = parse_at_time, value_name = "TIME", conflicts_with = "hours")]
    logout_at: Option<NaiveTime>,

    /// Enable debug logging to ~/.vocalize-debug.log.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the voices available to the API key.
    Voices {
        /// List the host's on-device voices instead.
        #[arg(long)]
        on_device: bool,
    },
    /// Synthesize text without opening the TUI.
    Speak {
        /// The text to speak.
        #[arg(value_name = "TEXT")]
        text: String,

        /// Write the MP3 here instead of the download directory.
        #[arg(long, short, value_name = "PATH", conflicts_with = "on_device")]
        out: Option<PathBuf>,

        /// Speak through the host's speech engine; nothing is sent over the network.
        #[arg(long)]
        on_device: bool,
    },
}

#[derive(Debug, Error)]
enum VocalizeError {
    #[error("TUI error: {0}")]
    Tui(std::io::Error),

    #[error("debug log error: {0}")]
    DebugLog(std::io::Error),

    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("{}", .0.user_message())]
    Voice(#[from] VoiceError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("vocalize: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), VocalizeError> {
    if cli.debug {
        init_debug_logging()?;
    }

    let store = JsonSettingsStore::default_path();
    let settings = store.load().unwrap_or_else(|err| {
        warn!(path = %store.path().display(), error = %err, "Ignoring unreadable settings");
        Settings::default()
    });
    let credential = resolve_credential(cli.api_key.as_deref(), &settings, |name| {
        std::env::var(name).ok()
    });
    let voice = cli.voice.clone().or(settings.voice_id);

    match cli.command {
        Some(Commands::Voices { on_device }) => {
            let runtime = build_runtime()?;
            runtime.block_on(commands::voices(&credential, on_device))?;
            Ok(())
        }
        Some(Commands::Speak {
            text,
            out,
            on_device,
        }) => {
            let runtime = build_runtime()?;
            runtime.block_on(commands::speak(
                &text,
                &credential,
                voice.as_deref(),
                out,
                on_device,
            ))?;
            Ok(())
        }
        None => {
            let startup = StartupConfig {
                credential,
                remembered_voice: voice,
                shift: shift_config(cli.hours, cli.logout_at),
            };
            run_tui(startup, store)
        }
    }
}

/// Picks the API key: the flag, then the saved key, then the environment.
/// Blank values are skipped.
fn resolve_credential(
    flag: Option<&str>,
    settings: &Settings,
    env: impl Fn(&str) -> Option<String>,
) -> String {
    let non_blank = |value: &str| !value.trim().is_empty();

    flag.filter(|value| non_blank(value))
        .map(str::to_string)
        .or_else(|| settings.api_key.clone().filter(|value| non_blank(value)))
        .or_else(|| {
            CREDENTIAL_ENV_VARS
                .iter()
                .find_map(|name| env(name).filter(|value| non_blank(value)))
        })
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// Builds the initial shift config from CLI flags.
fn shift_config(hours: Option<f64>, logout_at: Option<NaiveTime>) -> ShiftConfig {
    match (hours, logout_at) {
        (_, Some(time)) => ShiftConfig::fixed_clock_time(time),
        (Some(hours), None) => ShiftConfig::fixed_duration(hours),
        (None, None) => ShiftConfig::default(),
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime, VocalizeError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(VocalizeError::Runtime)
}

/// Initializes debug logging to ~/.vocalize-debug.log.
fn init_debug_logging() -> Result<(), VocalizeError> {
    use std::fs::OpenOptions;
    use tracing_subscriber::EnvFilter;

    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let log_path = home.join(".vocalize-debug.log");

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(VocalizeError::DebugLog)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_writer(file)
        .with_ansi(false)
        .init();

    Ok(())
}

/// Runs the TUI application with proper terminal setup and cleanup.
fn run_tui(startup: StartupConfig, store: JsonSettingsStore) -> Result<(), VocalizeError> {
    let runtime = build_runtime()?;

    // The clock and effect tasks are spawned onto this runtime.
    let _guard = runtime.enter();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        original_hook(info);
    }));

    let mut terminal = ratatui::init();
    // Pasted keys arrive as one event instead of a burst of key presses.
    if let Err(err) = crossterm::execute!(std::io::stdout(), EnableBracketedPaste) {
        warn!(error = %err, "Bracketed paste unavailable");
    }

    let state = AppState::new(startup, Local::now().naive_local());
    let mut app = App::new(state).with_runtime(ElevenLabsClient::new(), store);

    let result = run_app(&mut terminal, &mut app);

    let _ = crossterm::execute!(std::io::stdout(), DisableBracketedPaste);
    ratatui::restore();

    // Stops the clock and kills any player or speech process.
    drop(app);

    result.map_err(VocalizeError::Tui)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn clap_accepts_no_args() {
        let cli = Cli::try_parse_from(["vocalize"]).unwrap();
        assert!(cli.api_key.is_none());
        assert!(cli.hours.is_none());
        assert!(cli.logout_at.is_none());
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn clap_rejects_hours_with_logout_at() {
        let err = Cli::try_parse_from(["vocalize", "--hours", "8", "--logout-at", "17:00"])
            .err()
            .expect("conflicting flags");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn clap_parses_hour_only_logout_at() {
        let cli = Cli::try_parse_from(["vocalize", "--logout-at", "6pm"]).unwrap();
        assert_eq!(cli.logout_at, NaiveTime::from_hms_opt(18, 0, 0));
    }

    #[test]
    fn clap_parses_hours() {
        let cli = Cli::try_parse_from(["vocalize", "--hours", "7.5h"]).unwrap();
        assert_eq!(cli.hours, Some(7.5));
    }

    #[test]
    fn clap_rejects_bad_hours() {
        assert!(Cli::try_parse_from(["vocalize", "--hours", "-2"]).is_err());
        assert!(Cli::try_parse_from(["vocalize", "--hours", "soon"]).is_err());
    }

    #[test]
    fn clap_parses_logout_at() {
        let cli = Cli::try_parse_from(["vocalize", "--logout-at", "5:30pm"]).unwrap();
        assert_eq!(cli.logout_at, NaiveTime::from_hms_opt(17, 30, 0));
    }

    #[test]
    fn clap_parses_speak_subcommand() {
        let cli =
            Cli::try_parse_from(["vocalize", "speak", "Hello", "--out", "hi.mp3", "--voice", "abc"])
                .unwrap();
        assert_eq!(cli.voice.as_deref(), Some("abc"));
        match cli.command {
            Some(Commands::Speak {
                text,
                out,
                on_device,
            }) => {
                assert_eq!(text, "Hello");
                assert_eq!(out, Some(PathBuf::from("hi.mp3")));
                assert!(!on_device);
            }
            other => panic!("expected speak, got {other:?}"),
        }
    }

    #[test]
    fn clap_rejects_out_with_on_device() {
        let result =
            Cli::try_parse_from(["vocalize", "speak", "Hi", "--on-device", "--out", "a.mp3"]);
        assert!(result.is_err());
    }

    #[test]
    fn clap_parses_voices_subcommand() {
        let cli = Cli::try_parse_from(["vocalize", "voices", "--on-device"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Voices { on_device: true })));
    }

    #[test]
    fn credential_flag_wins() {
        let settings = Settings {
            api_key: Some("saved".into()),
            voice_id: None,
        };
        let env = |_: &str| Some("from-env".to_string());
        assert_eq!(resolve_credential(Some("flag"), &settings, env), "flag");
    }

    #[test]
    fn credential_falls_back_to_settings_then_env() {
        let saved = Settings {
            api_key: Some("saved".into()),
            voice_id: None,
        };
        assert_eq!(resolve_credential(None, &saved, no_env), "saved");

        let env = |name: &str| (name == "ELEVEN_LABS_API_KEY").then(|| "legacy".to_string());
        assert_eq!(resolve_credential(None, &Settings::default(), env), "legacy");
    }

    #[test]
    fn credential_prefers_primary_env_var() {
        let env = |name: &str| Some(format!("{name}-value"));
        assert_eq!(
            resolve_credential(None, &Settings::default(), env),
            "ELEVENLABS_API_KEY-value"
        );
    }

    #[test]
    fn blank_credentials_are_skipped() {
        let settings = Settings {
            api_key: Some("   ".into()),
            voice_id: None,
        };
        let env = |_: &str| Some(" env-key ".to_string());
        assert_eq!(resolve_credential(Some(""), &settings, env), "env-key");
        assert_eq!(resolve_credential(None, &Settings::default(), no_env), "");
    }

    #[test]
    fn shift_config_from_flags() {
        assert_eq!(shift_config(None, None), ShiftConfig::default());
        assert_eq!(shift_config(Some(6.0), None), ShiftConfig::fixed_duration(6.0));

        let time = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        assert_eq!(shift_config(None, Some(time)), ShiftConfig::fixed_clock_time(time));
    }
}
