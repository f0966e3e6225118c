use anyhow::{Context, Result};
use live_guide::Config;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_load_shipped_config() -> Result<()> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/live-guide");
    let cfg = Config::load(path.to_str().context("non-UTF-8 path")?)?;

    assert_eq!(cfg.service.name, "live-guide");
    assert_eq!(cfg.service.http.port, 8000);
    assert_eq!(cfg.transport.subject_prefix, "live");
    assert_eq!(cfg.session.audio_queue_capacity, 5);
    assert!(cfg.session.screen_only_during_turn);

    Ok(())
}

#[test]
fn test_session_section_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("minimal.toml");
    std::fs::write(
        &path,
        r#"
[service]
name = "test"

[service.http]
bind = "127.0.0.1"
port = 9000

[transport]
nats_url = "nats://localhost:4222"
subject_prefix = "test"

[session]
silence_padding_ms = 512

[devices]
microphone_wav = "mic.wav"
speaker_wav = "out.wav"
screen_image = "screen.jpg"
"#,
    )?;

    let cfg = Config::load(path.to_str().context("non-UTF-8 path")?)?;

    assert_eq!(cfg.session.silence_chunks(), 8);
    assert_eq!(cfg.session.model, "gemini-2.5-flash-native-audio-latest");
    assert_eq!(cfg.session.max_reconnect_attempts, 5);
    assert_eq!(cfg.session.screen_fps_max, 2);

    let devices = cfg.devices.file_devices();
    assert_eq!(devices.screen_image, PathBuf::from("screen.jpg"));

    Ok(())
}

#[test]
fn test_missing_config_is_an_error() {
    assert!(Config::load("/nonexistent/live-guide").is_err());
}
