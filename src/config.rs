use std::{path::{Path, PathBuf}, time::Duration};

use anyhow::{anyhow, Context, Result};

use crate::camera::CameraSelection;

/// Same length as the platform's long toast.
pub const TOAST_DURATION: Duration = Duration::from_millis(3500);

/// Every recording lands here and replaces the previous one.
pub const RECORDING_FILE_NAME: &str = "my-recording.mp4";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub preview_width: u32,
    pub preview_height: u32,
    pub frame_rate: u32,
    pub recording_file_name: String,
    pub record_audio: bool,
    pub initial_camera: CameraSelection,
    pub toast_duration: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preview_width: 1280,
            preview_height: 720,
            frame_rate: 30,
            recording_file_name: RECORDING_FILE_NAME.to_string(),
            record_audio: true,
            initial_camera: CameraSelection::Back,
            toast_duration: TOAST_DURATION,
        }
    }
}

impl AppConfig {
    /// Defaults, overridden by `CAPTURE_PREVIEW_SIZE`, `CAPTURE_RECORD_AUDIO`
    /// and `CAPTURE_CAMERA` when they are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(size) = lookup("CAPTURE_PREVIEW_SIZE") {
            let (width, height) = parse_size(&size).context("CAPTURE_PREVIEW_SIZE")?;
            config.preview_width = width;
            config.preview_height = height;
        }
        if let Some(audio) = lookup("CAPTURE_RECORD_AUDIO") {
            config.record_audio = parse_flag(&audio).context("CAPTURE_RECORD_AUDIO")?;
        }
        if let Some(camera) = lookup("CAPTURE_CAMERA") {
            config.initial_camera = camera.parse().context("CAPTURE_CAMERA")?;
        }
        Ok(config)
    }

    pub fn recording_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.recording_file_name)
    }
}

fn parse_size(value: &str) -> Result<(u32, u32)> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let width: u32 = width.trim().parse()?;
    let height: u32 = height.trim().parse()?;
    if width == 0 || height == 0 {
        return Err(anyhow!("preview size must be non-zero, got {value:?}"));
    }
    Ok((width, height))
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got {other:?}")),
    }
}
