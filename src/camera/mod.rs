use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::mpsc::Sender,
};

use anyhow::{anyhow, Result};
use image::RgbaImage;
use slint::{Rgba8Pixel, SharedPixelBuffer};

use crate::{config::AppConfig, error::CaptureError, recording::RecordingSession};

#[cfg(target_os = "android")]
use self::camera2::AndroidCamera;

#[cfg(target_os = "android")]
mod camera2;
#[cfg(target_os = "android")]
mod jni_env;
#[cfg(target_os = "android")]
mod media_recorder;

#[cfg(not(target_os = "android"))]
mod ffmpeg;
#[cfg(not(target_os = "android"))]
mod pcam;

pub mod yuv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraSelection {
    Front,
    #[default]
    Back,
}

impl CameraSelection {
    pub fn toggled(self) -> Self {
        match self {
            CameraSelection::Front => CameraSelection::Back,
            CameraSelection::Back => CameraSelection::Front,
        }
    }
}

impl FromStr for CameraSelection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "front" => Ok(CameraSelection::Front),
            "back" => Ok(CameraSelection::Back),
            other => Err(anyhow!("unknown camera {other:?}, expected front or back")),
        }
    }
}

/// Unrotated sensor image plus the clockwise rotation that makes it upright.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub image: RgbaImage,
    pub rotation_degrees: i32,
}

/// Everything the platform reports back after a request. Sent from camera
/// threads and drained on the UI thread.
pub enum CameraEvent {
    Preview(SharedPixelBuffer<Rgba8Pixel>),
    PhotoCaptured(RawCapture),
    PhotoFailed(CaptureError),
    RecordingFinalized {
        session_id: u64,
        result: Result<PathBuf, CaptureError>,
    },
    DeviceFailed(CaptureError),
}

/// The platform camera: sensor access, encoding and file output live behind
/// this. Completion of `take_picture` and `stop_recording` is reported through
/// [`CameraEvent`]s, never through the return value.
pub trait CameraController {
    /// Enough to show the preview.
    fn has_camera_permission(&self) -> bool;
    /// Camera and microphone, needed for photos and recordings.
    fn has_required_permissions(&self) -> bool;
    fn request_permissions(&mut self) -> Result<()>;
    fn private_storage_dir(&self) -> Result<PathBuf>;
    fn start_preview(&mut self, selection: CameraSelection) -> Result<()>;
    fn stop_preview(&mut self) -> Result<()>;
    fn take_picture(&mut self) -> Result<()>;
    fn start_recording(&mut self, session: &RecordingSession) -> Result<()>;
    fn stop_recording(&mut self) -> Result<()>;
}

pub struct Camera {
    #[cfg(target_os = "android")]
    camera: AndroidCamera,
    #[cfg(not(target_os = "android"))]
    camera: pcam::Camera,
}

impl Camera {
    pub fn new(
        #[cfg(target_os = "android")] app: slint::android::AndroidApp,
        events: Sender<CameraEvent>,
        config: &AppConfig,
    ) -> Result<Self> {
        Ok(Camera {
            #[cfg(target_os = "android")]
            camera: AndroidCamera::new(app, events, config),
            #[cfg(not(target_os = "android"))]
            camera: pcam::Camera::new(events, config),
        })
    }
}

impl CameraController for Camera {
    fn has_camera_permission(&self) -> bool {
        self.camera.has_camera_permission()
    }

    fn has_required_permissions(&self) -> bool {
        self.camera.has_required_permissions()
    }

    fn request_permissions(&mut self) -> Result<()> {
        self.camera.request_permissions()
    }

    fn private_storage_dir(&self) -> Result<PathBuf> {
        let dir = self.camera.private_storage_dir()?;
        ensure_dir(&dir)?;
        Ok(dir)
    }

    fn start_preview(&mut self, selection: CameraSelection) -> Result<()> {
        self.camera.start_preview(selection)
    }

    fn stop_preview(&mut self) -> Result<()> {
        self.camera.stop_preview();
        Ok(())
    }

    fn take_picture(&mut self) -> Result<()> {
        self.camera.take_picture()
    }

    fn start_recording(&mut self, session: &RecordingSession) -> Result<()> {
        self.camera.start_recording(session)
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.camera.stop_recording()
    }
}

/// Clockwise rotation that turns a sensor frame upright for the current
/// display rotation. Front sensors are mounted mirrored, so the display
/// rotation adds instead of subtracts.
#[cfg_attr(not(target_os = "android"), allow(dead_code))]
pub(crate) fn sensor_rotation(sensor_orientation: i32, lens: CameraSelection, display_rotation: i32) -> i32 {
    match lens {
        CameraSelection::Front => (sensor_orientation + display_rotation).rem_euclid(360),
        CameraSelection::Back => (sensor_orientation - display_rotation).rem_euclid(360),
    }
}

/// Picks the output size closest to `wanted`, preferring the same aspect ratio.
#[cfg_attr(not(target_os = "android"), allow(dead_code))]
pub(crate) fn choose_preview_size(available: &[(u32, u32)], wanted: (u32, u32)) -> Option<(u32, u32)> {
    let wanted_area = wanted.0 as i64 * wanted.1 as i64;
    available.iter().copied().min_by_key(|&(w, h)| {
        let same_aspect = w as u64 * wanted.1 as u64 == h as u64 * wanted.0 as u64;
        (!same_aspect, (w as i64 * h as i64 - wanted_area).abs())
    })
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_alternates_lenses() {
        assert_eq!(CameraSelection::Back.toggled(), CameraSelection::Front);
        assert_eq!(CameraSelection::Front.toggled().toggled(), CameraSelection::Front);
        assert_eq!(CameraSelection::default(), CameraSelection::Back);
    }

    #[test]
    fn back_lens_rotation_follows_display() {
        assert_eq!(sensor_rotation(90, CameraSelection::Back, 0), 90);
        assert_eq!(sensor_rotation(90, CameraSelection::Back, 90), 0);
        assert_eq!(sensor_rotation(90, CameraSelection::Back, 180), 270);
    }

    #[test]
    fn front_lens_rotation_is_mirrored() {
        assert_eq!(sensor_rotation(270, CameraSelection::Front, 0), 270);
        assert_eq!(sensor_rotation(270, CameraSelection::Front, 90), 0);
        assert_eq!(sensor_rotation(270, CameraSelection::Front, 270), 180);
    }

    #[test]
    fn preview_size_prefers_exact_then_aspect() {
        let sizes = [(1920, 1080), (1280, 960), (1280, 720), (640, 480)];
        assert_eq!(choose_preview_size(&sizes, (1280, 720)), Some((1280, 720)));
        assert_eq!(choose_preview_size(&sizes, (1760, 990)), Some((1920, 1080)));
        assert_eq!(choose_preview_size(&sizes, (800, 600)), Some((640, 480)));
        assert_eq!(choose_preview_size(&[], (800, 600)), None);
    }

    #[test]
    fn selection_parses_case_insensitively() {
        assert_eq!("FRONT".parse::<CameraSelection>().unwrap(), CameraSelection::Front);
        assert_eq!(" back ".parse::<CameraSelection>().unwrap(), CameraSelection::Back);
        assert!("left".parse::<CameraSelection>().is_err());
    }
}
