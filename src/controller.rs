//! The single owner of capture state. UI callbacks call in here, and camera
//! events drained on the UI thread are fed back through [`CaptureControl::handle_event`].

use std::{
    mem,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};

use crate::{
    camera::{CameraController, CameraEvent, CameraSelection, RawCapture},
    config::AppConfig,
    error::CaptureError,
    gallery::PhotoGallery,
    recording::RecordingTracker,
    rotation,
};

/// How long a negative permission answer is trusted before the platform is asked again.
const PERMISSION_RECHECK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Error,
}

/// A transient message for the toast overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Error, message: message.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Stopped,
    Running,
    /// Not retried until the camera is switched.
    Failed,
}

#[derive(Debug, Clone, Copy, Default)]
struct PermissionState {
    camera: bool,
    all: bool,
    checked_at: Option<Instant>,
}

pub struct CaptureControl<C: CameraController> {
    camera: C,
    permissions: PermissionState,
    config: AppConfig,
    selection: CameraSelection,
    preview: PreviewState,
    gallery: PhotoGallery,
    recording: RecordingTracker,
    notifications: Vec<Notification>,
}

impl<C: CameraController> CaptureControl<C> {
    pub fn new(camera: C, config: AppConfig) -> Self {
        Self {
            camera,
            permissions: PermissionState::default(),
            selection: config.initial_camera,
            config,
            preview: PreviewState::Stopped,
            gallery: PhotoGallery::new(),
            recording: RecordingTracker::new(),
            notifications: vec![],
        }
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn selection(&self) -> CameraSelection {
        self.selection
    }

    pub fn preview_state(&self) -> PreviewState {
        self.preview
    }

    pub fn gallery(&self) -> &PhotoGallery {
        &self.gallery
    }

    pub fn gallery_mut(&mut self) -> &mut PhotoGallery {
        &mut self.gallery
    }

    pub fn recording(&self) -> &RecordingTracker {
        &self.recording
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_recording()
    }

    /// Notifications raised since the last call, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        mem::take(&mut self.notifications)
    }

    /// Grants are cached for good (revoking one restarts the app); refusals
    /// are re-queried after [`PERMISSION_RECHECK`], or at once when `force`.
    fn refresh_permissions(&mut self, force: bool) -> PermissionState {
        let recent = self
            .permissions
            .checked_at
            .is_some_and(|at| at.elapsed() < PERMISSION_RECHECK);
        if self.permissions.all || (recent && !force) {
            return self.permissions;
        }
        self.permissions = PermissionState {
            camera: self.camera.has_camera_permission(),
            all: self.camera.has_required_permissions(),
            checked_at: Some(Instant::now()),
        };
        self.permissions
    }

    /// Asks for camera and microphone access unless it is already granted.
    pub fn request_permissions(&mut self) {
        if self.refresh_permissions(true).all {
            return;
        }
        if let Err(err) = self.camera.request_permissions() {
            warn!("permission request failed: {err:#}");
        }
    }

    /// Starts the preview once camera access is granted. The microphone only
    /// matters for capture.
    pub fn ensure_preview(&mut self) {
        if self.preview != PreviewState::Stopped || !self.refresh_permissions(false).camera {
            return;
        }
        match self.camera.start_preview(self.selection) {
            Ok(()) => {
                info!("preview started on {:?} camera", self.selection);
                self.preview = PreviewState::Running;
            }
            Err(err) => {
                self.preview = PreviewState::Failed;
                self.report(CaptureError::device(format!("{err:#}")));
            }
        }
    }

    pub fn switch_camera(&mut self) {
        if self.recording.is_recording() {
            info!("switching camera, stopping the active recording first");
            self.stop_recording();
        }
        self.selection = self.selection.toggled();
        debug!("camera selection is now {:?}", self.selection);

        if self.preview == PreviewState::Running {
            if let Err(err) = self.camera.stop_preview() {
                warn!("failed to stop preview: {err:#}");
            }
        }
        self.preview = PreviewState::Stopped;
        self.ensure_preview();
    }

    /// Fire-and-forget: the photo arrives later as [`CameraEvent::PhotoCaptured`].
    pub fn take_photo(&mut self) {
        if !self.refresh_permissions(true).all {
            debug!("take photo ignored, permissions missing");
            return;
        }
        if let Err(err) = self.camera.take_picture() {
            self.report(CaptureError::photo(format!("{err:#}")));
        }
    }

    /// Starts a recording when idle, otherwise stops the current one.
    pub fn toggle_recording(&mut self) {
        if !self.refresh_permissions(true).all {
            debug!("record ignored, permissions missing");
            return;
        }
        if self.recording.is_recording() {
            self.stop_recording();
        } else {
            self.start_recording();
        }
    }

    fn start_recording(&mut self) {
        let storage_dir = match self.camera.private_storage_dir() {
            Ok(dir) => dir,
            Err(err) => {
                self.report(CaptureError::Storage(format!("{err:#}")));
                return;
            }
        };
        let output_path = self.config.recording_path(&storage_dir);
        let session = match self.recording.start(output_path, self.config.record_audio) {
            Ok(session) => session.clone(),
            Err(err) => {
                self.report(err);
                return;
            }
        };
        if let Err(err) = self.camera.start_recording(&session) {
            self.recording.discard(session.id());
            self.report(CaptureError::recording(format!("{err:#}")));
        }
    }

    fn stop_recording(&mut self) {
        let Some(session) = self.recording.stop() else {
            return;
        };
        if let Err(err) = self.camera.stop_recording() {
            warn!("stopping recording #{} failed: {err:#}", session.id());
            self.report(CaptureError::recording(format!("{err:#}")));
        }
    }

    pub fn handle_event(&mut self, event: CameraEvent) {
        match event {
            // The UI paints preview frames itself.
            CameraEvent::Preview(_) => {}
            CameraEvent::PhotoCaptured(raw) => self.on_photo_captured(raw),
            CameraEvent::PhotoFailed(err) => self.report(err),
            CameraEvent::RecordingFinalized { session_id, result } => match result {
                Ok(path) => {
                    info!("recording #{session_id} saved to {}", path.display());
                    self.notifications.push(Notification::info("Video capture succeeded"));
                }
                Err(err) => {
                    self.recording.discard(session_id);
                    self.report(err);
                }
            },
            CameraEvent::DeviceFailed(err) => {
                self.preview = PreviewState::Failed;
                if let Some(session) = self.recording.stop() {
                    warn!("camera failed during recording #{}", session.id());
                    if let Err(stop_err) = self.camera.stop_recording() {
                        warn!("releasing recorder #{} failed: {stop_err:#}", session.id());
                    }
                }
                self.report(err);
            }
        }
    }

    fn on_photo_captured(&mut self, raw: RawCapture) {
        let (width, height) = raw.image.dimensions();
        let upright = rotation::normalize(&raw.image, raw.rotation_degrees, width, height);
        debug!(
            "photo {width}x{height} rotated {} -> {}x{}",
            raw.rotation_degrees,
            upright.width(),
            upright.height()
        );
        self.gallery.on_take_photo(Arc::new(upright));
    }

    fn report(&mut self, err: CaptureError) {
        error!(target: "camera", "{err}");
        self.notifications.push(Notification::error(err.cause()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingSession;
    use anyhow::{anyhow, Result};
    use image::{Rgba, RgbaImage};
    use std::{cell::Cell, path::PathBuf};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        StartPreview(CameraSelection),
        StopPreview,
        TakePicture,
        StartRecording { id: u64, path: PathBuf, audio: bool },
        StopRecording,
    }

    #[derive(Default)]
    struct FakeCamera {
        denied: bool,
        mic_denied: bool,
        permission_checks: Cell<usize>,
        fail_picture: bool,
        fail_recording_start: bool,
        calls: Vec<Call>,
    }

    impl CameraController for FakeCamera {
        fn has_camera_permission(&self) -> bool {
            !self.denied
        }

        fn has_required_permissions(&self) -> bool {
            self.permission_checks.set(self.permission_checks.get() + 1);
            !self.denied && !self.mic_denied
        }

        fn request_permissions(&mut self) -> Result<()> {
            Ok(())
        }

        fn private_storage_dir(&self) -> Result<PathBuf> {
            Ok(PathBuf::from("/data/files"))
        }

        fn start_preview(&mut self, selection: CameraSelection) -> Result<()> {
            self.calls.push(Call::StartPreview(selection));
            Ok(())
        }

        fn stop_preview(&mut self) -> Result<()> {
            self.calls.push(Call::StopPreview);
            Ok(())
        }

        fn take_picture(&mut self) -> Result<()> {
            self.calls.push(Call::TakePicture);
            if self.fail_picture {
                return Err(anyhow!("camera closed"));
            }
            Ok(())
        }

        fn start_recording(&mut self, session: &RecordingSession) -> Result<()> {
            self.calls.push(Call::StartRecording {
                id: session.id(),
                path: session.output_path().to_path_buf(),
                audio: session.audio_enabled(),
            });
            if self.fail_recording_start {
                return Err(anyhow!("encoder busy"));
            }
            Ok(())
        }

        fn stop_recording(&mut self) -> Result<()> {
            self.calls.push(Call::StopRecording);
            Ok(())
        }
    }

    fn control(camera: FakeCamera) -> CaptureControl<FakeCamera> {
        CaptureControl::new(camera, AppConfig::default())
    }

    fn active_id(control: &CaptureControl<FakeCamera>) -> u64 {
        control.recording().active().map(RecordingSession::id).unwrap()
    }

    #[test]
    fn photo_with_permission_denied_does_nothing() {
        let mut control = control(FakeCamera { denied: true, ..Default::default() });
        control.take_photo();
        control.toggle_recording();
        assert!(control.camera().calls.is_empty());
        assert!(control.gallery().is_empty());
        assert!(!control.is_recording());
        assert!(control.take_notifications().is_empty());
    }

    #[test]
    fn captured_photo_is_rotated_into_the_gallery() {
        let mut control = control(FakeCamera::default());
        control.take_photo();
        assert_eq!(control.camera().calls, vec![Call::TakePicture]);

        let image = RgbaImage::from_pixel(4, 2, Rgba([1, 2, 3, 255]));
        control.handle_event(CameraEvent::PhotoCaptured(RawCapture { image, rotation_degrees: 90 }));

        let photos = control.gallery().snapshot();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].dimensions(), (2, 4));
    }

    #[test]
    fn photo_failure_is_reported_without_state_change() {
        let mut control = control(FakeCamera { fail_picture: true, ..Default::default() });
        control.take_photo();
        assert!(control.gallery().is_empty());
        assert_eq!(control.take_notifications(), vec![Notification::error("camera closed")]);

        control.handle_event(CameraEvent::PhotoFailed(CaptureError::photo("out of memory")));
        assert_eq!(control.take_notifications(), vec![Notification::error("out of memory")]);
        assert!(control.gallery().is_empty());
    }

    #[test]
    fn start_then_stop_reports_success() {
        let mut control = control(FakeCamera::default());
        control.toggle_recording();
        assert!(control.is_recording());
        let id = active_id(&control);
        assert_eq!(
            control.camera().calls,
            vec![Call::StartRecording {
                id,
                path: PathBuf::from("/data/files/my-recording.mp4"),
                audio: true,
            }]
        );

        control.toggle_recording();
        assert!(!control.is_recording());
        assert_eq!(control.camera().calls.last(), Some(&Call::StopRecording));

        control.handle_event(CameraEvent::RecordingFinalized {
            session_id: id,
            result: Ok(PathBuf::from("/data/files/my-recording.mp4")),
        });
        assert_eq!(
            control.take_notifications(),
            vec![Notification::info("Video capture succeeded")]
        );
    }

    #[test]
    fn finalize_error_clears_session() {
        let mut control = control(FakeCamera::default());
        control.toggle_recording();
        let id = active_id(&control);

        control.handle_event(CameraEvent::RecordingFinalized {
            session_id: id,
            result: Err(CaptureError::recording("no valid data")),
        });
        assert!(!control.is_recording());
        assert_eq!(control.take_notifications(), vec![Notification::error("no valid data")]);

        // the next press starts a fresh session rather than stopping
        control.toggle_recording();
        assert!(control.is_recording());
        assert!(active_id(&control) > id);
    }

    #[test]
    fn stale_finalize_error_keeps_current_session() {
        let mut control = control(FakeCamera::default());
        control.toggle_recording();
        let old = active_id(&control);
        control.toggle_recording();
        control.toggle_recording();
        let current = active_id(&control);

        control.handle_event(CameraEvent::RecordingFinalized {
            session_id: old,
            result: Err(CaptureError::recording("late failure")),
        });
        assert!(control.is_recording());
        assert_eq!(active_id(&control), current);
    }

    #[test]
    fn failed_start_rolls_back() {
        let mut control = control(FakeCamera { fail_recording_start: true, ..Default::default() });
        control.toggle_recording();
        assert!(!control.is_recording());
        assert_eq!(control.take_notifications(), vec![Notification::error("encoder busy")]);
    }

    #[test]
    fn recording_does_not_block_photos() {
        let mut control = control(FakeCamera::default());
        control.toggle_recording();
        control.take_photo();
        assert!(control.is_recording());
        assert_eq!(control.camera().calls.last(), Some(&Call::TakePicture));
    }

    #[test]
    fn preview_starts_once_permitted() {
        let mut control = control(FakeCamera { denied: true, ..Default::default() });
        control.ensure_preview();
        assert_eq!(control.preview_state(), PreviewState::Stopped);

        control.camera.denied = false;
        control.permissions.checked_at = None;
        control.ensure_preview();
        control.ensure_preview();
        assert_eq!(control.preview_state(), PreviewState::Running);
        assert_eq!(control.camera().calls, vec![Call::StartPreview(CameraSelection::Back)]);
    }

    #[test]
    fn switching_restarts_preview_and_stops_recording() {
        let mut control = control(FakeCamera::default());
        control.ensure_preview();
        control.toggle_recording();

        control.switch_camera();
        assert_eq!(control.selection(), CameraSelection::Front);
        assert!(!control.is_recording());
        let calls = &control.camera().calls;
        assert_eq!(
            &calls[calls.len() - 3..],
            &[
                Call::StopRecording,
                Call::StopPreview,
                Call::StartPreview(CameraSelection::Front),
            ]
        );
    }

    #[test]
    fn device_failure_marks_preview_failed() {
        let mut control = control(FakeCamera::default());
        control.ensure_preview();
        control.handle_event(CameraEvent::DeviceFailed(CaptureError::device("disconnected")));
        assert_eq!(control.preview_state(), PreviewState::Failed);
        assert_eq!(control.take_notifications(), vec![Notification::error("disconnected")]);

        // no retry until the user switches camera
        control.ensure_preview();
        assert_eq!(control.preview_state(), PreviewState::Failed);
    }

    #[test]
    fn denied_permissions_are_not_polled_every_tick() {
        let mut control = control(FakeCamera { denied: true, ..Default::default() });
        for _ in 0..20 {
            control.ensure_preview();
        }
        assert_eq!(control.camera().permission_checks.get(), 1);

        // granted in the system dialog, picked up once the answer goes stale
        control.camera.denied = false;
        control.ensure_preview();
        assert_eq!(control.preview_state(), PreviewState::Stopped);
        control.permissions.checked_at = Some(Instant::now() - PERMISSION_RECHECK);
        control.ensure_preview();
        assert_eq!(control.preview_state(), PreviewState::Running);

        let checks = control.camera().permission_checks.get();
        control.take_photo();
        control.ensure_preview();
        assert_eq!(control.camera().permission_checks.get(), checks);
    }

    #[test]
    fn preview_runs_without_microphone_but_capture_does_not() {
        let mut control = control(FakeCamera { mic_denied: true, ..Default::default() });
        control.ensure_preview();
        assert_eq!(control.preview_state(), PreviewState::Running);

        control.take_photo();
        control.toggle_recording();
        assert!(!control.is_recording());
        assert_eq!(control.camera().calls, vec![Call::StartPreview(CameraSelection::Back)]);
    }

    #[test]
    fn device_failure_releases_the_recorder() {
        let mut control = control(FakeCamera::default());
        control.ensure_preview();
        control.toggle_recording();
        assert!(control.is_recording());

        control.handle_event(CameraEvent::DeviceFailed(CaptureError::device("disconnected")));
        assert!(!control.is_recording());
        assert_eq!(control.camera().calls.last(), Some(&Call::StopRecording));
        assert_eq!(control.take_notifications(), vec![Notification::error("disconnected")]);
    }
}
