use std::{
    path::PathBuf,
    sync::mpsc::{channel, Receiver, Sender, TryRecvError},
    thread::JoinHandle,
    time::Duration,
};

use anyhow::{anyhow, Result};
use image::RgbaImage;
use kamera::Camera as KCamera;
use log::{debug, info, warn};
use slint::SharedPixelBuffer;

use super::{ffmpeg::FfmpegRecorder, CameraEvent, CameraSelection, RawCapture};
use crate::{config::AppConfig, error::CaptureError, recording::RecordingSession};

enum WorkerCommand {
    TakePicture,
    StartRecording { session_id: u64, output_path: PathBuf, audio: bool },
    StopRecording,
    Shutdown,
}

/// Webcam preview on a worker thread. Desktop hosts never ask for permissions.
pub struct Camera {
    events: Sender<CameraEvent>,
    frame_rate: u32,
    commands: Option<Sender<WorkerCommand>>,
    camera_task: Option<JoinHandle<Result<()>>>,
}

impl Camera {
    pub fn new(events: Sender<CameraEvent>, config: &AppConfig) -> Self {
        Self { events, frame_rate: config.frame_rate, commands: None, camera_task: None }
    }

    pub fn has_camera_permission(&self) -> bool {
        true
    }

    pub fn has_required_permissions(&self) -> bool {
        true
    }

    pub fn request_permissions(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn private_storage_dir(&self) -> Result<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| anyhow!("no local data directory on this system"))?;
        Ok(base.join("slint_capture"))
    }

    pub fn start_preview(&mut self, selection: CameraSelection) -> Result<()> {
        self.stop_preview();
        let index = device_index(selection);
        let (command_sender, command_receiver) = channel();
        let worker = Worker {
            events: self.events.clone(),
            commands: command_receiver,
            frame_rate: self.frame_rate,
            recording: None,
            pending_recording: None,
            capture_requested: false,
        };
        self.commands = Some(command_sender);
        self.camera_task = Some(std::thread::spawn(move || worker.run(index)));
        info!("preview worker started for camera #{index}");
        Ok(())
    }

    pub fn stop_preview(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(WorkerCommand::Shutdown);
        }
        if let Some(handle) = self.camera_task.take() {
            match handle.join() {
                Ok(Ok(())) => debug!("preview worker stopped"),
                Ok(Err(err)) => warn!("preview worker ended with error: {err:#}"),
                Err(_) => warn!("preview worker panicked"),
            }
        }
    }

    pub fn take_picture(&mut self) -> Result<()> {
        self.send(WorkerCommand::TakePicture)
    }

    pub fn start_recording(&mut self, session: &RecordingSession) -> Result<()> {
        self.send(WorkerCommand::StartRecording {
            session_id: session.id(),
            output_path: session.output_path().to_path_buf(),
            audio: session.audio_enabled(),
        })
    }

    pub fn stop_recording(&mut self) -> Result<()> {
        self.send(WorkerCommand::StopRecording)
    }

    fn send(&self, command: WorkerCommand) -> Result<()> {
        self.commands
            .as_ref()
            .ok_or_else(|| anyhow!("camera preview is not running"))?
            .send(command)
            .map_err(|_| anyhow!("camera worker has stopped"))
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.stop_preview();
    }
}

/// Back camera is the first device, front the second.
fn device_index(selection: CameraSelection) -> usize {
    match selection {
        CameraSelection::Back => 0,
        CameraSelection::Front => 1,
    }
}

struct PendingRecording {
    session_id: u64,
    output_path: PathBuf,
    audio: bool,
}

struct Worker {
    events: Sender<CameraEvent>,
    commands: Receiver<WorkerCommand>,
    frame_rate: u32,
    recording: Option<(u64, FfmpegRecorder)>,
    pending_recording: Option<PendingRecording>,
    capture_requested: bool,
}

impl Worker {
    fn run(mut self, index: usize) -> Result<()> {
        let camera = match KCamera::new_device(index) {
            Some(camera) => camera,
            None => {
                let err = CaptureError::device(format!("camera #{index} does not exist"));
                let _ = self.events.send(CameraEvent::DeviceFailed(err.clone()));
                return Err(anyhow!(err));
            }
        };
        camera.start();

        let mut rgba_buffer = vec![];
        loop {
            if !self.drain_commands() {
                break;
            }

            let frame = match camera.wait_for_frame() {
                Some(f) => f,
                None => {
                    debug!("no frame from camera #{index}");
                    std::thread::sleep(Duration::from_millis(10));
                    continue;
                }
            };

            let (width, height) = frame.size_u32();
            let frame_data = frame.data();
            bgra_to_rgba(frame_data.data_u8(), &mut rgba_buffer);

            self.feed_recorder(&rgba_buffer, width, height);

            if self.capture_requested {
                self.capture_requested = false;
                let event = match RgbaImage::from_raw(width, height, rgba_buffer.clone()) {
                    Some(image) => CameraEvent::PhotoCaptured(RawCapture { image, rotation_degrees: 0 }),
                    None => CameraEvent::PhotoFailed(CaptureError::photo("frame size mismatch")),
                };
                self.send(event)?;
            }

            let buf = SharedPixelBuffer::clone_from_slice(&rgba_buffer, width, height);
            self.send(CameraEvent::Preview(buf))?;
        }

        self.finish_recording();
        if let Some(pending) = self.pending_recording.take() {
            self.finalize(pending.session_id, Err(anyhow!("recording stopped before any frame was written")));
        }
        camera.stop();
        Ok(())
    }

    /// Returns false once the worker should shut down.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(WorkerCommand::TakePicture) => self.capture_requested = true,
                Ok(WorkerCommand::StartRecording { session_id, output_path, audio }) => {
                    self.finish_recording();
                    self.pending_recording = Some(PendingRecording { session_id, output_path, audio });
                }
                Ok(WorkerCommand::StopRecording) => {
                    if let Some(pending) = self.pending_recording.take() {
                        self.finalize(
                            pending.session_id,
                            Err(anyhow!("recording stopped before any frame was written")),
                        );
                    }
                    self.finish_recording();
                }
                Ok(WorkerCommand::Shutdown) | Err(TryRecvError::Disconnected) => return false,
                Err(TryRecvError::Empty) => return true,
            }
        }
    }

    fn feed_recorder(&mut self, rgba: &[u8], width: u32, height: u32) {
        if let Some(pending) = self.pending_recording.take() {
            match FfmpegRecorder::spawn(&pending.output_path, width, height, self.frame_rate, pending.audio) {
                Ok(recorder) => self.recording = Some((pending.session_id, recorder)),
                Err(err) => self.finalize(pending.session_id, Err(err)),
            }
        }
        let failed = match self.recording.as_mut() {
            Some((_, recorder)) => recorder.write_frame(rgba).err(),
            None => None,
        };
        if let Some(err) = failed {
            if let Some((session_id, recorder)) = self.recording.take() {
                drop(recorder);
                self.finalize(session_id, Err(err));
            }
        }
    }

    fn finish_recording(&mut self) {
        if let Some((session_id, recorder)) = self.recording.take() {
            let result = recorder.finish();
            self.finalize(session_id, result);
        }
    }

    fn finalize(&self, session_id: u64, result: Result<PathBuf>) {
        let result = result.map_err(|err| CaptureError::recording(format!("{err:#}")));
        let _ = self.events.send(CameraEvent::RecordingFinalized { session_id, result });
    }

    fn send(&self, event: CameraEvent) -> Result<()> {
        self.events.send(event).map_err(|_| anyhow!("event receiver dropped"))
    }
}

fn bgra_to_rgba(bgra: &[u8], rgba: &mut Vec<u8>) {
    rgba.resize(bgra.len(), 0);
    for (dst, src) in rgba.chunks_exact_mut(4).zip(bgra.chunks_exact(4)) {
        dst.copy_from_slice(&[src[2], src[1], src[0], src[3]]);
    }
}
