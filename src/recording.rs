use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use log::{debug, info};

use crate::error::CaptureError;

/// A video being written to `output_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    id: u64,
    output_path: PathBuf,
    audio_enabled: bool,
    started_at: Instant,
}

impl RecordingSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Holds at most one active [`RecordingSession`].
///
/// Session ids only ever increase, so a finalize callback that arrives late for
/// an older session can be told apart from the current one.
#[derive(Debug, Default)]
pub struct RecordingTracker {
    active: Option<RecordingSession>,
    next_id: u64,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&RecordingSession> {
        self.active.as_ref()
    }

    pub fn start(
        &mut self,
        output_path: PathBuf,
        audio_enabled: bool,
    ) -> Result<&RecordingSession, CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }
        self.next_id += 1;
        let session = RecordingSession {
            id: self.next_id,
            output_path,
            audio_enabled,
            started_at: Instant::now(),
        };
        info!(
            "recording #{} -> {} (audio: {})",
            session.id,
            session.output_path.display(),
            session.audio_enabled
        );
        Ok(self.active.insert(session))
    }

    /// Clears the active session, if any, and hands it back.
    pub fn stop(&mut self) -> Option<RecordingSession> {
        let session = self.active.take()?;
        info!("recording #{} stopped after {:?}", session.id, session.elapsed());
        Some(session)
    }

    /// Clears the active session only when it is the one identified by `id`.
    pub fn discard(&mut self, id: u64) -> Option<RecordingSession> {
        match &self.active {
            Some(session) if session.id == id => self.active.take(),
            _ => {
                debug!("recording #{id} is not active, nothing to discard");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_start_is_rejected() {
        let mut tracker = RecordingTracker::new();
        let first = tracker.start("a.mp4".into(), true).unwrap().id();
        assert_eq!(
            tracker.start("b.mp4".into(), false).unwrap_err(),
            CaptureError::AlreadyRecording
        );
        let active = tracker.active().unwrap();
        assert_eq!(active.id(), first);
        assert_eq!(active.output_path(), Path::new("a.mp4"));
        assert!(active.audio_enabled());
    }

    #[test]
    fn stop_returns_to_idle() {
        let mut tracker = RecordingTracker::new();
        tracker.start("a.mp4".into(), true).unwrap();
        assert!(tracker.is_recording());
        assert!(tracker.stop().is_some());
        assert!(!tracker.is_recording());
        assert!(tracker.stop().is_none());
    }

    #[test]
    fn ids_increase_across_sessions() {
        let mut tracker = RecordingTracker::new();
        let first = tracker.start("a.mp4".into(), true).unwrap().id();
        tracker.stop();
        let second = tracker.start("a.mp4".into(), true).unwrap().id();
        assert!(second > first);
    }

    #[test]
    fn stale_discard_keeps_newer_session() {
        let mut tracker = RecordingTracker::new();
        let old = tracker.start("a.mp4".into(), true).unwrap().id();
        tracker.stop();
        let current = tracker.start("a.mp4".into(), true).unwrap().id();

        assert!(tracker.discard(old).is_none());
        assert_eq!(tracker.active().map(RecordingSession::id), Some(current));
        assert!(tracker.discard(current).is_some());
        assert!(!tracker.is_recording());
    }
}
