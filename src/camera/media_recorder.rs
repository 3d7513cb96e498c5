use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use jni::{
    objects::{GlobalRef, JObject, JValue},
    JNIEnv, JavaVM,
};
use log::{info, warn};
use ndk_sys::{ANativeWindow, ANativeWindow_fromSurface, ANativeWindow_release};
use slint::android::AndroidApp;

use super::jni_env::{java_vm, sdk_version, with_activity, JavaResultExt};

// android.media.MediaRecorder constants
const AUDIO_SOURCE_MIC: i32 = 1;
const VIDEO_SOURCE_SURFACE: i32 = 2;
const OUTPUT_FORMAT_MPEG_4: i32 = 2;
const VIDEO_ENCODER_H264: i32 = 2;
const AUDIO_ENCODER_AAC: i32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct RecorderSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub orientation_hint: i32,
    pub audio: bool,
}

impl RecorderSettings {
    fn bit_rate(&self) -> i32 {
        // ~0.2 bits per pixel per frame
        (self.width as u64 * self.height as u64 * self.frame_rate as u64 / 5).min(i32::MAX as u64) as i32
    }
}

/// A prepared `android.media.MediaRecorder` fed by the camera through its
/// input surface.
pub struct MediaRecorder {
    vm: JavaVM,
    recorder: Option<GlobalRef>,
    window: *mut ANativeWindow,
    session_id: u64,
    output_path: PathBuf,
    started: bool,
}

impl MediaRecorder {
    pub fn prepare(
        app: &AndroidApp,
        session_id: u64,
        output_path: &Path,
        settings: &RecorderSettings,
    ) -> Result<Self> {
        let sdk_version = sdk_version(app)?;
        let (recorder, window) = with_activity(app, |env, activity| {
            let recorder = if sdk_version >= 31 {
                env.new_object(
                    "android/media/MediaRecorder",
                    "(Landroid/content/Context;)V",
                    &[JValue::Object(activity)],
                )
            } else {
                env.new_object("android/media/MediaRecorder", "()V", &[])
            }
            .java_err(env)?;

            if let Err(err) = configure(env, &recorder, output_path, settings) {
                let _ = env.call_method(&recorder, "release", "()V", &[]);
                let _ = env.exception_clear();
                return Err(err);
            }

            let surface = env
                .call_method(&recorder, "getSurface", "()Landroid/view/Surface;", &[])
                .java_err(env)?
                .l()?;
            let window = unsafe {
                ANativeWindow_fromSurface(env.get_raw() as *mut _, surface.as_raw() as *mut _)
            };
            if window.is_null() {
                let _ = env.call_method(&recorder, "release", "()V", &[]);
                return Err(anyhow!("recorder surface has no native window"));
            }
            Ok((env.new_global_ref(&recorder)?, window))
        })?;

        info!(
            "MediaRecorder prepared {}x{}@{} audio:{} -> {}",
            settings.width,
            settings.height,
            settings.frame_rate,
            settings.audio,
            output_path.display()
        );
        Ok(Self {
            vm: java_vm(app)?,
            recorder: Some(recorder),
            window,
            session_id,
            output_path: output_path.to_path_buf(),
            started: false,
        })
    }

    pub fn window(&self) -> *mut ANativeWindow {
        self.window
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn start(&mut self) -> Result<()> {
        self.call("start")?;
        self.started = true;
        Ok(())
    }

    /// Stops encoding and releases the recorder. A recording that never
    /// received a frame fails here.
    pub fn stop(mut self) -> Result<PathBuf> {
        let stopped = if self.started {
            self.call("stop")
        } else {
            Err(anyhow!("recording was never started"))
        };
        self.started = false;
        self.release();
        stopped.map(|_| self.output_path.clone())
    }

    fn call(&self, method: &str) -> Result<()> {
        let recorder = self
            .recorder
            .as_ref()
            .ok_or_else(|| anyhow!("MediaRecorder already released"))?;
        let mut env = self.vm.attach_current_thread()?;
        env.call_method(recorder, method, "()V", &[]).java_err(&mut env)?;
        Ok(())
    }

    fn release(&mut self) {
        if self.started {
            if let Err(err) = self.call("stop") {
                warn!("MediaRecorder stop: {err:#}");
            }
            self.started = false;
        }
        if self.recorder.is_some() {
            if let Err(err) = self.call("release") {
                warn!("MediaRecorder release: {err:#}");
            }
            self.recorder = None;
        }
        if !self.window.is_null() {
            unsafe { ANativeWindow_release(self.window) };
            self.window = std::ptr::null_mut();
        }
    }
}

impl Drop for MediaRecorder {
    fn drop(&mut self) {
        self.release();
    }
}

fn configure(
    env: &mut JNIEnv,
    recorder: &JObject,
    output_path: &Path,
    settings: &RecorderSettings,
) -> Result<()> {
    if settings.audio {
        set_int(env, recorder, "setAudioSource", AUDIO_SOURCE_MIC)?;
    }
    set_int(env, recorder, "setVideoSource", VIDEO_SOURCE_SURFACE)?;
    set_int(env, recorder, "setOutputFormat", OUTPUT_FORMAT_MPEG_4)?;

    let path = env.new_string(output_path.to_string_lossy())?;
    env.call_method(
        recorder,
        "setOutputFile",
        "(Ljava/lang/String;)V",
        &[JValue::Object(&path)],
    )
    .java_err(env)?;

    set_int(env, recorder, "setVideoEncodingBitRate", settings.bit_rate())?;
    set_int(env, recorder, "setVideoFrameRate", settings.frame_rate as i32)?;
    env.call_method(
        recorder,
        "setVideoSize",
        "(II)V",
        &[JValue::Int(settings.width as i32), JValue::Int(settings.height as i32)],
    )
    .java_err(env)?;
    set_int(env, recorder, "setVideoEncoder", VIDEO_ENCODER_H264)?;
    if settings.audio {
        set_int(env, recorder, "setAudioEncoder", AUDIO_ENCODER_AAC)?;
    }
    set_int(env, recorder, "setOrientationHint", settings.orientation_hint)?;

    env.call_method(recorder, "prepare", "()V", &[]).java_err(env)?;
    Ok(())
}

fn set_int(env: &mut JNIEnv, recorder: &JObject, method: &str, value: i32) -> Result<()> {
    env.call_method(recorder, method, "(I)V", &[JValue::Int(value)])
        .java_err(env)?;
    Ok(())
}
