use std::{
    ffi::{c_char, c_int, c_void, CStr, CString},
    mem::zeroed,
    path::PathBuf,
    ptr::null_mut,
    slice,
    sync::{
        atomic::{AtomicBool, AtomicI32, Ordering},
        mpsc::Sender,
    },
};

use anyhow::{anyhow, Result};
use image::{imageops::flip_horizontal_in_place, RgbaImage};
use log::{debug, error, info, warn};
use ndk_sys::{
    acamera_metadata_tag, camera_status_t, media_status_t, ACameraCaptureSession,
    ACameraCaptureSession_close, ACameraCaptureSession_setRepeatingRequest,
    ACameraCaptureSession_stateCallbacks, ACameraCaptureSession_stopRepeating, ACameraDevice,
    ACameraDevice_StateCallbacks, ACameraDevice_close, ACameraDevice_createCaptureRequest,
    ACameraDevice_createCaptureSession, ACameraDevice_getId, ACameraDevice_request_template,
    ACameraManager, ACameraManager_create, ACameraManager_delete,
    ACameraManager_deleteCameraIdList, ACameraManager_getCameraCharacteristics,
    ACameraManager_getCameraIdList, ACameraManager_openCamera, ACameraMetadata,
    ACameraMetadata_const_entry, ACameraMetadata_free, ACameraMetadata_getConstEntry,
    ACameraOutputTarget, ACameraOutputTarget_create, ACameraOutputTarget_free, ACaptureRequest,
    ACaptureRequest_addTarget, ACaptureRequest_free, ACaptureSessionOutput,
    ACaptureSessionOutputContainer, ACaptureSessionOutputContainer_add,
    ACaptureSessionOutputContainer_create, ACaptureSessionOutputContainer_free,
    ACaptureSessionOutput_create, ACaptureSessionOutput_free, AImage, AImageReader,
    AImageReader_ImageListener, AImageReader_acquireLatestImage, AImageReader_delete,
    AImageReader_getWindow, AImageReader_new, AImageReader_setImageListener, AImage_delete,
    AImage_getFormat, AImage_getHeight, AImage_getPlaneData, AImage_getPlanePixelStride,
    AImage_getPlaneRowStride, AImage_getWidth, ANativeWindow, AIMAGE_FORMATS,
};
use slint::{android::AndroidApp, SharedPixelBuffer};

use super::{
    choose_preview_size, jni_env,
    media_recorder::{MediaRecorder, RecorderSettings},
    sensor_rotation,
    yuv::{yuv420_to_rgba, Yuv420Planes},
    CameraEvent, CameraSelection, RawCapture,
};
use crate::{config::AppConfig, error::CaptureError, recording::RecordingSession, rotation};

#[link(name = "camera2ndk")]
extern "C" {}

#[link(name = "mediandk")]
extern "C" {}

#[link(name = "android")]
extern "C" {}

// ACAMERA_LENS_FACING values
const LENS_FACING_FRONT: u8 = 0;
const LENS_FACING_BACK: u8 = 1;

/// State shared with the NDK callback threads. Lives in a `Box` owned by
/// [`AndroidCamera`] so its address stays put while callbacks are registered.
struct FrameSink {
    events: Sender<CameraEvent>,
    capture_requested: AtomicBool,
    capture_rotation: AtomicI32,
    preview_rotation: AtomicI32,
    mirror_preview: AtomicBool,
}

impl FrameSink {
    fn send(&self, event: CameraEvent) {
        // receiver is gone only while the app shuts down
        let _ = self.events.send(event);
    }

    fn as_context(&self) -> *mut c_void {
        self as *const FrameSink as *mut c_void
    }

    fn on_image_available(&self, reader: *mut AImageReader) -> Result<()> {
        let frame = unsafe {
            let Some(image) = AcquiredImage::latest(reader)? else {
                return Ok(());
            };
            image.to_rgba()?
        };

        if self.capture_requested.swap(false, Ordering::AcqRel) {
            let rotation_degrees = self.capture_rotation.load(Ordering::Acquire);
            self.send(CameraEvent::PhotoCaptured(RawCapture {
                image: frame.clone(),
                rotation_degrees,
            }));
        }

        let (width, height) = frame.dimensions();
        let mut upright =
            rotation::normalize(&frame, self.preview_rotation.load(Ordering::Acquire), width, height);
        if self.mirror_preview.load(Ordering::Acquire) {
            flip_horizontal_in_place(&mut upright);
        }
        let buf = SharedPixelBuffer::clone_from_slice(upright.as_raw(), upright.width(), upright.height());
        self.send(CameraEvent::Preview(buf));
        Ok(())
    }
}

/// Image acquired from an `AImageReader`, returned to it on drop.
struct AcquiredImage(*mut AImage);

impl AcquiredImage {
    unsafe fn latest(reader: *mut AImageReader) -> Result<Option<Self>> {
        let mut image = null_mut();
        let status = AImageReader_acquireLatestImage(reader, &mut image);
        if status == media_status_t::AMEDIA_IMGREADER_NO_BUFFER_AVAILABLE {
            return Ok(None);
        }
        check_media(status, "AImageReader_acquireLatestImage")?;
        Ok(Some(Self(image)))
    }

    unsafe fn to_rgba(&self) -> Result<RgbaImage> {
        let mut format = 0;
        check_media(AImage_getFormat(self.0, &mut format), "AImage_getFormat")?;
        if format != AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32 {
            return Err(anyhow!("unexpected image format {format}"));
        }
        let (mut width, mut height) = (0, 0);
        check_media(AImage_getWidth(self.0, &mut width), "AImage_getWidth")?;
        check_media(AImage_getHeight(self.0, &mut height), "AImage_getHeight")?;

        let (y, y_row_stride, _) = self.plane(0)?;
        let (u, uv_row_stride, uv_pixel_stride) = self.plane(1)?;
        let (v, _, _) = self.plane(2)?;
        yuv420_to_rgba(&Yuv420Planes {
            width: width as u32,
            height: height as u32,
            y,
            u,
            v,
            y_row_stride,
            uv_row_stride,
            uv_pixel_stride,
        })
    }

    /// (data, row stride, pixel stride)
    unsafe fn plane(&self, index: c_int) -> Result<(&[u8], usize, usize)> {
        let mut data = null_mut();
        let mut len = 0;
        check_media(AImage_getPlaneData(self.0, index, &mut data, &mut len), "AImage_getPlaneData")?;
        let mut row_stride = 0;
        check_media(
            AImage_getPlaneRowStride(self.0, index, &mut row_stride),
            "AImage_getPlaneRowStride",
        )?;
        let mut pixel_stride = 0;
        check_media(
            AImage_getPlanePixelStride(self.0, index, &mut pixel_stride),
            "AImage_getPlanePixelStride",
        )?;
        if data.is_null() || len <= 0 {
            return Err(anyhow!("plane {index} is empty"));
        }
        Ok((
            slice::from_raw_parts(data, len as usize),
            row_stride as usize,
            pixel_stride as usize,
        ))
    }
}

impl Drop for AcquiredImage {
    fn drop(&mut self) {
        unsafe { AImage_delete(self.0) };
    }
}

struct LensInfo {
    id: CString,
    facing: u8,
    sensor_orientation: i32,
    yuv_sizes: Vec<(u32, u32)>,
}

/// One configured capture session and everything it was built from.
struct CaptureSession {
    container: *mut ACaptureSessionOutputContainer,
    request: *mut ACaptureRequest,
    session: *mut ACameraCaptureSession,
    outputs: Vec<(*mut ACaptureSessionOutput, *mut ACameraOutputTarget)>,
}

impl CaptureSession {
    fn empty() -> Self {
        Self {
            container: null_mut(),
            request: null_mut(),
            session: null_mut(),
            outputs: vec![],
        }
    }

    unsafe fn open(
        &mut self,
        device: *mut ACameraDevice,
        callbacks: &ACameraCaptureSession_stateCallbacks,
        template: ACameraDevice_request_template,
        windows: &[*mut ANativeWindow],
    ) -> Result<()> {
        check_camera(
            ACaptureSessionOutputContainer_create(&mut self.container),
            "ACaptureSessionOutputContainer_create",
        )?;
        check_camera(
            ACameraDevice_createCaptureRequest(device, template, &mut self.request),
            "ACameraDevice_createCaptureRequest",
        )?;
        for &window in windows {
            let mut output = null_mut();
            check_camera(ACaptureSessionOutput_create(window, &mut output), "ACaptureSessionOutput_create")?;
            let mut target = null_mut();
            if let Err(err) = check_camera(
                ACameraOutputTarget_create(window, &mut target),
                "ACameraOutputTarget_create",
            ) {
                ACaptureSessionOutput_free(output);
                return Err(err);
            }
            self.outputs.push((output, target));
            check_camera(
                ACaptureSessionOutputContainer_add(self.container, output),
                "ACaptureSessionOutputContainer_add",
            )?;
            check_camera(ACaptureRequest_addTarget(self.request, target), "ACaptureRequest_addTarget")?;
        }
        check_camera(
            ACameraDevice_createCaptureSession(device, self.container, callbacks, &mut self.session),
            "ACameraDevice_createCaptureSession",
        )?;
        check_camera(
            ACameraCaptureSession_setRepeatingRequest(self.session, null_mut(), 1, &mut self.request, null_mut()),
            "ACameraCaptureSession_setRepeatingRequest",
        )
    }

    unsafe fn close(&mut self) {
        if !self.session.is_null() {
            let _ = ACameraCaptureSession_stopRepeating(self.session);
            ACameraCaptureSession_close(self.session);
            self.session = null_mut();
        }
        if !self.request.is_null() {
            ACaptureRequest_free(self.request);
            self.request = null_mut();
        }
        for (output, target) in self.outputs.drain(..) {
            ACameraOutputTarget_free(target);
            ACaptureSessionOutput_free(output);
        }
        if !self.container.is_null() {
            ACaptureSessionOutputContainer_free(self.container);
            self.container = null_mut();
        }
    }
}

pub struct AndroidCamera {
    app: AndroidApp,
    wanted_size: (u32, u32),
    frame_rate: u32,
    sink: Box<FrameSink>,
    device_callbacks: Box<ACameraDevice_StateCallbacks>,
    session_callbacks: Box<ACameraCaptureSession_stateCallbacks>,
    image_listener: Box<AImageReader_ImageListener>,
    lens: CameraSelection,
    sensor_orientation: i32,
    preview_size: (u32, u32),
    camera_device: *mut ACameraDevice,
    image_reader: *mut AImageReader,
    reader_window: *mut ANativeWindow,
    session: Option<CaptureSession>,
    recorder: Option<MediaRecorder>,
}

impl AndroidCamera {
    pub fn new(app: AndroidApp, events: Sender<CameraEvent>, config: &AppConfig) -> Self {
        let sink = Box::new(FrameSink {
            events,
            capture_requested: AtomicBool::new(false),
            capture_rotation: AtomicI32::new(0),
            preview_rotation: AtomicI32::new(0),
            mirror_preview: AtomicBool::new(false),
        });

        let mut device_callbacks: Box<ACameraDevice_StateCallbacks> = Box::new(unsafe { zeroed() });
        device_callbacks.context = sink.as_context();
        device_callbacks.onDisconnected = Some(on_disconnected);
        device_callbacks.onError = Some(on_device_error);

        let mut session_callbacks: Box<ACameraCaptureSession_stateCallbacks> =
            Box::new(unsafe { zeroed() });
        session_callbacks.onReady = Some(capture_session_on_ready);
        session_callbacks.onActive = Some(capture_session_on_active);
        session_callbacks.onClosed = Some(capture_session_on_closed);

        let image_listener = Box::new(AImageReader_ImageListener {
            context: sink.as_context(),
            onImageAvailable: Some(on_image_available),
        });

        Self {
            app,
            wanted_size: (config.preview_width, config.preview_height),
            frame_rate: config.frame_rate,
            sink,
            device_callbacks,
            session_callbacks,
            image_listener,
            lens: config.initial_camera,
            sensor_orientation: 0,
            preview_size: (0, 0),
            camera_device: null_mut(),
            image_reader: null_mut(),
            reader_window: null_mut(),
            session: None,
            recorder: None,
        }
    }

    pub fn has_camera_permission(&self) -> bool {
        jni_env::check_self_permission(&self.app, jni_env::CAMERA_PERMISSION).unwrap_or_else(|err| {
            warn!("checkSelfPermission({}) failed: {err:#}", jni_env::CAMERA_PERMISSION);
            false
        })
    }

    pub fn has_required_permissions(&self) -> bool {
        jni_env::REQUIRED_PERMISSIONS.iter().all(|permission| {
            jni_env::check_self_permission(&self.app, permission).unwrap_or_else(|err| {
                warn!("checkSelfPermission({permission}) failed: {err:#}");
                false
            })
        })
    }

    pub fn request_permissions(&mut self) -> Result<()> {
        jni_env::request_capture_permissions(&self.app)
    }

    pub fn private_storage_dir(&self) -> Result<PathBuf> {
        jni_env::files_dir(&self.app)
    }

    pub fn start_preview(&mut self, selection: CameraSelection) -> Result<()> {
        self.stop_preview();
        if !jni_env::check_self_permission(&self.app, jni_env::CAMERA_PERMISSION)? {
            jni_env::request_capture_permissions(&self.app)?;
            return Err(anyhow!("camera permission not granted"));
        }
        let result = unsafe { self.open(selection) };
        if result.is_err() {
            self.stop_preview();
        }
        result
    }

    unsafe fn open(&mut self, selection: CameraSelection) -> Result<()> {
        let manager = ACameraManager_create();
        if manager.is_null() {
            return Err(anyhow!("ACameraManager_create returned null"));
        }
        let result = self.open_with(manager, selection);
        ACameraManager_delete(manager);
        result
    }

    unsafe fn open_with(&mut self, manager: *mut ACameraManager, selection: CameraSelection) -> Result<()> {
        let (wanted_facing, facing_name) = match selection {
            CameraSelection::Front => (LENS_FACING_FRONT, "front"),
            CameraSelection::Back => (LENS_FACING_BACK, "back"),
        };
        let lens = list_lenses(manager)?
            .into_iter()
            .find(|lens| lens.facing == wanted_facing)
            .ok_or_else(|| anyhow!("this device has no {facing_name} camera"))?;
        let (width, height) = choose_preview_size(&lens.yuv_sizes, self.wanted_size)
            .ok_or_else(|| anyhow!("{facing_name} camera has no YUV_420_888 output"))?;

        check_camera(
            ACameraManager_openCamera(
                manager,
                lens.id.as_ptr(),
                &mut *self.device_callbacks,
                &mut self.camera_device,
            ),
            "ACameraManager_openCamera",
        )?;
        self.lens = selection;
        self.sensor_orientation = lens.sensor_orientation;
        self.preview_size = (width, height);
        let rotation = self.update_rotation();
        info!(
            "opened {facing_name} camera {:?} {width}x{height}, sensor orientation {}, rotation {rotation}",
            lens.id, lens.sensor_orientation
        );

        self.create_image_reader(width, height)?;
        let windows = [self.reader_window];
        self.start_session(ACameraDevice_request_template::TEMPLATE_PREVIEW, &windows)
    }

    /// Refreshes the rotation used for preview frames and captures from the
    /// current display rotation.
    fn update_rotation(&self) -> i32 {
        let display_rotation = jni_env::display_rotation(&self.app).unwrap_or_else(|err| {
            warn!("display rotation unavailable: {err:#}");
            0
        });
        let rotation = sensor_rotation(self.sensor_orientation, self.lens, display_rotation);
        self.sink.preview_rotation.store(rotation, Ordering::Release);
        self.sink.capture_rotation.store(rotation, Ordering::Release);
        self.sink
            .mirror_preview
            .store(self.lens == CameraSelection::Front, Ordering::Release);
        rotation
    }

    unsafe fn create_image_reader(&mut self, width: u32, height: u32) -> Result<()> {
        check_media(
            AImageReader_new(
                width as i32,
                height as i32,
                AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32,
                2,
                &mut self.image_reader,
            ),
            "AImageReader_new",
        )?;
        check_media(
            AImageReader_setImageListener(self.image_reader, &mut *self.image_listener),
            "AImageReader_setImageListener",
        )?;
        check_media(
            AImageReader_getWindow(self.image_reader, &mut self.reader_window),
            "AImageReader_getWindow",
        )
    }

    unsafe fn start_session(
        &mut self,
        template: ACameraDevice_request_template,
        windows: &[*mut ANativeWindow],
    ) -> Result<()> {
        self.close_session();
        let mut session = CaptureSession::empty();
        match session.open(self.camera_device, &self.session_callbacks, template, windows) {
            Ok(()) => {
                self.session = Some(session);
                Ok(())
            }
            Err(err) => {
                session.close();
                Err(err)
            }
        }
    }

    unsafe fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }

    fn resume_preview_session(&mut self) {
        let windows = [self.reader_window];
        let result = unsafe { self.start_session(ACameraDevice_request_template::TEMPLATE_PREVIEW, &windows) };
        if let Err(err) = result {
            error!(target: "camera", "preview did not resume: {err:#}");
            self.sink
                .send(CameraEvent::DeviceFailed(CaptureError::device(format!("{err:#}"))));
        }
    }

    pub fn stop_preview(&mut self) {
        unsafe {
            self.close_session();
            if let Some(recorder) = self.recorder.take() {
                self.finalize(recorder);
            }
            if !self.image_reader.is_null() {
                AImageReader_delete(self.image_reader);
                self.image_reader = null_mut();
                self.reader_window = null_mut();
            }
            if !self.camera_device.is_null() {
                if let Err(err) = check_camera(ACameraDevice_close(self.camera_device), "ACameraDevice_close") {
                    error!("{err:#}");
                }
                self.camera_device = null_mut();
                info!("Close Camera");
            }
        }
        if self.sink.capture_requested.swap(false, Ordering::AcqRel) {
            self.sink.send(CameraEvent::PhotoFailed(CaptureError::photo(
                "camera closed before the photo was taken",
            )));
        }
    }

    pub fn take_picture(&mut self) -> Result<()> {
        if self.camera_device.is_null() || self.image_reader.is_null() {
            return Err(anyhow!("camera is not open"));
        }
        self.update_rotation();
        self.sink.capture_requested.store(true, Ordering::Release);
        Ok(())
    }

    pub fn start_recording(&mut self, session: &RecordingSession) -> Result<()> {
        if self.camera_device.is_null() || self.image_reader.is_null() {
            return Err(anyhow!("camera is not open"));
        }
        if self.recorder.is_some() {
            return Err(anyhow!("recorder is already running"));
        }
        let audio = session.audio_enabled()
            && jni_env::check_self_permission(&self.app, jni_env::RECORD_AUDIO_PERMISSION)?;
        let (width, height) = self.preview_size;
        let settings = RecorderSettings {
            width,
            height,
            frame_rate: self.frame_rate,
            orientation_hint: self.update_rotation(),
            audio,
        };
        let mut recorder = MediaRecorder::prepare(&self.app, session.id(), session.output_path(), &settings)?;

        let windows = [self.reader_window, recorder.window()];
        let started = unsafe { self.start_session(ACameraDevice_request_template::TEMPLATE_RECORD, &windows) }
            .and_then(|()| recorder.start());
        if let Err(err) = started {
            unsafe { self.close_session() };
            drop(recorder);
            self.resume_preview_session();
            return Err(err);
        }
        info!("recording session {} started", session.id());
        self.recorder = Some(recorder);
        Ok(())
    }

    pub fn stop_recording(&mut self) -> Result<()> {
        let recorder = self
            .recorder
            .take()
            .ok_or_else(|| anyhow!("no recording in progress"))?;
        unsafe { self.close_session() };
        self.finalize(recorder);
        self.resume_preview_session();
        Ok(())
    }

    /// Stops the recorder and reports how the file turned out.
    fn finalize(&self, recorder: MediaRecorder) {
        let session_id = recorder.session_id();
        let result = recorder.stop().map_err(|err| CaptureError::recording(format!("{err:#}")));
        match &result {
            Ok(path) => info!("recording session {session_id} saved to {}", path.display()),
            Err(err) => warn!("recording session {session_id} failed: {err}"),
        }
        self.sink
            .send(CameraEvent::RecordingFinalized { session_id, result });
    }
}

impl Drop for AndroidCamera {
    fn drop(&mut self) {
        self.stop_preview();
    }
}

unsafe fn list_lenses(manager: *mut ACameraManager) -> Result<Vec<LensInfo>> {
    let mut id_list = null_mut();
    check_camera(
        ACameraManager_getCameraIdList(manager, &mut id_list),
        "ACameraManager_getCameraIdList",
    )?;
    if id_list.is_null() {
        return Err(anyhow!("camera id list is null"));
    }

    let ids = slice::from_raw_parts((*id_list).cameraIds, (*id_list).numCameras.max(0) as usize);
    let mut lenses = vec![];
    for &id in ids {
        let id = CStr::from_ptr(id).to_owned();
        let mut metadata = null_mut();
        let status = ACameraManager_getCameraCharacteristics(manager, id.as_ptr(), &mut metadata);
        if status != camera_status_t::ACAMERA_OK {
            warn!("no characteristics for camera {id:?}: {status:?}");
            continue;
        }
        let lens = read_lens(id, metadata);
        ACameraMetadata_free(metadata);
        match lens {
            Ok(lens) => {
                debug!("camera {:?} facing {} sizes {:?}", lens.id, lens.facing, lens.yuv_sizes);
                lenses.push(lens);
            }
            Err(err) => warn!("skipping camera: {err:#}"),
        }
    }
    ACameraManager_deleteCameraIdList(id_list);

    if lenses.is_empty() {
        return Err(anyhow!("No camera device detected."));
    }
    Ok(lenses)
}

unsafe fn read_lens(id: CString, metadata: *const ACameraMetadata) -> Result<LensInfo> {
    let facing = const_entry(metadata, acamera_metadata_tag::ACAMERA_LENS_FACING)?;
    let orientation = const_entry(metadata, acamera_metadata_tag::ACAMERA_SENSOR_ORIENTATION)?;
    if facing.count < 1 || orientation.count < 1 {
        return Err(anyhow!("camera {id:?} lacks facing or orientation"));
    }
    Ok(LensInfo {
        facing: *facing.data.u8_,
        sensor_orientation: *orientation.data.i32_,
        yuv_sizes: yuv_output_sizes(metadata)?,
        id,
    })
}

unsafe fn const_entry(
    metadata: *const ACameraMetadata,
    tag: acamera_metadata_tag,
) -> Result<ACameraMetadata_const_entry> {
    let mut entry: ACameraMetadata_const_entry = zeroed();
    check_camera(
        ACameraMetadata_getConstEntry(metadata, tag.0, &mut entry),
        "ACameraMetadata_getConstEntry",
    )?;
    Ok(entry)
}

/// YUV_420_888 output sizes. Stream configurations come in groups of four:
/// format, width, height, is-input.
unsafe fn yuv_output_sizes(metadata: *const ACameraMetadata) -> Result<Vec<(u32, u32)>> {
    let configs = const_entry(
        metadata,
        acamera_metadata_tag::ACAMERA_SCALER_AVAILABLE_STREAM_CONFIGURATIONS,
    )?;
    let data = slice::from_raw_parts(configs.data.i32_, configs.count as usize);
    Ok(data
        .chunks_exact(4)
        .filter(|c| c[0] == AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32 && c[3] == 0)
        .map(|c| (c[1] as u32, c[2] as u32))
        .collect())
}

fn check_camera(status: camera_status_t, what: &str) -> Result<()> {
    if status == camera_status_t::ACAMERA_OK {
        Ok(())
    } else {
        Err(anyhow!("{what} failed: {status:?}"))
    }
}

fn check_media(status: media_status_t, what: &str) -> Result<()> {
    if status == media_status_t::AMEDIA_OK {
        Ok(())
    } else {
        Err(anyhow!("{what} failed: {status:?}"))
    }
}

unsafe fn device_id(device: *mut ACameraDevice) -> String {
    get_cstr(ACameraDevice_getId(device)).unwrap_or("?").to_string()
}

unsafe fn get_cstr<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

unsafe extern "C" fn on_image_available(context: *mut c_void, reader: *mut AImageReader) {
    let sink = &*(context as *const FrameSink);
    if let Err(err) = sink.on_image_available(reader) {
        if sink.capture_requested.swap(false, Ordering::AcqRel) {
            sink.send(CameraEvent::PhotoFailed(CaptureError::photo(format!("{err:#}"))));
        } else {
            debug!("preview frame dropped: {err:#}");
        }
    }
}

unsafe extern "C" fn on_disconnected(context: *mut c_void, device: *mut ACameraDevice) {
    let sink = &*(context as *const FrameSink);
    let id = device_id(device);
    warn!("Camera(id: {id}) is disconnected.");
    sink.send(CameraEvent::DeviceFailed(CaptureError::device(format!(
        "camera {id} was disconnected"
    ))));
}

unsafe extern "C" fn on_device_error(context: *mut c_void, device: *mut ACameraDevice, error: c_int) {
    let sink = &*(context as *const FrameSink);
    let id = device_id(device);
    error!(target: "camera", "Error(code: {error}) on Camera(id: {id}).");
    sink.send(CameraEvent::DeviceFailed(CaptureError::device(format!(
        "camera {id} reported error {error}"
    ))));
}

unsafe extern "C" fn capture_session_on_ready(_context: *mut c_void, session: *mut ACameraCaptureSession) {
    debug!("Session is ready. {:?}", session);
}

unsafe extern "C" fn capture_session_on_active(_context: *mut c_void, session: *mut ACameraCaptureSession) {
    debug!("Session is activated. {:?}", session);
}

unsafe extern "C" fn capture_session_on_closed(_context: *mut c_void, session: *mut ACameraCaptureSession) {
    debug!("Session is closed. {:?}", session);
}
