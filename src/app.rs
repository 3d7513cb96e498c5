use std::{cell::RefCell, rc::Rc, sync::mpsc::channel, time::Duration};

use anyhow::Result;
use log::info;
use slint::{Image, Model, ModelRc, SharedPixelBuffer, Timer, TimerMode, VecModel};

use crate::{
    camera::{Camera, CameraEvent},
    config::AppConfig,
    controller::CaptureControl,
    gallery::CapturedImage,
};

slint::slint! {
    import { Button, VerticalBox, HorizontalBox, ListView } from "std-widgets.slint";

    export component MainWindow inherits Window {
        in-out property <image> camera-texture <=> camera-texture.source;
        in property <[image]> photos;
        in property <bool> recording;
        in property <string> toast;
        in property <bool> toast-is-error;
        in-out property <bool> gallery-open: false;

        callback switch-camera();
        callback take-photo();
        callback record-video();

        Rectangle {
            width: 100%;
            height: 100%;
            background: black;

            camera-texture := Image {
                width: 100%;
                height: 100%;
                image-fit: contain;
            }

            if root.recording : Rectangle {
                x: 16px;
                y: 16px;
                width: 16px;
                height: 16px;
                border-radius: 8px;
                background: red;
            }

            Rectangle {
                x: 0px;
                y: parent.height - self.height;
                width: parent.width;
                height: 72px;
                HorizontalBox {
                    alignment: space-around;
                    Button {
                        text: "Switch camera";
                        clicked => { root.switch-camera(); }
                    }
                    Button {
                        text: "Open gallery";
                        clicked => { root.gallery-open = true; }
                    }
                    Button {
                        text: "Take photo";
                        clicked => { root.take-photo(); }
                    }
                    Button {
                        text: root.recording ? "Stop recording" : "Record video";
                        clicked => { root.record-video(); }
                    }
                }
            }

            if root.gallery-open : Rectangle {
                x: 0px;
                y: parent.height * 0.4;
                width: parent.width;
                height: parent.height * 0.6;
                background: #202020;
                VerticalBox {
                    HorizontalBox {
                        Text {
                            text: root.photos.length + " photos";
                            color: white;
                            vertical-alignment: center;
                        }
                        Button {
                            text: "Close";
                            clicked => { root.gallery-open = false; }
                        }
                    }
                    ListView {
                        for photo in root.photos : Rectangle {
                            height: 240px;
                            Image {
                                width: parent.width;
                                height: parent.height;
                                source: photo;
                                image-fit: contain;
                            }
                        }
                    }
                }
            }

            if root.toast != "" : Rectangle {
                x: (parent.width - self.width) / 2;
                y: parent.height - 140px;
                width: min(parent.width - 32px, 480px);
                height: 48px;
                border-radius: 8px;
                background: root.toast-is-error ? #8b1a1a : #303030;
                Text {
                    text: root.toast;
                    color: white;
                    wrap: word-wrap;
                    horizontal-alignment: center;
                    vertical-alignment: center;
                }
            }
        }
    }
}

pub fn run(#[cfg(target_os = "android")] android_app: slint::android::AndroidApp) -> Result<()> {
    let config = AppConfig::from_env()?;
    let app = MainWindow::new()?;

    let (event_sender, event_receiver) = channel();
    let camera = Camera::new(
        #[cfg(target_os = "android")]
        android_app,
        event_sender,
        &config,
    )?;
    let toast_duration = config.toast_duration;
    let control = Rc::new(RefCell::new(CaptureControl::new(camera, config)));
    control.borrow_mut().request_permissions();

    let photos = Rc::new(VecModel::<Image>::default());
    app.set_photos(ModelRc::from(photos.clone()));
    control.borrow_mut().gallery_mut().subscribe({
        let photos = photos.clone();
        move |list: &[CapturedImage]| {
            for photo in list.iter().skip(photos.row_count()) {
                photos.push(to_slint_image(photo));
            }
        }
    });

    let toast_timer = Rc::new(Timer::default());
    let app_weak = app.as_weak();
    let control_clone = control.clone();
    let timer = Timer::default();
    timer.start(TimerMode::Repeated, Duration::from_millis(10), move || {
        let Some(app) = app_weak.upgrade() else {
            return;
        };
        let mut control = control_clone.borrow_mut();
        control.ensure_preview();

        let mut latest_frame = None;
        while let Ok(event) = event_receiver.try_recv() {
            match event {
                CameraEvent::Preview(buffer) => latest_frame = Some(buffer),
                other => control.handle_event(other),
            }
        }
        if let Some(buffer) = latest_frame {
            app.set_camera_texture(Image::from_rgba8(buffer));
        }
        app.set_recording(control.is_recording());

        if let Some(notification) = control.take_notifications().pop() {
            app.set_toast(notification.message.into());
            app.set_toast_is_error(notification.kind == crate::controller::NotificationKind::Error);
            let app_weak = app.as_weak();
            toast_timer.start(TimerMode::SingleShot, toast_duration, move || {
                if let Some(app) = app_weak.upgrade() {
                    app.set_toast("".into());
                }
            });
        }
    });

    app.on_switch_camera({
        let control = control.clone();
        move || control.borrow_mut().switch_camera()
    });
    app.on_take_photo({
        let control = control.clone();
        move || control.borrow_mut().take_photo()
    });
    app.on_record_video({
        let control = control.clone();
        move || control.borrow_mut().toggle_recording()
    });

    info!("capture window ready");
    app.run()?;
    Ok(())
}

fn to_slint_image(photo: &CapturedImage) -> Image {
    let buffer = SharedPixelBuffer::clone_from_slice(photo.as_raw(), photo.width(), photo.height());
    Image::from_rgba8(buffer)
}
