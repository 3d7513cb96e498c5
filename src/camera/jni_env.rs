use std::path::PathBuf;

use anyhow::{anyhow, Result};
use jni::{
    errors::Error as JniError,
    objects::{JObject, JString, JValue},
    sys::{JNIInvokeInterface_, _jobject, jint},
    JNIEnv, JavaVM,
};
use log::info;
use slint::android::AndroidApp;

pub const CAMERA_PERMISSION: &str = "android.permission.CAMERA";
pub const RECORD_AUDIO_PERMISSION: &str = "android.permission.RECORD_AUDIO";
pub const REQUIRED_PERMISSIONS: [&str; 2] = [CAMERA_PERMISSION, RECORD_AUDIO_PERMISSION];

pub fn java_vm(app: &AndroidApp) -> Result<JavaVM> {
    Ok(unsafe { JavaVM::from_raw(app.vm_as_ptr() as *mut *const JNIInvokeInterface_)? })
}

/// Runs `f` on an attached JNI environment with the activity object.
pub fn with_activity<T>(
    app: &AndroidApp,
    f: impl FnOnce(&mut JNIEnv, &JObject) -> Result<T>,
) -> Result<T> {
    let vm = java_vm(app)?;
    let mut env = vm.attach_current_thread()?;
    let activity = unsafe { JObject::from_raw(app.activity_as_ptr() as *mut _jobject) };
    f(&mut env, &activity)
}

pub trait JavaResultExt<T> {
    /// Clears a pending Java exception and turns it into its localized message.
    fn java_err(self, env: &mut JNIEnv) -> Result<T>;
}

impl<T> JavaResultExt<T> for std::result::Result<T, JniError> {
    fn java_err(self, env: &mut JNIEnv) -> Result<T> {
        self.map_err(|err| java_error(env, err))
    }
}

fn java_error(env: &mut JNIEnv, err: JniError) -> anyhow::Error {
    if !matches!(err, JniError::JavaException) {
        return anyhow!(err);
    }
    let Ok(throwable) = env.exception_occurred() else {
        return anyhow!(err);
    };
    let _ = env.exception_clear();

    let message = match env
        .call_method(&throwable, "getLocalizedMessage", "()Ljava/lang/String;", &[])
        .and_then(|value| value.l())
    {
        Ok(message) if !message.is_null() => {
            let message = JString::from(message);
            env.get_string(&message).map(String::from).ok()
        }
        _ => None,
    };
    let _ = env.exception_clear();
    anyhow!(message.unwrap_or_else(|| "unknown Java exception".to_string()))
}

pub fn sdk_version(app: &AndroidApp) -> Result<i32> {
    with_activity(app, |env, _| {
        Ok(env
            .get_static_field("android/os/Build$VERSION", "SDK_INT", "I")?
            .i()?)
    })
}

pub fn check_self_permission(app: &AndroidApp, permission: &str) -> Result<bool> {
    with_activity(app, |env, activity| {
        let granted_int = env
            .get_static_field(
                "android/content/pm/PackageManager",
                "PERMISSION_GRANTED",
                "I",
            )?
            .i()?;
        let permission_str = env.new_string(permission)?;
        let result = env
            .call_method(
                activity,
                "checkSelfPermission",
                "(Ljava/lang/String;)I",
                &[JValue::Object(&permission_str)],
            )
            .java_err(env)?
            .i()?;
        Ok(result == granted_int)
    })
}

pub fn request_permissions(app: &AndroidApp, permissions: &[&str], request_code: i32) -> Result<()> {
    with_activity(app, |env, activity| {
        let java_permission_array =
            env.new_object_array(permissions.len() as jint, "java/lang/String", JObject::null())?;
        for (index, permission) in permissions.iter().enumerate() {
            let permission_str = env.new_string(*permission)?;
            env.set_object_array_element(&java_permission_array, index as jint, permission_str)?;
        }
        env.call_method(
            activity,
            "requestPermissions",
            "([Ljava/lang/String;I)V",
            &[JValue::Object(&java_permission_array), request_code.into()],
        )
        .java_err(env)?;
        Ok(())
    })
}

/// Requests whatever of [`REQUIRED_PERMISSIONS`] is still missing.
pub fn request_capture_permissions(app: &AndroidApp) -> Result<()> {
    let sdk_version = sdk_version(app)?;
    info!("sdk version:{sdk_version}");
    if sdk_version < 23 {
        // granted at install time
        return Ok(());
    }
    let mut missing = vec![];
    for permission in REQUIRED_PERMISSIONS {
        if !check_self_permission(app, permission)? {
            missing.push(permission);
        }
    }
    if !missing.is_empty() {
        info!("requesting permissions {missing:?}");
        request_permissions(app, &missing, 100)?;
    }
    Ok(())
}

/// `Context.getFilesDir()`: storage private to the application.
pub fn files_dir(app: &AndroidApp) -> Result<PathBuf> {
    with_activity(app, |env, activity| {
        let file = env
            .call_method(activity, "getFilesDir", "()Ljava/io/File;", &[])
            .java_err(env)?
            .l()?;
        if file.is_null() {
            return Err(anyhow!("getFilesDir returned null"));
        }
        let path = env
            .call_method(&file, "getAbsolutePath", "()Ljava/lang/String;", &[])
            .java_err(env)?
            .l()?;
        let path = JString::from(path);
        let path: String = env.get_string(&path)?.into();
        Ok(PathBuf::from(path))
    })
}

/// Current display rotation in degrees (0, 90, 180 or 270).
pub fn display_rotation(app: &AndroidApp) -> Result<i32> {
    with_activity(app, |env, activity| {
        let window_manager = env
            .call_method(activity, "getWindowManager", "()Landroid/view/WindowManager;", &[])
            .java_err(env)?
            .l()?;
        let display = env
            .call_method(&window_manager, "getDefaultDisplay", "()Landroid/view/Display;", &[])
            .java_err(env)?
            .l()?;
        let rotation = env
            .call_method(&display, "getRotation", "()I", &[])
            .java_err(env)?
            .i()?;
        Ok(rotation * 90)
    })
}
