// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JNI registration for the two system services.
//
// `JNI_OnLoad` registers the native methods of `UsbMidiDevice` and
// `FingerprintService` and caches the class and method ids later calls
// need. Each native function is a thin marshalling shim: it converts Java
// arguments, calls into `crate::surface`, and converts the result back.
//
// Process-wide state is limited to what the VM forces on us. The native
// methods carry no context pointer, so the configured natives live in
// `OnceLock`s here and nowhere else.

#![cfg(target_os = "android")]

use std::ffi::c_void;
use std::os::fd::{AsRawFd, IntoRawFd};
use std::sync::{Arc, OnceLock};

use jni::objects::{GlobalRef, JClass, JMethodID, JObject, JValue};
use jni::signature::{Primitive, ReturnType};
use jni::sys::{JNI_ERR, JNI_VERSION_1_6, jint, jlong, jobjectArray, jsize};
use jni::{JNIEnv, JavaVM, NativeMethod};
use tracing::{debug, error, info, warn};

use hwbridge_core::config::BridgeConfig;
use hwbridge_core::error::{BridgeError, Result};
use hwbridge_fingerprint::{FingerprintListener, ModuleRegistry};
use hwbridge_midi::RawMidi;

use crate::surface::{FingerprintNatives, NO_HAL, UsbMidiNatives};

const USB_MIDI_DEVICE: &str = "com/android/server/usb/UsbMidiDevice";
const FINGERPRINT_SERVICE: &str = "com/android/server/fingerprint/FingerprintService";
const FILE_DESCRIPTOR: &str = "java/io/FileDescriptor";

// ---------------------------------------------------------------------------
// Process state
// ---------------------------------------------------------------------------

struct JavaIds {
    file_descriptor: GlobalRef,
    notify: JMethodID,
}

static IDS: OnceLock<JavaIds> = OnceLock::new();
static CONFIG: OnceLock<BridgeConfig> = OnceLock::new();
static MODULES: OnceLock<Arc<ModuleRegistry>> = OnceLock::new();
static MIDI: OnceLock<UsbMidiNatives> = OnceLock::new();
static FINGERPRINT: OnceLock<FingerprintNatives> = OnceLock::new();

/// Install the configuration. Must happen before the first native call;
/// returns `false` if a configuration is already in place.
pub fn install_config(config: BridgeConfig) -> bool {
    CONFIG.set(config).is_ok()
}

/// Install the vendor HAL modules `nativeOpenHal` may load. Must happen
/// before `nativeInit`; returns `false` if modules are already installed.
pub fn install_modules(registry: ModuleRegistry) -> bool {
    MODULES.set(Arc::new(registry)).is_ok()
}

fn config() -> &'static BridgeConfig {
    CONFIG.get_or_init(BridgeConfig::default)
}

fn midi() -> &'static UsbMidiNatives {
    MIDI.get_or_init(|| UsbMidiNatives::new(RawMidi::from_config(&config().midi)))
}

fn jni_err(context: &str, e: jni::errors::Error) -> BridgeError {
    BridgeError::Bridge(format!("{context}: {e}"))
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Entry point the VM calls when the library is loaded.
#[unsafe(no_mangle)]
pub extern "system" fn JNI_OnLoad(vm: JavaVM, _reserved: *mut c_void) -> jint {
    let mut env = match vm.get_env() {
        Ok(env) => env,
        Err(e) => {
            error!(error = %e, "JNI_OnLoad: no JNIEnv");
            return JNI_ERR;
        }
    };
    match register(&mut env) {
        Ok(()) => {
            info!("hwbridge natives registered");
            JNI_VERSION_1_6
        }
        Err(e) => {
            error!(error = %e, "JNI_OnLoad: registration failed");
            JNI_ERR
        }
    }
}

fn register(env: &mut JNIEnv) -> Result<()> {
    let fd_class = env
        .find_class(FILE_DESCRIPTOR)
        .map_err(|e| jni_err("find_class(FileDescriptor)", e))?;
    let file_descriptor = env
        .new_global_ref(&fd_class)
        .map_err(|e| jni_err("new_global_ref(FileDescriptor)", e))?;

    let service = env
        .find_class(FINGERPRINT_SERVICE)
        .map_err(|e| jni_err("find_class(FingerprintService)", e))?;
    let notify = env
        .get_method_id(&service, "notify", "(IIII)V")
        .map_err(|e| jni_err("get_method_id(notify)", e))?;

    // A second load finds the ids already cached; they stay valid.
    let _ = IDS.set(JavaIds {
        file_descriptor,
        notify,
    });

    env.register_native_methods(
        USB_MIDI_DEVICE,
        &[
            method("nativeGetSubdeviceCount", "(II)I", native_get_subdevice_count as *mut c_void),
            method("nativeOpen", "(III)[Ljava/io/FileDescriptor;", native_open as *mut c_void),
        ],
    )
    .map_err(|e| jni_err("register UsbMidiDevice", e))?;

    env.register_native_methods(
        &service,
        &[
            method("nativeAuthenticate", "(JI)I", native_authenticate as *mut c_void),
            method("nativeEnroll", "(II)I", native_enroll as *mut c_void),
            method("nativeEnrollCancel", "()I", native_enroll_cancel as *mut c_void),
            method("nativeRemove", "(II)I", native_remove as *mut c_void),
            method("nativeOpenHal", "()I", native_open_hal as *mut c_void),
            method("nativeCloseHal", "()I", native_close_hal as *mut c_void),
            method(
                "nativeInit",
                "(Landroid/os/MessageQueue;Lcom/android/server/fingerprint/FingerprintService;)V",
                native_init as *mut c_void,
            ),
        ],
    )
    .map_err(|e| jni_err("register FingerprintService", e))?;
    Ok(())
}

fn method(name: &str, sig: &str, fn_ptr: *mut c_void) -> NativeMethod {
    NativeMethod {
        name: name.into(),
        sig: sig.into(),
        fn_ptr,
    }
}

// ---------------------------------------------------------------------------
// UsbMidiDevice
// ---------------------------------------------------------------------------

extern "system" fn native_get_subdevice_count<'local>(
    _env: JNIEnv<'local>,
    _this: JObject<'local>,
    card: jint,
    device: jint,
) -> jint {
    midi().get_subdevice_count(card, device)
}

extern "system" fn native_open<'local>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    card: jint,
    device: jint,
    subdevice_count: jint,
) -> jobjectArray {
    let Some(handles) = midi().open(card, device, subdevice_count) else {
        return std::ptr::null_mut();
    };
    match descriptor_array(&mut env, &handles) {
        // The Java objects own the descriptors from here on.
        Ok(array) => {
            for handle in handles {
                let _ = handle.into_raw_fd();
            }
            array
        }
        // Dropping `handles` closes every descriptor.
        Err(e) => {
            error!(card, device, error = %e, "nativeOpen: building FileDescriptor[] failed");
            std::ptr::null_mut()
        }
    }
}

fn descriptor_array<F: AsRawFd>(env: &mut JNIEnv, handles: &[F]) -> Result<jobjectArray> {
    let ids = IDS.get().ok_or(BridgeError::NotInitialized("JNI ids"))?;
    let class: &JClass = ids.file_descriptor.as_obj().into();
    let len = jsize::try_from(handles.len())
        .map_err(|_| BridgeError::InvalidArgument(format!("{} descriptors", handles.len())))?;

    let array = env
        .new_object_array(len, class, JObject::null())
        .map_err(|e| jni_err("new_object_array", e))?;
    for (i, handle) in (0..len).zip(handles) {
        let fd = env
            .new_object(class, "()V", &[])
            .map_err(|e| jni_err("new FileDescriptor", e))?;
        env.set_field(&fd, "descriptor", "I", JValue::Int(handle.as_raw_fd()))
            .map_err(|e| jni_err("FileDescriptor.descriptor", e))?;
        env.set_object_array_element(&array, i, &fd)
            .map_err(|e| jni_err("set_object_array_element", e))?;
        env.delete_local_ref(fd)
            .map_err(|e| jni_err("delete_local_ref", e))?;
    }
    Ok(array.into_raw())
}

// ---------------------------------------------------------------------------
// FingerprintService
// ---------------------------------------------------------------------------

/// Delivers relayed notifications to `FingerprintService.notify`.
struct JniListener {
    vm: JavaVM,
    callback: GlobalRef,
    notify: JMethodID,
}

impl FingerprintListener for JniListener {
    fn notify(&mut self, msg_type: i32, arg1: i32, arg2: i32, arg3: i32) {
        // The looper thread stays attached for its whole life.
        let mut env = match self.vm.attach_current_thread_permanently() {
            Ok(env) => env,
            Err(e) => {
                error!(error = %e, "fingerprint looper could not attach to the VM");
                return;
            }
        };
        let args = [
            JValue::Int(msg_type).as_jni(),
            JValue::Int(arg1).as_jni(),
            JValue::Int(arg2).as_jni(),
            JValue::Int(arg3).as_jni(),
        ];
        // SAFETY: `notify` was resolved on FingerprintService with signature
        // (IIII)V and `callback` is an instance of that class.
        let result = unsafe {
            env.call_method_unchecked(
                &self.callback,
                self.notify,
                ReturnType::Primitive(Primitive::Void),
                &args,
            )
        };
        if let Err(e) = result {
            warn!(msg_type, error = %e, "FingerprintService.notify failed");
        }
        if env.exception_check().unwrap_or(false) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
    }
}

fn fingerprint() -> Option<&'static FingerprintNatives> {
    let natives = FINGERPRINT.get();
    if natives.is_none() {
        warn!("fingerprint native called before nativeInit");
    }
    natives
}

fn not_initialized() -> jint {
    hwbridge_core::status::status_code(&BridgeError::NotInitialized("nativeInit"))
}

extern "system" fn native_init<'local>(
    env: JNIEnv<'local>,
    _this: JObject<'local>,
    // Unused: notify(IIII)V is delivered on the looper thread, not this queue's thread.
    _queue: JObject<'local>,
    callback: JObject<'local>,
) {
    if let Err(e) = init_fingerprint(&env, &callback) {
        error!(error = %e, "nativeInit failed");
    }
}

fn init_fingerprint(env: &JNIEnv, callback: &JObject) -> Result<()> {
    if FINGERPRINT.get().is_some() {
        warn!("nativeInit called again, keeping the existing listener");
        return Ok(());
    }
    let notify = IDS
        .get()
        .map(|ids| ids.notify)
        .ok_or(BridgeError::NotInitialized("JNI ids"))?;
    let listener = JniListener {
        vm: env.get_java_vm().map_err(|e| jni_err("get_java_vm", e))?,
        callback: env
            .new_global_ref(callback)
            .map_err(|e| jni_err("new_global_ref(callback)", e))?,
        notify,
    };
    let registry = MODULES.get_or_init(|| Arc::new(ModuleRegistry::new()));
    let natives =
        FingerprintNatives::init(config().fingerprint.clone(), Arc::clone(registry), listener)?;
    debug!(looper = ?natives.looper_thread(), "fingerprint looper running");
    let _ = FINGERPRINT.set(natives);
    Ok(())
}

extern "system" fn native_open_hal<'local>(_env: JNIEnv<'local>, _this: JObject<'local>) -> jint {
    fingerprint().map_or(NO_HAL, FingerprintNatives::open_hal)
}

extern "system" fn native_close_hal<'local>(_env: JNIEnv<'local>, _this: JObject<'local>) -> jint {
    fingerprint().map_or_else(not_initialized, FingerprintNatives::close_hal)
}

extern "system" fn native_enroll<'local>(
    _env: JNIEnv<'local>,
    _this: JObject<'local>,
    timeout: jint,
    group_id: jint,
) -> jint {
    fingerprint().map_or_else(not_initialized, |n| n.enroll(timeout, group_id))
}

extern "system" fn native_enroll_cancel<'local>(
    _env: JNIEnv<'local>,
    _this: JObject<'local>,
) -> jint {
    fingerprint().map_or_else(not_initialized, FingerprintNatives::enroll_cancel)
}

extern "system" fn native_remove<'local>(
    _env: JNIEnv<'local>,
    _this: JObject<'local>,
    finger_id: jint,
    group_id: jint,
) -> jint {
    fingerprint().map_or_else(not_initialized, |n| n.remove(finger_id, group_id))
}

extern "system" fn native_authenticate<'local>(
    _env: JNIEnv<'local>,
    _this: JObject<'local>,
    session_id: jlong,
    group_id: jint,
) -> jint {
    fingerprint().map_or_else(not_initialized, |n| n.authenticate(session_id, group_id))
}
