//! JNI binding for a `HostApduService` delegating to the emulated card.
//!
//! ```kotlin
//! class HceService : HostApduService() {
//!     private val card = LibNdefHce.newCard(null)
//!
//!     override fun processCommandApdu(commandApdu: ByteArray, extras: Bundle?): ByteArray =
//!         LibNdefHce.processCommandApdu(card, commandApdu)
//!
//!     override fun onDeactivated(reason: Int) = LibNdefHce.onDeactivated(card, reason)
//! }
//! ```

#![allow(clippy::missing_safety_doc)]

#[macro_use]
extern crate log;
extern crate android_log;

use std::sync::Mutex;

use jni::objects::{JClass, JString};
use jni::sys::{jbyteArray, jint, jlong, jstring};
use jni::JNIEnv;

use ndef_hce::nfc::ApduService;
use ndef_hce::{profile, Card, Profile};

/// Sent back when the command could not even be read out of the JVM.
const FILE_NOT_FOUND: [u8; 2] = [0x6A, 0x82];

static LAST_ERROR: Mutex<Option<String>> = Mutex::new(None);

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error("JNI Error: {0}")]
    Jni(#[from] jni::errors::Error),

    #[error("Invalid profile: {0}")]
    Profile(#[from] profile::Error),

    #[error("The card is not open")]
    Closed,
}

/// Whatever the service hands over along with each command.
#[derive(Copy, Clone)]
struct JniContext<'a> {
    #[allow(dead_code)]
    env: JNIEnv<'a>,
}

fn set_last_error(message: Option<String>) {
    if let Ok(mut last) = LAST_ERROR.lock() {
        *last = message;
    }
}

/// Logs and records the error, then falls back to the default, built only on error.
fn unwrap_or_else<T, E>(result: Result<T, E>, default: impl FnOnce() -> T) -> T
where
    E: std::error::Error,
{
    match result {
        Ok(value) => value,
        Err(err) => {
            error!("{}", err);
            set_last_error(Some(err.to_string()));
            default()
        }
    }
}

macro_rules! wrap {
    ($t: ty, $default: expr, $inner: expr) => {
        unwrap_or_else((|| -> Result<$t, Error> { $inner })(), || $default)
    };
}

unsafe fn card_mut<'a>(card: jlong) -> Result<&'a mut Card, Error> {
    (card as *mut Card).as_mut().ok_or(Error::Closed)
}

#[no_mangle]
pub extern "C" fn Java_jp_s6n_ndefhce_ffi_LibNdefHce_init() {
    let _ = android_log::init("NdefHce.FFI");
}

#[no_mangle]
pub unsafe extern "C" fn Java_jp_s6n_ndefhce_ffi_LibNdefHce_lastError(
    env: JNIEnv,
    _class: JClass,
) -> jstring {
    let message = LAST_ERROR.lock().ok().and_then(|last| last.clone());

    match message.map(|message| env.new_string(message)) {
        Some(Ok(message)) => message.into_raw(),
        _ => 0 as jstring,
    }
}

/// Opens a card serving the URI, or the default one when the URI is null.
#[no_mangle]
pub unsafe extern "C" fn Java_jp_s6n_ndefhce_ffi_LibNdefHce_newCard(
    env: JNIEnv,
    _class: JClass,
    uri: jstring,
) -> jlong {
    wrap!(jlong, 0, {
        let profile = match uri.is_null() {
            true => Profile::default(),
            _ => {
                let uri: String = env.get_string(JString::from_raw(uri))?.into();
                Profile::default().with_uri(uri)?
            }
        };

        info!("Serving {}", profile.uri());
        set_last_error(None);

        Ok(Box::into_raw(Box::new(Card::new(profile))) as jlong)
    })
}

#[no_mangle]
pub unsafe extern "C" fn Java_jp_s6n_ndefhce_ffi_LibNdefHce_processCommandApdu(
    env: JNIEnv,
    _class: JClass,
    card: jlong,
    command: jbyteArray,
) -> jbyteArray {
    wrap!(
        jbyteArray,
        env.byte_array_from_slice(&FILE_NOT_FOUND)
            .unwrap_or(std::ptr::null_mut()),
        {
            let card = card_mut(card)?;
            let command = env.convert_byte_array(command)?;
            let response = card.process(JniContext { env }, &command);

            Ok(env.byte_array_from_slice(&response)?)
        }
    )
}

#[no_mangle]
pub unsafe extern "C" fn Java_jp_s6n_ndefhce_ffi_LibNdefHce_onDeactivated(
    env: JNIEnv,
    _class: JClass,
    card: jlong,
    reason: jint,
) {
    wrap!((), (), {
        card_mut(card)?.deactivate(JniContext { env }, reason.into());

        Ok(())
    })
}

#[no_mangle]
pub unsafe extern "C" fn Java_jp_s6n_ndefhce_ffi_LibNdefHce_close(
    _env: JNIEnv,
    _class: JClass,
    card: jlong,
) {
    if card != 0 {
        let _ = Box::from_raw(card as *mut Card);
    }
}
