#![allow(clippy::missing_safety_doc)]

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::ptr::{null_mut, slice_from_raw_parts_mut};
use std::slice;

use ndef_hce::nfc::ApduService;
use ndef_hce::{Card, Profile};

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = RefCell::new(None);
}

fn unwrap_or<T, E>(result: Result<T, E>, default: T) -> T
where
    E: ToString,
{
    // If result is an error, sets the message to LAST_ERROR.
    // Clears the last error otherwise.
    LAST_ERROR.with(|last| *last.borrow_mut() = result.as_ref().err().map(|e| e.to_string()));

    match result {
        Ok(value) => value,
        Err(_) => default,
    }
}

/// A struct represents a byte array.
/// Dependents can read it from ptr to ptr+len.
/// ptr can be null pointer, so dependents must check the ptr is not null.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct ByteArray {
    ptr: *mut u8,
    len: usize,
}

impl Default for ByteArray {
    fn default() -> Self {
        Self {
            ptr: null_mut(),
            len: 0,
        }
    }
}

impl From<Vec<u8>> for ByteArray {
    fn from(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        let ptr = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;

        Self { ptr, len }
    }
}

impl ByteArray {
    fn drain(self) {
        let Self { ptr, len } = self;
        if !ptr.is_null() {
            let _ = unsafe { Box::from_raw(slice_from_raw_parts_mut(ptr, len)) };
        }
    }
}

/// An emulated tag answering a reader for one session at a time.
pub struct NfcCard {
    card: Card,
}

/// Initiates the libndef_hce library.
/// Currently this occur no side effects, but it will be added in the future.
/// So dependents should call this before using other functions.
#[no_mangle]
pub extern "C" fn ndef_hce_init() {}

/// Returns the latest error occurred before calling this function.
/// If no error occurred before or failed to get the error, returns null pointer.
/// The returned string must be released with `ndef_hce_string_free`.
#[no_mangle]
pub extern "C" fn ndef_hce_last_error() -> *mut c_char {
    match LAST_ERROR
        .with(|last| last.borrow().clone())
        .and_then(|e| CString::new(e).ok())
    {
        Some(str) => str.into_raw(),
        None => null_mut(),
    }
}

/// Creates a new emulated card serving the URI.
/// If uri is null, the default URI is served.
/// Returns null pointer if the URI is not valid UTF-8 or too long for the NDEF file.
#[no_mangle]
pub unsafe extern "C" fn ndef_hce_new_nfc_card(uri: *const c_char) -> *mut NfcCard {
    let profile = match uri.is_null() {
        true => Ok(Profile::default()),
        _ => CStr::from_ptr(uri)
            .to_str()
            .map_err(|e| e.to_string())
            .and_then(|uri| Profile::default().with_uri(uri).map_err(|e| e.to_string())),
    };

    unwrap_or(
        profile.map(|profile| {
            Box::into_raw(Box::new(NfcCard {
                card: Card::new(profile),
            }))
        }),
        null_mut(),
    )
}

/// Closes the card.
#[no_mangle]
pub unsafe extern "C" fn ndef_hce_nfc_card_close(card: *mut NfcCard) {
    if !card.is_null() {
        let _ = Box::from_raw(card);
    }
}

/// Answers the APDU command of len octets at command.
/// A null command is answered as an empty frame.
/// The response always ends with a status word, and must be released with
/// `ndef_hce_byte_array_free`. Returns an empty array only if card is null.
#[no_mangle]
pub unsafe extern "C" fn ndef_hce_nfc_card_process(
    card: *mut NfcCard,
    command: *const u8,
    len: usize,
) -> ByteArray {
    let Some(card) = card.as_mut() else {
        return ByteArray::default();
    };

    let command: &[u8] = match command.is_null() {
        true => &[],
        _ => slice::from_raw_parts(command, len),
    };

    card.card.process((), command).into()
}

/// Notifies the card that the link was deactivated, ending the session.
/// 0 is for a lost link, 1 for another application selected.
#[no_mangle]
pub unsafe extern "C" fn ndef_hce_nfc_card_deactivate(card: *mut NfcCard, reason: i32) {
    if let Some(card) = card.as_mut() {
        card.card.deactivate((), reason.into());
    }
}

/// Releases a byte array returned from this library.
#[no_mangle]
pub unsafe extern "C" fn ndef_hce_byte_array_free(bytes: ByteArray) {
    bytes.drain();
}

/// Releases a string returned from this library.
#[no_mangle]
pub unsafe extern "C" fn ndef_hce_string_free(str: *mut c_char) {
    if !str.is_null() {
        let _ = CString::from_raw(str);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn process(card: *mut NfcCard, command: &[u8]) -> Vec<u8> {
        let response = ndef_hce_nfc_card_process(card, command.as_ptr(), command.len());
        let bytes = slice::from_raw_parts(response.ptr, response.len).to_vec();

        ndef_hce_byte_array_free(response);
        bytes
    }

    #[test]
    fn test_session() {
        unsafe {
            let card = ndef_hce_new_nfc_card(std::ptr::null());
            assert!(!card.is_null());

            assert_eq!(
                vec![0x90, 0x00],
                process(card, &[0x00, 0xA4, 0x00, 0x0C, 0x02, 0xE1, 0x04])
            );
            assert_eq!(
                vec![0x00, 0x12, 0x90, 0x00],
                process(card, &[0x00, 0xB0, 0x00, 0x00, 0x02])
            );

            ndef_hce_nfc_card_deactivate(card, 0);
            assert_eq!(vec![0x90, 0x00], process(card, &[0x00, 0xB0, 0x00, 0x02, 0x12]));

            ndef_hce_nfc_card_close(card);
        }
    }

    #[test]
    fn test_custom_uri() {
        unsafe {
            let uri = CString::new("tel:+81312345678").unwrap();
            let card = ndef_hce_new_nfc_card(uri.as_ptr());

            process(card, &[0x00, 0xA4, 0x00, 0x0C, 0x02, 0xE1, 0x04]);
            assert_eq!(
                vec![0x00, 0x11, 0x90, 0x00],
                process(card, &[0x00, 0xB0, 0x00, 0x00, 0x02])
            );

            ndef_hce_nfc_card_close(card);
        }
    }

    #[test]
    fn test_invalid_uri() {
        unsafe {
            let uri = CString::new(vec![0x68, 0xFF, 0x70]).unwrap();

            assert!(ndef_hce_new_nfc_card(uri.as_ptr()).is_null());

            let error = ndef_hce_last_error();
            assert!(!error.is_null());
            ndef_hce_string_free(error);
        }
    }

    #[test]
    fn test_uri_too_long() {
        unsafe {
            let uri = CString::new(format!("https://example.com/{}", "a".repeat(70000))).unwrap();

            assert!(ndef_hce_new_nfc_card(uri.as_ptr()).is_null());

            let error = ndef_hce_last_error();
            assert!(!error.is_null());
            assert!(CStr::from_ptr(error).to_str().unwrap().contains("70020"));
            ndef_hce_string_free(error);
        }
    }

    #[test]
    fn test_null_command() {
        unsafe {
            let card = ndef_hce_new_nfc_card(std::ptr::null());

            for len in [0, 5] {
                let response = ndef_hce_nfc_card_process(card, std::ptr::null(), len);
                assert_eq!(
                    vec![0x6A, 0x82],
                    slice::from_raw_parts(response.ptr, response.len).to_vec()
                );
                ndef_hce_byte_array_free(response);
            }

            ndef_hce_nfc_card_close(card);
        }
    }

    #[test]
    fn test_null_card() {
        unsafe {
            let response = ndef_hce_nfc_card_process(null_mut(), [0x00].as_ptr(), 1);

            assert!(response.ptr.is_null());
        }
    }
}
