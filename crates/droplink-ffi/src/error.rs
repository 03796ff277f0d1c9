use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use droplink_client::{ClientError, ErrorKind};

use crate::types::DlResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::new("").expect("empty CString should be valid"));
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new("").expect("empty CString should be valid");
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let message = message.into();
    let sanitized = message.replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized)
            .unwrap_or_else(|_| CString::new("internal error").expect("literal is valid"));
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> DlResult {
    set_error_message(message);
    DlResult::InvalidRequest
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_client_error(err: &ClientError) -> DlResult {
    set_error_message(err.to_string());
    match err.kind() {
        ErrorKind::InvalidRequest => DlResult::InvalidRequest,
        ErrorKind::LaunchFailure => DlResult::LaunchFailure,
        ErrorKind::CommsFailure => DlResult::CommsFailure,
        ErrorKind::OutOfMemory => DlResult::OutOfMemory,
        ErrorKind::RequestFailed => DlResult::RequestFailed,
        ErrorKind::UnknownError => DlResult::UnknownError,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

/// Stable human-readable message for a status code. Pure lookup, no I/O,
/// never returns null.
pub(crate) fn message_for_code(code: i32) -> *const c_char {
    let message: &'static std::ffi::CStr = match code {
        0 => c"OK",
        451 => c"App not found",
        452 => c"App launch failure",
        453 => c"App communication failure",
        454 => c"Invalid request",
        455 => c"Out of memory",
        456 => c"Request failed by app",
        _ => c"Unknown error",
    };
    message.as_ptr()
}
