//! droplink-ffi: C-ABI exports for the droplink companion client.

mod client;
mod error;
mod types;

use std::panic::AssertUnwindSafe;

pub use client::{dl_client_free, dl_client_new, dl_close, dl_drop, dl_poll_completed, dl_setup};
pub use types::{
    DlClientHandle, DlCompletionHandler, DlResult, DL_ERR_APP_NOT_FOUND, DL_ERR_COMMS_FAILURE,
    DL_ERR_INVALID_REQUEST, DL_ERR_LAUNCH_FAILURE, DL_ERR_OUT_OF_MEMORY, DL_ERR_REQUEST_FAILED,
    DL_ERR_UNKNOWN, DL_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Detail text for the most recent error on this thread. Never null; empty
/// when the last call succeeded.
#[no_mangle]
pub extern "C" fn dl_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

/// Stable human-readable message for a status code. Pure lookup, no I/O.
#[no_mangle]
pub extern "C" fn dl_error_message(code: i32) -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), || error::message_for_code(code))
}
