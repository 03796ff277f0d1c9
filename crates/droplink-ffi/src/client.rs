use std::ffi::c_void;
use std::os::raw::c_char;

use droplink_client::{Client, CompanionConfig};

use crate::error;
use crate::types::{ClientHandle, DlClientHandle, DlCompletionHandler, DlResult};

fn with_client_mut<T>(
    handle: DlClientHandle,
    on_error: T,
    f: impl FnOnce(&mut ClientHandle) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("client handle cannot be null");
        return on_error;
    }

    let client_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut ClientHandle) }
    };

    f(client_handle)
}

/// Borrow a `(data, len)` pair as a slice, validating the pointer/length
/// pairing the protocol requires: both absent or both present.
///
/// # Safety
/// If `data` is non-null it must point to `len` readable bytes.
unsafe fn payload_arg<'a>(data: *const u8, len: u16) -> Result<&'a [u8], DlResult> {
    if data.is_null() {
        if len != 0 {
            return Err(error::set_invalid_argument(
                "payload pointer is null but length is non-zero",
            ));
        }
        return Ok(&[]);
    }
    if len == 0 {
        return Err(error::set_invalid_argument(
            "payload pointer is set but length is zero",
        ));
    }
    // SAFETY: Caller guarantees `data` points to `len` readable bytes.
    Ok(unsafe { std::slice::from_raw_parts(data, usize::from(len)) })
}

/// Create a client that will launch `program -pipe` on first use.
///
/// Returns null on failure; see `dl_last_error`.
///
/// # Safety
/// `program` must be a non-null pointer to a valid UTF-8, NUL-terminated
/// C string.
#[no_mangle]
pub unsafe extern "C" fn dl_client_new(program: *const c_char) -> DlClientHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        if program.is_null() {
            let _ = error::set_invalid_argument("program cannot be null");
            return std::ptr::null_mut();
        }
        // SAFETY: Caller guarantees a NUL-terminated string.
        let program = match unsafe { std::ffi::CStr::from_ptr(program) }.to_str() {
            Ok(value) => value,
            Err(_) => {
                let _ = error::set_invalid_argument("program must be valid UTF-8");
                return std::ptr::null_mut();
            }
        };

        let client = Client::new(CompanionConfig::new(program));
        Box::into_raw(Box::new(ClientHandle { client })) as DlClientHandle
    })
}

/// Free a client handle, terminating any live companion process.
///
/// # Safety
/// `handle` must be null or a handle previously returned by
/// `dl_client_new`.
#[no_mangle]
pub unsafe extern "C" fn dl_client_free(handle: DlClientHandle) {
    crate::ffi_boundary((), || {
        if handle.is_null() {
            return;
        }
        // SAFETY: Caller guarantees this handle was allocated by dl_client_new.
        unsafe {
            drop(Box::from_raw(handle as *mut ClientHandle));
        }
    });
}

/// One-time setup request. `data` must carry a non-empty JSON payload.
///
/// # Safety
/// `handle` must be a valid client handle; `data` must point to `len`
/// readable bytes.
#[no_mangle]
pub unsafe extern "C" fn dl_setup(handle: DlClientHandle, data: *const u8, len: u16) -> DlResult {
    crate::ffi_boundary(DlResult::UnknownError, || {
        error::clear_error_state();

        // SAFETY: Forwarded caller guarantee.
        let payload = match unsafe { payload_arg(data, len) } {
            Ok(value) => value,
            Err(code) => return code,
        };

        with_client_mut(handle, DlResult::InvalidRequest, |client_handle| {
            match client_handle.client.setup(payload) {
                Ok(()) => DlResult::Ok,
                Err(err) => error::map_client_error(&err),
            }
        })
    })
}

/// Submit a drop request correlated by a non-zero `request_id`.
///
/// # Safety
/// `handle` must be a valid client handle; `data` must point to `len`
/// readable bytes.
#[no_mangle]
pub unsafe extern "C" fn dl_drop(
    handle: DlClientHandle,
    data: *const u8,
    len: u16,
    request_id: i16,
) -> DlResult {
    crate::ffi_boundary(DlResult::UnknownError, || {
        error::clear_error_state();

        // SAFETY: Forwarded caller guarantee.
        let payload = match unsafe { payload_arg(data, len) } {
            Ok(value) => value,
            Err(code) => return code,
        };

        with_client_mut(handle, DlResult::InvalidRequest, |client_handle| {
            match client_handle.client.submit(payload, request_id) {
                Ok(()) => DlResult::Ok,
                Err(err) => error::map_client_error(&err),
            }
        })
    })
}

/// Gracefully close the companion. The process is terminated regardless of
/// the reply's outcome; a later request launches a fresh instance.
///
/// # Safety
/// `handle` must be a valid client handle.
#[no_mangle]
pub unsafe extern "C" fn dl_close(handle: DlClientHandle) -> DlResult {
    crate::ffi_boundary(DlResult::UnknownError, || {
        error::clear_error_state();

        with_client_mut(handle, DlResult::InvalidRequest, |client_handle| {
            match client_handle.client.close() {
                Ok(()) => DlResult::Ok,
                Err(err) => error::map_client_error(&err),
            }
        })
    })
}

/// Drain all currently-completed results, invoking `handler` once per
/// result. Result bytes are only valid for the duration of each callback.
///
/// # Safety
/// `handle` must be a valid client handle. If non-null, `handler` must be
/// callable with the documented signature for the duration of this call.
#[no_mangle]
pub unsafe extern "C" fn dl_poll_completed(
    handle: DlClientHandle,
    handler: DlCompletionHandler,
    user_data: *mut c_void,
) -> DlResult {
    crate::ffi_boundary(DlResult::UnknownError, || {
        error::clear_error_state();

        let Some(handler) = handler else {
            return error::set_invalid_argument("completion handler cannot be null");
        };

        with_client_mut(handle, DlResult::InvalidRequest, |client_handle| {
            let outcome = client_handle.client.poll_completed(|body| {
                let len = u16::try_from(body.len()).unwrap_or(u16::MAX);
                // SAFETY: `body` outlives the call; the handler contract
                // forbids retaining the pointer.
                unsafe { handler(body.as_ptr(), len, user_data) };
            });
            match outcome {
                Ok(_) => DlResult::Ok,
                Err(err) => error::map_client_error(&err),
            }
        })
    })
}
