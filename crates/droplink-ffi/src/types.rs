use std::ffi::c_void;

use droplink_client::Client;

/// Status codes returned across the C boundary.
///
/// Error values start at 451 and track the numbering the companion
/// protocol has always used, so existing host integrations keep their
/// error tables.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlResult {
    Ok = 0,
    AppNotFound = 451,
    LaunchFailure = 452,
    CommsFailure = 453,
    InvalidRequest = 454,
    OutOfMemory = 455,
    RequestFailed = 456,
    UnknownError = 457,
}

#[allow(dead_code)]
pub const DL_OK: DlResult = DlResult::Ok;
#[allow(dead_code)]
pub const DL_ERR_APP_NOT_FOUND: DlResult = DlResult::AppNotFound;
#[allow(dead_code)]
pub const DL_ERR_LAUNCH_FAILURE: DlResult = DlResult::LaunchFailure;
#[allow(dead_code)]
pub const DL_ERR_COMMS_FAILURE: DlResult = DlResult::CommsFailure;
#[allow(dead_code)]
pub const DL_ERR_INVALID_REQUEST: DlResult = DlResult::InvalidRequest;
#[allow(dead_code)]
pub const DL_ERR_OUT_OF_MEMORY: DlResult = DlResult::OutOfMemory;
#[allow(dead_code)]
pub const DL_ERR_REQUEST_FAILED: DlResult = DlResult::RequestFailed;
#[allow(dead_code)]
pub const DL_ERR_UNKNOWN: DlResult = DlResult::UnknownError;

/// Opaque client handle.
pub type DlClientHandle = *mut c_void;

/// Callback receiving one completed poll result.
///
/// `data`/`len` are only valid for the duration of the call.
pub type DlCompletionHandler =
    Option<unsafe extern "C" fn(data: *const u8, len: u16, user_data: *mut c_void)>;

pub(crate) struct ClientHandle {
    pub(crate) client: Client,
}
