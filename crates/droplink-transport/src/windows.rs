use std::io::Write;
use std::os::windows::io::{AsRawHandle, FromRawHandle, IntoRawHandle, OwnedHandle, RawHandle};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing::trace;
use windows_sys::Win32::Foundation::{
    GetLastError, ERROR_BROKEN_PIPE, ERROR_IO_PENDING, GENERIC_WRITE, HANDLE,
    INVALID_HANDLE_VALUE, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::Security::SECURITY_ATTRIBUTES;
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, ReadFile, FILE_ATTRIBUTE_NORMAL, FILE_FLAG_OVERLAPPED, OPEN_EXISTING,
};
use windows_sys::Win32::System::Pipes::{
    CreateNamedPipeW, PIPE_ACCESS_INBOUND, PIPE_TYPE_BYTE, PIPE_WAIT,
};
use windows_sys::Win32::System::Threading::{CreateEventW, WaitForSingleObject};
use windows_sys::Win32::System::IO::{CancelIoEx, GetOverlappedResult, OVERLAPPED};

use crate::config::CompanionConfig;
use crate::error::{Result, TransportError};

const PIPE_BUFFER_SIZE: u32 = 8192;
const PIPE_DEFAULT_TIMEOUT_MS: u32 = 100;

/// Parent-side endpoints of the companion's stdio pipes.
///
/// The companion's stdout is a named pipe opened with
/// `FILE_FLAG_OVERLAPPED` — anonymous pipes from `CreatePipe` cannot do
/// overlapped reads, and overlapped reads are what make a read timeout
/// possible. Stdin is an ordinary anonymous pipe managed by `Command`.
pub(crate) struct PipePair {
    stdin: ChildStdin,
    stdout_read: OwnedHandle,
}

/// Launch the companion with stdout wired to an overlapped-read pipe.
///
/// The inbound (read) end stays non-inheritable in this process; only the
/// write end is inheritable and it is handed to `Command`, which closes the
/// parent's copy after spawning. That leaves the child as the sole writer,
/// so EOF is observable once it exits.
pub(crate) fn spawn(config: &CompanionConfig) -> Result<(Child, PipePair)> {
    let launch_err = |source: std::io::Error| TransportError::Launch {
        program: config.program.clone(),
        source,
    };

    let (stdout_read, stdout_write) = create_overlapped_pipe().map_err(launch_err)?;

    // SAFETY: `stdout_write` is an open, owned pipe handle; Stdio takes
    // ownership and closes it after the spawn.
    let child_stdout = unsafe { Stdio::from_raw_handle(stdout_write.into_raw_handle()) };

    let mut child = Command::new(&config.program)
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(child_stdout)
        .spawn()
        .map_err(launch_err)?;

    let Some(stdin) = child.stdin.take() else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(launch_err(std::io::Error::other(
            "spawned child is missing its stdin pipe",
        )));
    };

    Ok((child, PipePair { stdin, stdout_read }))
}

/// Create a one-instance byte pipe whose read end supports overlapped I/O.
fn create_overlapped_pipe() -> std::io::Result<(OwnedHandle, OwnedHandle)> {
    static PIPE_SERIAL: AtomicU32 = AtomicU32::new(0);

    let serial = PIPE_SERIAL.fetch_add(1, Ordering::Relaxed);
    let name = format!(
        r"\\.\Pipe\droplink.{:08x}.{:08x}",
        std::process::id(),
        serial
    );
    let wide_name: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();

    // SAFETY: `wide_name` is a NUL-terminated UTF-16 string that outlives
    // the call; null security attributes leave the read end non-inheritable.
    let read_handle = unsafe {
        CreateNamedPipeW(
            wide_name.as_ptr(),
            PIPE_ACCESS_INBOUND | FILE_FLAG_OVERLAPPED,
            PIPE_TYPE_BYTE | PIPE_WAIT,
            1,
            PIPE_BUFFER_SIZE,
            PIPE_BUFFER_SIZE,
            PIPE_DEFAULT_TIMEOUT_MS,
            std::ptr::null(),
        )
    };
    if read_handle == INVALID_HANDLE_VALUE {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: The handle is valid and exclusively ours.
    let read_handle = unsafe { OwnedHandle::from_raw_handle(read_handle as RawHandle) };

    let inheritable = SECURITY_ATTRIBUTES {
        nLength: std::mem::size_of::<SECURITY_ATTRIBUTES>() as u32,
        lpSecurityDescriptor: std::ptr::null_mut(),
        bInheritHandle: 1,
    };

    // SAFETY: Pointers reference live stack/heap data for the duration of
    // the call. The write end must be inheritable so the child can use it
    // as stdout.
    let write_handle = unsafe {
        CreateFileW(
            wide_name.as_ptr(),
            GENERIC_WRITE,
            0,
            &inheritable,
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL,
            std::ptr::null_mut(),
        )
    };
    if write_handle == INVALID_HANDLE_VALUE {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: The handle is valid and exclusively ours.
    let write_handle = unsafe { OwnedHandle::from_raw_handle(write_handle as RawHandle) };

    Ok((read_handle, write_handle))
}

impl PipePair {
    pub(crate) fn write_exact(&mut self, bytes: &[u8]) -> Result<()> {
        self.stdin.write_all(bytes)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Read exactly `buf.len()` bytes, waiting up to `timeout` per
    /// overlapped read for the companion to produce data.
    pub(crate) fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let read = self.overlapped_read(&mut buf[filled..], timeout)?;
            if read == 0 {
                return Err(TransportError::Disconnected);
            }
            trace!(bytes = read, "read chunk from companion");
            filled += read;
        }
        Ok(())
    }

    fn overlapped_read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let pipe = self.stdout_read.as_raw_handle() as HANDLE;
        let event = create_manual_reset_event()?;

        // SAFETY: Zeroed OVERLAPPED is the documented initial state; only
        // hEvent is set.
        let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
        overlapped.hEvent = event.as_raw_handle() as HANDLE;

        let wanted = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);

        // SAFETY: `buf` and `overlapped` stay alive until the operation
        // completes or is cancelled-and-reaped below, so the kernel never
        // touches freed memory.
        let immediate = unsafe {
            ReadFile(
                pipe,
                buf.as_mut_ptr().cast(),
                wanted,
                std::ptr::null_mut(),
                &mut overlapped,
            )
        };

        if immediate == 0 {
            // SAFETY: No pointer arguments.
            match unsafe { GetLastError() } {
                ERROR_IO_PENDING => {
                    // SAFETY: The event handle is valid for the wait.
                    match unsafe { WaitForSingleObject(overlapped.hEvent, timeout_ms) } {
                        WAIT_OBJECT_0 => {}
                        WAIT_TIMEOUT => {
                            self.abandon_read(pipe, &mut overlapped);
                            trace!(?timeout, "overlapped read timed out");
                            return Err(TransportError::Timeout(timeout));
                        }
                        _ => {
                            let wait_err = std::io::Error::last_os_error();
                            self.abandon_read(pipe, &mut overlapped);
                            return Err(TransportError::Io(wait_err));
                        }
                    }
                }
                ERROR_BROKEN_PIPE => return Err(TransportError::Disconnected),
                _ => return Err(TransportError::Io(std::io::Error::last_os_error())),
            }
        }

        let mut read: u32 = 0;
        // SAFETY: The operation has completed (event signalled or immediate
        // success), so a non-blocking result query is valid.
        let ok = unsafe { GetOverlappedResult(pipe, &overlapped, &mut read, 0) };
        if ok == 0 {
            // SAFETY: No pointer arguments.
            return match unsafe { GetLastError() } {
                ERROR_BROKEN_PIPE => Err(TransportError::Disconnected),
                _ => Err(TransportError::Io(std::io::Error::last_os_error())),
            };
        }

        Ok(read as usize)
    }

    /// Cancel an in-flight overlapped read and wait for the kernel to
    /// release the caller's buffer before it goes out of scope.
    fn abandon_read(&self, pipe: HANDLE, overlapped: &mut OVERLAPPED) {
        let mut discarded: u32 = 0;
        // SAFETY: `overlapped` refers to the operation issued on `pipe`;
        // the blocking result query reaps it after cancellation.
        unsafe {
            CancelIoEx(pipe, overlapped);
            GetOverlappedResult(pipe, overlapped, &mut discarded, 1);
        }
    }
}

fn create_manual_reset_event() -> Result<OwnedHandle> {
    // SAFETY: All-null arguments request an anonymous, non-inherited,
    // initially unsignalled manual-reset event.
    let event = unsafe { CreateEventW(std::ptr::null(), 1, 0, std::ptr::null()) };
    if event.is_null() {
        return Err(TransportError::Io(std::io::Error::last_os_error()));
    }
    // SAFETY: The handle is valid and exclusively ours.
    Ok(unsafe { OwnedHandle::from_raw_handle(event as RawHandle) })
}
