//! Per-test redirection of the process standard output into memory.
//!
//! An [`OutputCapture`] swaps file descriptor 1 for the write end of a pipe
//! and drains the read end on a background thread. Only one capture window
//! can be open at a time; [`OutputCapture::open`] blocks until the previous
//! window closes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::CaptureError;

static CAPTURE_LOCK: Mutex<()> = Mutex::new(());

/// Size of each read performed by the drain thread.
pub const CHUNK_SIZE: usize = 2048;

#[cfg(unix)]
#[expect(unsafe_code, reason = "pipe and dup2 have no safe std equivalent on the supported toolchain")]
mod sys {
    use std::io;
    use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

    /// Creates a pipe, returning `(read, write)` ends.
    pub(super) fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
        let mut fds: [RawFd; 2] = [-1; 2];
        // SAFETY: `fds` is a valid two-element buffer for `pipe` to fill.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
            return Err(io::Error::last_os_error());
        }
        let [read, write] = fds;
        // SAFETY: `pipe` succeeded, so both descriptors are open and owned here.
        Ok(unsafe { (OwnedFd::from_raw_fd(read), OwnedFd::from_raw_fd(write)) })
    }

    /// Points `target` at the file described by `source`.
    pub(super) fn redirect(source: BorrowedFd<'_>, target: RawFd) -> io::Result<()> {
        // SAFETY: `source` is a live descriptor; `dup2` does not take ownership.
        if unsafe { libc::dup2(source.as_raw_fd(), target) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(unix)]
mod imp {
    use std::fs::File;
    use std::io::{self, Read, Write};
    use std::os::fd::{AsFd, AsRawFd, OwnedFd};
    use std::thread::{self, JoinHandle};

    use super::{CHUNK_SIZE, sys};
    use crate::error::CaptureError;

    type Drain = JoinHandle<io::Result<(Vec<u8>, File)>>;

    #[derive(Debug)]
    pub(super) struct Redirect {
        saved: OwnedFd,
        write: Option<OwnedFd>,
        drain: Option<Drain>,
    }

    impl Redirect {
        pub(super) fn open() -> Result<Self, CaptureError> {
            let stdout = io::stdout();
            stdout
                .lock()
                .flush()
                .map_err(|e| CaptureError::io("flush standard output", e))?;
            let saved = stdout
                .as_fd()
                .try_clone_to_owned()
                .map_err(|e| CaptureError::io("duplicate standard output", e))?;
            let (read, write) = sys::pipe().map_err(|e| CaptureError::io("create pipe", e))?;
            let drain = thread::Builder::new()
                .name("suitecase-capture".into())
                .spawn(move || drain(File::from(read)))
                .map_err(|e| CaptureError::io("spawn drain thread", e))?;
            let redirect = Self {
                saved,
                write: Some(write),
                drain: Some(drain),
            };
            if let Some(write) = &redirect.write {
                sys::redirect(write.as_fd(), stdout.as_raw_fd())
                    .map_err(|e| CaptureError::io("redirect standard output", e))?;
            }
            Ok(redirect)
        }

        pub(super) fn close(&mut self) -> Result<Vec<u8>, CaptureError> {
            let stdout = io::stdout();
            let flushed = stdout.lock().flush();
            let restored = sys::redirect(self.saved.as_fd(), stdout.as_raw_fd());
            drop(self.write.take());
            let buffer = collect(restored, self.drain.take())?;
            flushed.map_err(|e| CaptureError::io("flush standard output", e))?;
            Ok(buffer)
        }
    }

    /// Joins the drain thread once standard output points back at the saved
    /// descriptor.
    ///
    /// While the redirect is still in place fd 1 keeps the pipe open, so the
    /// drain never sees end of file; the thread is detached instead.
    fn collect(restored: io::Result<()>, drain: Option<Drain>) -> Result<Vec<u8>, CaptureError> {
        let Some(handle) = drain else {
            return restored
                .map(|()| Vec::new())
                .map_err(|e| CaptureError::io("restore standard output", e));
        };
        if let Err(e) = restored {
            drop(handle);
            return Err(CaptureError::io("restore standard output", e));
        }
        let (buffer, read) = handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("drain thread panicked")))
            .map_err(|e| CaptureError::io("drain pipe", e))?;
        drop(read);
        Ok(buffer)
    }

    fn drain(mut read: File) -> io::Result<(Vec<u8>, File)> {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; CHUNK_SIZE];
        loop {
            match read.read(&mut chunk) {
                Ok(0) => return Ok((buffer, read)),
                Ok(len) => buffer.extend_from_slice(chunk.get(..len).unwrap_or_default()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

}

#[cfg(not(unix))]
mod imp {
    use crate::error::CaptureError;

    #[derive(Debug)]
    pub(super) struct Redirect;

    impl Redirect {
        pub(super) fn open() -> Result<Self, CaptureError> {
            Err(CaptureError::Unsupported)
        }

        pub(super) fn close(&mut self) -> Result<Vec<u8>, CaptureError> {
            Ok(Vec::new())
        }
    }
}

/// One open window of standard output capture.
///
/// Bytes written to file descriptor 1 between [`open`](Self::open) and
/// [`close`](Self::close) are collected in memory. Dropping an open capture
/// closes it.
///
/// # Examples
///
/// ```no_run
/// use std::io::Write;
/// use suitecase::OutputCapture;
///
/// let mut capture = OutputCapture::open()?;
/// std::io::stdout().write_all(b"hidden")?;
/// capture.close()?;
/// assert_eq!(capture.buffer(), b"hidden");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct OutputCapture {
    redirect: Option<imp::Redirect>,
    buffer: Vec<u8>,
    _window: MutexGuard<'static, ()>,
}

impl OutputCapture {
    /// Starts capturing standard output.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] when the pipe, the descriptor swap or the
    /// drain thread cannot be set up, or when the platform lacks support.
    pub fn open() -> Result<Self, CaptureError> {
        let window = CAPTURE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let redirect = imp::Redirect::open()?;
        Ok(Self {
            redirect: Some(redirect),
            buffer: Vec::new(),
            _window: window,
        })
    }

    /// Restores standard output and collects everything written meanwhile.
    ///
    /// The drain thread is joined before this returns. Closing twice is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] when restoring the descriptor or draining the
    /// pipe fails.
    pub fn close(&mut self) -> Result<(), CaptureError> {
        if let Some(mut redirect) = self.redirect.take() {
            self.buffer = redirect.close()?;
        }
        Ok(())
    }

    /// Returns the captured bytes; empty until closed.
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns true while the capture window is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.redirect.is_some()
    }
}

impl Drop for OutputCapture {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close output capture: {e}");
        }
    }
}
