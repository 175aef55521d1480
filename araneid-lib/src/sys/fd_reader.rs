use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{AraneidError, Result};

/// Watches a raw file descriptor for readability using `select(2)` and
/// invokes a callback with whatever bytes arrive.
///
/// A self-pipe is the shutdown mechanism: `stop` writes a byte into the
/// write end, which wakes `select` out of its wait on the watched fd
/// without needing a timeout-and-poll loop or a signal handler.
pub struct FdReader {
    shutdown_write: RawFd,
    handle: Option<JoinHandle<()>>,
}

impl FdReader {
    pub fn spawn<F>(fd: RawFd, on_readable: F) -> Result<FdReader>
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let mut pipe_fds = [0 as RawFd; 2];
        let rc = unsafe { libc::pipe(pipe_fds.as_mut_ptr()) };
        if rc != 0 {
            return Err(AraneidError::Io(std::io::Error::last_os_error()));
        }
        let [shutdown_read, shutdown_write] = pipe_fds;

        let on_readable = Arc::new(on_readable);
        let handle = thread::Builder::new()
            .name("araneid-fd-reader".to_string())
            .spawn(move || run(fd, shutdown_read, on_readable))
            .expect("failed to spawn fd reader thread");

        Ok(FdReader { shutdown_write, handle: Some(handle) })
    }

    pub fn stop(&mut self) {
        let byte = [0u8; 1];
        unsafe {
            libc::write(self.shutdown_write, byte.as_ptr() as *const libc::c_void, 1);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FdReader {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
        unsafe {
            libc::close(self.shutdown_write);
        }
    }
}

fn run<F>(fd: RawFd, shutdown_read: RawFd, on_readable: Arc<F>)
where
    F: Fn(&[u8]) + Send + Sync + 'static,
{
    let mut buffer = [0u8; 65536];
    loop {
        let mut read_set: libc::fd_set = unsafe { std::mem::zeroed() };
        unsafe {
            libc::FD_ZERO(&mut read_set);
            libc::FD_SET(fd, &mut read_set);
            libc::FD_SET(shutdown_read, &mut read_set);
        }
        let nfds = fd.max(shutdown_read) + 1;
        let rc = unsafe {
            libc::select(
                nfds,
                &mut read_set,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            tracing::error!(%err, "fd reader select failed");
            return;
        }

        if unsafe { libc::FD_ISSET(shutdown_read, &read_set) } {
            unsafe {
                libc::close(shutdown_read);
            }
            return;
        }

        if unsafe { libc::FD_ISSET(fd, &read_set) } {
            let n = unsafe {
                libc::read(fd, buffer.as_mut_ptr() as *mut libc::c_void, buffer.len())
            };
            if n > 0 {
                on_readable(&buffer[..n as usize]);
            } else if n == 0 {
                return;
            }
        }
    }
}
