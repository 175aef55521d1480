use std::ffi::CString;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::{Arc, Mutex};

use crate::error::{AraneidError, Result};
use crate::net::{Device, Packet};
use crate::sys::fd_reader::FdReader;

const IFF_TAP: i16 = 0x0002;
const IFF_NO_PI: i16 = 0x1000;
const TUNSETIFF: libc::c_ulong = 0x4004_54ca;

#[repr(C)]
struct IfReq {
    ifr_name: [libc::c_char; libc::IFNAMSIZ],
    ifr_flags: i16,
    _padding: [u8; 22],
}

/// A kernel-backed point of attachment to the host's networking stack.
///
/// `TapBridge` owns a TAP character device in promiscuous mode: frames
/// written to it appear on the host's bridge interface, and frames
/// arriving from the host are read back and handed to whatever [`Device`]
/// is attached as the simulated-side peer.
pub trait Bridge: Send + Sync {
    fn interface_name(&self) -> &str;
    fn write_frame(&self, frame: &[u8]) -> Result<()>;
}

pub struct TapBridge {
    name: String,
    file: std::fs::File,
    reader: Mutex<Option<FdReader>>,
}

impl TapBridge {
    /// Opens `/dev/net/tun` and requests a TAP interface named `name`
    /// running in promiscuous (`IFF_NO_PI`) mode — no per-packet protocol
    /// information header, just raw Ethernet frames, matching what a
    /// bridge forwards.
    pub fn open(name: &str) -> Result<TapBridge> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/net/tun")
            .map_err(AraneidError::Io)?;

        let mut ifr = IfReq { ifr_name: [0; libc::IFNAMSIZ], ifr_flags: IFF_TAP | IFF_NO_PI, _padding: [0; 22] };
        let c_name = CString::new(name)
            .map_err(|_| AraneidError::Configuration(format!("invalid interface name: {name}")))?;
        let bytes = c_name.as_bytes_with_nul();
        if bytes.len() > libc::IFNAMSIZ {
            return Err(AraneidError::Configuration(format!("interface name too long: {name}")));
        }
        for (dst, src) in ifr.ifr_name.iter_mut().zip(bytes.iter()) {
            *dst = *src as libc::c_char;
        }

        let rc = unsafe { libc::ioctl(file.as_raw_fd(), TUNSETIFF, &mut ifr as *mut IfReq) };
        if rc < 0 {
            return Err(AraneidError::Io(std::io::Error::last_os_error()));
        }

        Ok(TapBridge { name: name.to_string(), file, reader: Mutex::new(None) })
    }

    /// Starts watching the TAP fd for frames arriving from the host and
    /// hands each one to `device.send`, the simulated side's entry point
    /// for host-originated traffic (`forward_out`, in the original's
    /// terms).
    pub fn attach_reader(&self, device: Arc<dyn Device>) -> Result<()> {
        let fd = self.raw_fd();
        let reader = FdReader::spawn(fd, move |bytes| {
            device.send(Packet::new(bytes));
        })?;
        *self.reader.lock().unwrap() = Some(reader);
        Ok(())
    }

    fn raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl Bridge for TapBridge {
    fn interface_name(&self) -> &str {
        &self.name
    }

    fn write_frame(&self, frame: &[u8]) -> Result<()> {
        use std::io::Write;
        (&self.file).write_all(frame).map_err(AraneidError::Io)
    }
}
