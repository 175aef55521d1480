//! Low-level host interaction: the only module permitted `unsafe`, aside
//! from the manually reference-counted chunk pool in `net::buffer`, which
//! needs it for the same reason this module does — the original's design
//! talks directly to the kernel rather than going through a safe wrapper.

mod bridge;
mod fd_reader;
mod provision;

pub use bridge::{Bridge, TapBridge};
pub use fd_reader::FdReader;
pub use provision::{
    attach_to_bridge, create_bridge, create_container, create_tap, delete_bridge,
    destroy_container, start_container, stop_container,
};
