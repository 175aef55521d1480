use std::process::Command;

use crate::error::{AraneidError, Result};

/// Host-side network and container setup that the simulation shells out
/// for rather than driving through a binding crate.
///
/// The original reached into `liblxc` directly; nothing in this
/// workspace's dependency stack talks to liblxc, and scripting `ip`/`lxc-*`
/// through `std::process::Command` is how the rest of the ecosystem's
/// network tooling does the same job without a dedicated FFI crate.
fn run(program: &str, args: &[&str]) -> Result<()> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(AraneidError::Io)?;
    if !output.status.success() {
        return Err(AraneidError::Configuration(format!(
            "{program} {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

pub fn create_bridge(name: &str) -> Result<()> {
    run("ip", &["link", "add", name, "type", "bridge"])?;
    run("ip", &["link", "set", name, "up"])
}

pub fn delete_bridge(name: &str) -> Result<()> {
    run("ip", &["link", "delete", name, "type", "bridge"])
}

pub fn create_tap(name: &str) -> Result<()> {
    run("ip", &["tuntap", "add", "dev", name, "mode", "tap"])?;
    run("ip", &["link", "set", "dev", name, "promisc", "on", "up"])
}

pub fn attach_to_bridge(interface: &str, bridge: &str) -> Result<()> {
    run("ip", &["link", "set", interface, "master", bridge])
}

/// Launches a privileged-container host to stand in for a simulated
/// machine, named the way a host configuration entry names it.
pub fn create_container(name: &str, template: &str) -> Result<()> {
    run("lxc-create", &["-n", name, "-t", template])
}

pub fn start_container(name: &str) -> Result<()> {
    run("lxc-start", &["-n", name, "-d"])
}

pub fn stop_container(name: &str) -> Result<()> {
    run("lxc-stop", &["-n", name])
}

pub fn destroy_container(name: &str) -> Result<()> {
    run("lxc-destroy", &["-n", name])
}
