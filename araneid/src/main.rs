use std::collections::HashMap;
use std::sync::Arc;

use araneid_lib::config::{self, Config};
use araneid_lib::net::{CommonDevice, Device, NoPacketLoss, RandomPacketLoss, Transmission};
use araneid_lib::sys;
use araneid_lib::telemetry;
use araneid_lib::time::TimeDelta;
use araneid_lib::units::{DataRate, DataSize};
use araneid_lib::Scheduler;
use clap::Parser;

/// Discrete-event network emulator: provisions hosts and links described
/// by a topology file, then runs the simulated network until stopped.
#[derive(Parser, Debug)]
#[command(name = "araneid", version, about)]
struct Cli {
    /// Path to a topology TOML file.
    #[arg(short, long)]
    config: String,

    /// Override the worker pool size from the topology file.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Skip host/bridge provisioning, useful for validating a topology
    /// file without root privileges or an LXC install.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let config = match config::load_from_path(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load topology: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let _guard = match telemetry::init(&config.logging) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    if let Err(err) = run(cli, config) {
        tracing::error!(%err, "simulation run failed");
        return std::process::ExitCode::FAILURE;
    }

    std::process::ExitCode::SUCCESS
}

fn run(cli: Cli, config: Config) -> araneid_lib::Result<()> {
    let worker_count = cli.workers.unwrap_or(config.workers);
    tracing::info!(hosts = config.hosts.len(), links = config.links.len(), worker_count, "starting simulation");

    let scheduler = Scheduler::global();
    scheduler.start(worker_count);

    let devices: HashMap<String, Arc<CommonDevice>> = config
        .hosts
        .iter()
        .map(|host| (host.name.clone(), Arc::new(CommonDevice::new(host.name.clone()))))
        .collect();
    let addresses: HashMap<&str, std::net::Ipv4Addr> =
        config.hosts.iter().map(|h| (h.name.as_str(), h.address)).collect();

    for link in &config.links {
        let delay = link.delay.unwrap_or(TimeDelta::zero());
        let rate = link.rate.unwrap_or(DataRate::from_mbps(100.0));
        let capacity = link.buffer.unwrap_or(DataSize::from_bytes(64 * 1024));

        let from_device = devices[&link.from].clone();
        let to_device = devices[&link.to].clone();

        let forward = Arc::new(Transmission::new(make_loss(link.loss)?, delay, rate, capacity));
        forward.connect(to_device.clone() as Arc<dyn Device>);
        from_device.add_transmission(addresses[link.to.as_str()], forward);

        let reverse = Arc::new(Transmission::new(make_loss(link.loss)?, delay, rate, capacity));
        reverse.connect(from_device.clone() as Arc<dyn Device>);
        to_device.add_transmission(addresses[link.from.as_str()], reverse);

        tracing::info!(from = %link.from, to = %link.to, %rate, %delay, "link established");
    }

    if !cli.dry_run {
        provision_hosts(&config, &devices)?;
    }

    wait_for_shutdown();

    tracing::info!("shutdown requested, stopping scheduler");
    scheduler.stop();

    if !cli.dry_run {
        for host in &config.hosts {
            sys::stop_container(&host.name)?;
        }
    }

    Ok(())
}

fn make_loss(rate: f64) -> araneid_lib::Result<Box<dyn araneid_lib::net::PacketLoss>> {
    if rate > 0.0 {
        Ok(Box::new(RandomPacketLoss::new(rate)?))
    } else {
        Ok(Box::new(NoPacketLoss))
    }
}

/// Provisions a container, a host bridge, and a TAP interface for each
/// host, then wires the TAP's kernel-facing side to its simulated
/// `CommonDevice` in both directions.
fn provision_hosts(
    config: &Config,
    devices: &HashMap<String, Arc<CommonDevice>>,
) -> araneid_lib::Result<()> {
    for host in &config.hosts {
        sys::create_container(&host.name, &host.template)?;
        sys::start_container(&host.name)?;

        let bridge_name = format!("br-{}", host.name);
        let tap_name = format!("tap-{}", host.name);
        sys::create_bridge(&bridge_name)?;
        sys::create_tap(&tap_name)?;
        sys::attach_to_bridge(&tap_name, &bridge_name)?;

        let tap = Arc::new(sys::TapBridge::open(&tap_name)?);
        let device = devices[&host.name].clone();
        device.attach_bridge(tap.clone() as Arc<dyn sys::Bridge>);
        tap.attach_reader(device as Arc<dyn Device>)?;
    }
    Ok(())
}

static SHUTDOWN_REQUESTED: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

extern "C" fn request_shutdown(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, std::sync::atomic::Ordering::Relaxed);
}

/// Blocks until `SIGINT` or `SIGTERM` arrives.
///
/// The handler itself only flips an atomic flag — the one operation
/// guaranteed safe to perform from inside a signal handler — and this
/// function does the actual waiting by polling it, the same division of
/// labor the original's signal-based run loop used.
fn wait_for_shutdown() {
    unsafe {
        libc::signal(libc::SIGINT, request_shutdown as usize);
        libc::signal(libc::SIGTERM, request_shutdown as usize);
    }
    while !SHUTDOWN_REQUESTED.load(std::sync::atomic::Ordering::Relaxed) {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }
}
