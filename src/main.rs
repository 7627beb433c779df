//! simuart - run one simulated UART node.
//!
//! Listens on `<UDSPATH>/<node-id>.sock` and echoes everything a connected
//! peer sends. See the `simuart` library for the bridge itself.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use simuart::config::parse_node_id;
use simuart::constants::DEFAULT_TICK;
use simuart::{BridgeConfig, Loopback, SocketBridge};

/// Global flag for signal-triggered shutdown (as Arc for signal-hook compatibility)
static SHUTDOWN_FLAG: std::sync::LazyLock<Arc<AtomicBool>> =
    std::sync::LazyLock::new(|| Arc::new(AtomicBool::new(false)));

#[derive(Parser, Debug)]
#[command(name = "simuart", version, about = "Simulated UART node over a Unix socket")]
struct Cli {
    /// Node id in hex (e.g. 1, 0x001f)
    node_id: String,

    /// Directory for the rendezvous socket (overrides UDSPATH)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Poll timeout per tick, in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Largest chunk delivered by a single read
    #[arg(long)]
    receive_capacity: Option<usize>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    if let Some(path) = log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create log file at {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// Terminate along with the parent process (the simulator that spawned us).
#[cfg(target_os = "linux")]
fn exit_with_parent() {
    // SAFETY: PR_SET_PDEATHSIG takes a signal number and touches no memory.
    let rc = unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGHUP as libc::c_ulong) };
    if rc != 0 {
        log::warn!(
            "PR_SET_PDEATHSIG failed: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn exit_with_parent() {}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let node_id = parse_node_id(&cli.node_id)?;
    let mut config = BridgeConfig::from_env(node_id);
    if let Some(base_dir) = cli.base_dir {
        config.base_dir = Some(base_dir);
    }
    if let Some(capacity) = cli.receive_capacity {
        anyhow::ensure!(capacity > 0, "--receive-capacity must be positive");
        config.receive_capacity = capacity;
    }
    let tick = cli.tick_ms.map_or(DEFAULT_TICK, Duration::from_millis);

    // Set up signal handlers
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::flag;
    flag::register(SIGINT, Arc::clone(&SHUTDOWN_FLAG))?;
    flag::register(SIGTERM, Arc::clone(&SHUTDOWN_FLAG))?;
    flag::register(SIGHUP, Arc::clone(&SHUTDOWN_FLAG))?;
    exit_with_parent();

    let mut bridge = SocketBridge::open(&config)
        .with_context(|| format!("Failed to open UART bridge for node {node_id:04x}"))?;
    log::info!(
        "simuart v{} node {node_id:04x} ready on {}",
        env!("CARGO_PKG_VERSION"),
        bridge.acceptor().path().display()
    );

    let mut loopback = Loopback::new();
    let result = run(&mut bridge, &mut loopback, tick);

    bridge.close();
    log::info!(
        "exiting: echoed {} bytes in {} sends, dropped {} bytes",
        loopback.echoed_bytes(),
        loopback.completed_sends(),
        loopback.dropped_bytes()
    );
    result
}

fn run(bridge: &mut SocketBridge, loopback: &mut Loopback, tick: Duration) -> Result<()> {
    while !SHUTDOWN_FLAG.load(Ordering::Relaxed) {
        bridge.poll_once(Some(tick), loopback)?;
        loopback.pump(bridge)?;
    }
    Ok(())
}
