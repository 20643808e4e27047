//! relaybox: Main Entry Point
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                      │
//! │                                                               │
//! │  RppalPins / SimulatedPins   FileStorage    LogEventSink      │
//! │  (PinDriver)                 (StoragePort)  (EventSink)       │
//! │  SystemClock                 RpcEngine + TCP server           │
//! │  (TimePort)                                                   │
//! │                                                               │
//! │  ──────────────── Port Trait Boundary ──────────────────      │
//! │                                                               │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │  RelayController · PendingActions · RelayStore          │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures_lite::future::block_on;
use log::{LevelFilter, info, warn};

use relaybox::adapters::file_store::FileStorage;
use relaybox::adapters::gpio::SimulatedPins;
use relaybox::adapters::log_sink::LogEventSink;
use relaybox::adapters::time::SystemClock;
use relaybox::app::controller::RelayController;
use relaybox::app::events::RelayEvent;
use relaybox::app::ports::{EventSink, PinDriver};
use relaybox::app::store::RelayStore;
use relaybox::config::{ConfigOrigin, ServiceConfig};
use relaybox::rpc::engine::RpcEngine;
use relaybox::rpc::server;

#[derive(Parser, Debug)]
#[command(name = "relaybox", version, about, long_about = None)]
struct Args {
    /// Configuration file (JSON)
    #[arg(short, long, default_value = "relaybox.json")]
    config: PathBuf,

    /// Raise log verbosity; repeatable
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Drive simulated pins instead of the GPIO block
    #[arg(long)]
    simulate: bool,
}

fn init_logging(level: LevelFilter, extra: u8) -> Result<()> {
    // stderrlog: 0 = error .. 4 = trace
    let base = match level {
        LevelFilter::Off | LevelFilter::Error => 0,
        LevelFilter::Warn => 1,
        LevelFilter::Info => 2,
        LevelFilter::Debug => 3,
        LevelFilter::Trace => 4,
    };
    stderrlog::new()
        .quiet(level == LevelFilter::Off && extra == 0)
        .verbosity(base + usize::from(extra))
        .timestamp(stderrlog::Timestamp::Second)
        .init()
        .context("installing logger")
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (config, origin) = ServiceConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    init_logging(config.log_level(), args.verbose)?;

    info!("relaybox v{}", env!("CARGO_PKG_VERSION"));
    match origin {
        ConfigOrigin::File => info!("config: {}", args.config.display()),
        ConfigOrigin::Defaults => {
            warn!("config: {} not found, running with defaults", args.config.display());
        }
    }

    if !args.simulate {
        #[cfg(feature = "rpi")]
        match relaybox::adapters::gpio::RppalPins::new() {
            Ok(pins) if pins.accessible() => return run(Arc::new(pins), &config),
            Ok(_) => warn!("gpio: not accessible, falling back to simulated pins"),
            Err(e) => warn!("gpio: {}, falling back to simulated pins", e),
        }
        #[cfg(not(feature = "rpi"))]
        warn!("gpio: built without the `rpi` feature, using simulated pins");
    }
    run(Arc::new(SimulatedPins::new()), &config)
}

fn run<D: PinDriver + 'static>(driver: Arc<D>, config: &ServiceConfig) -> Result<()> {
    let table = config.pinout().context("building pinout table")?;
    let events: Arc<dyn EventSink> = Arc::new(LogEventSink::new());

    let storage = FileStorage::open(&config.db.filename)
        .with_context(|| format!("opening database {}", config.db.filename.display()))?;
    let store = Arc::new(RelayStore::new(storage));
    let created = store
        .seed(config.seed_records())
        .context("seeding relay records")?;
    if created > 0 {
        events.emit(&RelayEvent::Seeded { count: created });
    }

    let controller = Arc::new(
        RelayController::new(table, driver, store, Arc::new(SystemClock::new()), events)
            .with_contact(config.contact)
            .with_confirm_timeout(config.confirm_timeout()),
    );
    let unavailable = controller
        .check_pins()
        .iter()
        .filter(|(_, r)| r.is_err())
        .count();
    if unavailable > 0 {
        warn!("gpio: {} relay pins cannot be opened", unavailable);
    }
    block_on(controller.apply_startup(config.startup));

    let addr = config.rpc_addr();
    let listener = TcpListener::bind(&addr).with_context(|| format!("binding {}", addr))?;
    server::serve(listener, RpcEngine::new(controller)).context("rpc server")
}
