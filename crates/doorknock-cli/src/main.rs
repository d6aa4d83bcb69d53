//! `knockd`: door knock host.
//!
//! Connects to the knock peripheral, recognizes knock codes and sends the
//! unlock command when one matches. Stdin is an operator console: knocks
//! can be simulated, the link driven by hand, and the state inspected.
//!
//! # Usage
//!
//! ```bash
//! # Simulated peripheral, connected on start
//! knockd --demo --connect
//!
//! # HC-05 bound to an RFCOMM port (feature `hardware-serial`)
//! knockd --port /dev/rfcomm0 --connect
//!
//! # Custom codes and timeout
//! knockd --config door.json --demo
//! ```

mod console;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tracing::{info, warn};

use console::{Command, HELP};
use doorknock_core::KnockConfig;
use doorknock_link::LinkManager;
use doorknock_link::devices::AnyTransport;
use doorknock_link::mock::{MockTransport, MockTransportHandle};
use doorknock_protocol::KnockCodec;
use doorknock_recognizer::RecognizerEvent;

#[cfg(feature = "hardware-serial")]
use doorknock_link::serial::{DEFAULT_BAUD_RATE, SerialTransport};

/// Door knock pattern host
#[derive(Parser, Debug)]
#[command(name = "knockd")]
#[command(about = "Recognizes door knock codes and unlocks the peripheral")]
#[command(version)]
struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the peripheral (e.g. /dev/rfcomm0)
    #[cfg(feature = "hardware-serial")]
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[cfg(feature = "hardware-serial")]
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Use a simulated peripheral
    #[arg(long)]
    demo: bool,

    /// Connect on start
    #[arg(long)]
    connect: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let config = match &args.config {
        Some(path) => KnockConfig::from_path(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => KnockConfig::default(),
    };
    info!(
        codes = config.codes.len(),
        timeout_ms = config.inactivity_timeout_ms,
        peripheral = %config.peripheral_name,
        "Configuration loaded"
    );

    let (transport, peer) = select_transport(&args);
    let manager = Arc::new(
        LinkManager::with_config(transport, &config).context("invalid knock configuration")?,
    );
    let reporter = spawn_reporter(&manager);

    println!("{HELP}");
    if args.connect {
        execute(&manager, peer.as_ref(), Command::Connect).await;
    }

    let mut lines = FramedRead::new(tokio::io::stdin(), KnockCodec::default());
    let mut seen_writes = 0;

    loop {
        let line = tokio::select! {
            line = lines.next() => line,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        let line = line.context("failed to read console input")?;

        match Command::parse(&line.raw) {
            Command::Quit => break,
            command => execute(&manager, peer.as_ref(), command).await,
        }

        if let Some(peer) = &peer {
            let written = peer.written_text();
            for payload in written.iter().skip(seen_writes) {
                println!("peripheral received: {}", payload.trim_end());
            }
            seen_writes = written.len();
        }
    }

    if let Err(error) = manager.disconnect().await {
        warn!(%error, "Disconnect on exit failed");
    }
    reporter.abort();
    Ok(())
}

/// Pick the transport from the command line.
///
/// Returns the peripheral handle when the simulated transport is used.
fn select_transport(args: &Args) -> (AnyTransport, Option<MockTransportHandle>) {
    #[cfg(feature = "hardware-serial")]
    {
        if let Some(port) = &args.port {
            info!(port = %port, baud = args.baud, "Using serial transport");
            let transport = SerialTransport::with_port(port.clone(), args.baud);
            return (AnyTransport::Serial(transport), None);
        }
    }

    if args.demo {
        info!("Using simulated peripheral");
        let (transport, handle) = MockTransport::new();
        return (AnyTransport::Mock(transport), Some(handle));
    }

    warn!("No transport selected, connect will fail (use --demo or --port)");
    (AnyTransport::unavailable(), None)
}

/// Print link and recognizer events as they happen.
fn spawn_reporter(manager: &LinkManager) -> JoinHandle<()> {
    let mut states = manager.subscribe_state();
    let mut events = manager.recognizer().events();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = states.borrow_and_update().clone();
                    println!("link: {state}");
                }
                event = events.recv() => match event {
                    Ok(RecognizerEvent::KnockObserved(knock)) => println!("knock: {knock}"),
                    Ok(RecognizerEvent::MatchChanged(state)) => println!("match: {state}"),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Reporter lagged"),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    })
}

async fn execute(manager: &LinkManager, peer: Option<&MockTransportHandle>, command: Command) {
    match command {
        Command::Connect => report(manager.connect().await),
        Command::Disconnect => report(manager.disconnect().await),
        Command::Reset => {
            manager.recognizer().reset();
            println!("window cleared");
        }
        Command::Status => print_status(manager),
        Command::Hide => report(manager.on_host_visibility_changed(false).await),
        Command::Show => report(manager.on_host_visibility_changed(true).await),
        Command::Send(text) => report(manager.send(&text).await),
        Command::Peer(text) => match peer {
            Some(handle) => {
                if let Err(error) = handle.send_line(&text).await {
                    println!("peer: {error}");
                }
            }
            None => println!("peer injection needs --demo"),
        },
        Command::Knock(zone) => {
            manager.simulate_knock(zone).await;
        }
        Command::Help => println!("{HELP}"),
        Command::Unknown(text) => println!("unknown command: {text} (try help)"),
        Command::Empty | Command::Quit => {}
    }
}

fn report(result: doorknock_link::Result<()>) {
    if let Err(error) = result {
        println!("error: {error}");
    }
}

fn print_status(manager: &LinkManager) {
    let recognizer = manager.recognizer();
    let window: String = recognizer
        .sequence()
        .iter()
        .map(|zone| zone.symbol())
        .collect();

    println!("link:     {}", manager.state());
    println!(
        "window:   [{window:<4}] {:.0}%",
        recognizer.progress() * 100.0
    );
    println!("match:    {}", recognizer.match_state());
    println!(
        "last msg: {}",
        manager.last_message().as_deref().unwrap_or("-")
    );
    println!(
        "error:    {}",
        manager.last_error().as_deref().unwrap_or("-")
    );
}
