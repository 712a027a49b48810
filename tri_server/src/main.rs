//! Three-card poker host.
//!
//! Accepts participants over TCP, lets the operator start the game from the
//! console, and runs a single game to the end.

mod config;
mod console;

use std::net::SocketAddr;

use anyhow::Error;
use ctrlc::set_handler;
use log::{info, warn};
use pico_args::Arguments;
use tokio::{net::TcpListener, sync::mpsc};
use tri_poker::{Host, Resolution, server::accept_loop};

use config::ServerConfig;

const HELP: &str = "\
Run a three-card poker host

USAGE:
  tri_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]

FLAGS:
  --auto-start             Start as soon as enough players joined
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:6969)
  ENTRY_FEE                Fee per round, e.g. 2 or 2.50  [default: 2]
  STARTING_BALANCE         Balance before the joining fee  [default: 12]
  MIN_PLAYERS              Players needed to start  [default: 3]
  MAX_PLAYERS              Players that force a start  [default: 17]
  DECISION_TIMEOUT_SECS    Seconds to decide before folding, 0 waits forever  [default: 0]
  INTRO_PAUSE_MS           Pause between intro lines  [default: 1000]
  AUTO_START               Same as --auto-start  [default: false]
  (A .env file in the working directory is loaded first)
";

/// Room for connections that sent a username but aren't seated yet.
const JOIN_QUEUE: usize = 32;

struct Args {
    bind: Option<SocketAddr>,
    auto_start: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        auto_start: pargs.contains("--auto-start"),
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    let config = ServerConfig::from_env(args.bind, args.auto_start)?;
    config.validate()?;
    info!(
        "Entry fee {}, starting balance {}, {} to {} players",
        config.game.entry_fee,
        config.game.starting_balance,
        config.game.min_participants,
        config.game.max_participants
    );

    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;
    info!("Host is running at {}. Press Ctrl+C to stop.", config.bind);

    let (joins_tx, joins_rx) = mpsc::channel(JOIN_QUEUE);
    let (start_tx, start_rx) = mpsc::channel(1);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let host = Host::new(config.game.clone())?.with_lobby_events(events_tx);
    let server = tokio::spawn(accept_loop(listener, joins_tx));
    let console = tokio::spawn(console::run(
        events_rx,
        start_tx,
        config.auto_start,
        console::stdin_lines(),
    ));

    let summary = host.run(joins_rx, start_rx).await?;
    console.abort();

    match summary.resolution {
        Resolution::Abandoned => info!("Everyone left, {} unclaimed", summary.pot),
        _ => {
            for (name, amount) in &summary.payouts {
                info!("{name} made ${amount}");
            }
        }
    }
    info!("Game over after {} rounds", summary.rounds);

    if let Err(e) = server.await? {
        warn!("Accept loop ended with an error: {e}");
    }

    Ok(())
}
