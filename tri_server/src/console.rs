//! Operator console: reports lobby activity and asks when to start.

use log::warn;
use std::io::{BufRead, Write};
use tokio::sync::mpsc;
use tri_poker::LobbyEvent;

pub const START_PROMPT: &str = "Start game (Y/N): ";

fn wants_start(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Read stdin lines on a plain thread so a pending read never holds up
/// runtime shutdown.
pub fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Follow the lobby until the game starts. Each time enough participants
/// are seated the operator is asked whether to start, unless `auto_start`
/// is set.
pub async fn run(
    mut events: mpsc::UnboundedReceiver<LobbyEvent>,
    start: mpsc::Sender<()>,
    auto_start: bool,
    mut input: mpsc::Receiver<String>,
) {
    let mut operator_present = true;
    while let Some(event) = events.recv().await {
        match event {
            LobbyEvent::Joined {
                name,
                participants,
                ready,
            } => {
                println!("{name} has joined the game! ({participants} seated)");
                if !ready {
                    continue;
                }
                if auto_start {
                    let _ = start.try_send(());
                    continue;
                }
                if !operator_present {
                    continue;
                }
                print!("{START_PROMPT}");
                let _ = std::io::stdout().flush();
                match input.recv().await {
                    Some(answer) if wants_start(&answer) => {
                        let _ = start.try_send(());
                    }
                    Some(_) => {}
                    None => {
                        warn!("Console input closed, waiting for a full table");
                        operator_present = false;
                    }
                }
            }
            LobbyEvent::Refused { name, reason } => {
                println!("Turned away {name}: {reason}");
            }
            LobbyEvent::Started { participants } => {
                println!("Game started with {participants} players");
                return;
            }
        }
    }
}
