//! End-to-end games over in-memory channels.
//!
//! Every participant is a scripted task holding the remote end of a
//! connection; the host runs exactly as it does behind the TCP server.

use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};
use tri_poker::{
    GameError, GameSettings, GameSummary, Host, LobbyEvent, Money, Resolution, Session, Username,
    net::{
        connection::{Connection, PendingJoin, Remote},
        messages::{HostNotice, ServerMessage},
    },
    session::barrier::RoundBarrier,
};

const GAME_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug)]
enum Script {
    /// Answer every menu with `1`.
    Continue,
    /// Fold once this many others have advanced in the round.
    FoldAfter(usize),
    /// Hang up at the first menu.
    Disconnect,
}

async fn play(mut remote: Remote, script: Script) -> Vec<ServerMessage> {
    let mut log = Vec::new();
    let mut advanced = None;
    while let Some(msg) = remote.recv().await {
        match (&msg, script) {
            (ServerMessage::Menu, Script::Continue) => {
                remote.send_line("1").await;
            }
            (ServerMessage::Menu, Script::FoldAfter(0)) => {
                remote.send_line("2").await;
            }
            (ServerMessage::Menu, Script::FoldAfter(_)) => advanced = Some(0),
            (ServerMessage::Menu, Script::Disconnect) => return log,
            (ServerMessage::Notice(HostNotice::Advanced(_)), Script::FoldAfter(n)) => {
                if let Some(count) = advanced.as_mut() {
                    *count += 1;
                    if *count == n {
                        remote.send_line("2").await;
                        advanced = None;
                    }
                }
            }
            _ => {}
        }
        log.push(msg);
    }
    log
}

struct Table {
    joins: mpsc::Sender<PendingJoin>,
    start: mpsc::Sender<()>,
    events: mpsc::UnboundedReceiver<LobbyEvent>,
    host: JoinHandle<Result<GameSummary, GameError>>,
}

fn settings(stake_units: u64, min: usize, max: usize) -> GameSettings {
    GameSettings::new(Money::from_units(2), Money::from_units(stake_units), min, max)
        .with_intro_pause(Duration::ZERO)
}

fn open_table(settings: GameSettings) -> Table {
    let session = Session::with_barrier(settings, RoundBarrier::new(Duration::from_millis(20)))
        .unwrap();
    let (events_tx, events) = mpsc::unbounded_channel();
    let host = Host::with_session(Arc::new(session)).with_lobby_events(events_tx);
    let (joins, joins_rx) = mpsc::channel(32);
    let (start, start_rx) = mpsc::channel(4);
    Table {
        joins,
        start,
        events,
        host: tokio::spawn(host.run(joins_rx, start_rx)),
    }
}

impl Table {
    async fn join_remote(&self, name: &str) -> Remote {
        let (conn, remote) = Connection::pair();
        self.joins
            .send(PendingJoin::new(Username::new(name), conn))
            .await
            .unwrap();
        remote
    }

    async fn join(&self, name: &str, script: Script) -> JoinHandle<Vec<ServerMessage>> {
        let remote = self.join_remote(name).await;
        tokio::spawn(play(remote, script))
    }

    async fn next_event(&mut self) -> LobbyEvent {
        timeout(GAME_TIMEOUT, self.events.recv())
            .await
            .unwrap()
            .unwrap()
    }

    /// Wait until enough participants are seated, then start.
    async fn start_when_ready(&mut self) {
        loop {
            if let LobbyEvent::Joined { ready: true, .. } = self.next_event().await {
                break;
            }
        }
        self.start.send(()).await.unwrap();
    }

    async fn finish(self) -> GameSummary {
        timeout(GAME_TIMEOUT, self.host)
            .await
            .unwrap()
            .unwrap()
            .unwrap()
    }
}

fn total(payouts: &[(Username, Money)]) -> Money {
    payouts
        .iter()
        .fold(Money::ZERO, |sum, (_, amount)| sum + *amount)
}

// ============================================================================
// Full Game Flow Tests - Lobby to Resolution
// ============================================================================

#[tokio::test]
async fn test_fold_down_to_heads_up() {
    let mut table = open_table(settings(12, 3, 17));
    let a = table.join("alice", Script::Continue).await;
    let b = table.join("bob", Script::Continue).await;
    let c = table.join("carol", Script::FoldAfter(2)).await;
    table.start_when_ready().await;

    let summary = table.finish().await;
    // 3 joining fees plus two paid continues.
    assert_eq!(summary.pot, Money::from_units(10));
    assert_eq!(summary.rounds, 1);
    assert_eq!(total(&summary.payouts), summary.pot);
    assert!(matches!(
        summary.resolution,
        Resolution::Winner(_) | Resolution::Tie(..)
    ));
    assert_eq!(summary.standings.len(), 2);
    let final_total = summary
        .standings
        .iter()
        .fold(Money::ZERO, |sum, p| sum + p.balance);
    assert_eq!(final_total, Money::from_units(8 + 8 + 10));

    let carol = c.await.unwrap();
    assert!(carol.contains(&ServerMessage::Notice(HostNotice::Folded(Username::new(
        "carol"
    )))));
    for log in [a.await.unwrap(), b.await.unwrap()] {
        assert!(log.contains(&ServerMessage::Status("The game has begun!".to_string())));
        assert!(log.iter().any(|m| matches!(m, ServerMessage::Hand(_))));
        assert!(log.contains(&ServerMessage::Notice(HostNotice::Folded(Username::new(
            "carol"
        )))));
        assert_eq!(
            log.last(),
            Some(&ServerMessage::Notice(HostNotice::ClosingConnection))
        );
    }
}

#[tokio::test]
async fn test_everyone_broke_ends_in_bankruptcy() {
    // 4 units left after joining: two paid rounds, then nobody can pay.
    let mut table = open_table(settings(6, 3, 17));
    let players = [
        table.join("a", Script::Continue).await,
        table.join("b", Script::Continue).await,
        table.join("c", Script::Continue).await,
    ];
    table.start_when_ready().await;

    let summary = table.finish().await;
    assert_eq!(summary.rounds, 3);
    assert_eq!(summary.pot, Money::from_units(6 + 6 + 6));
    let Resolution::Winner(_) = summary.resolution else {
        panic!("expected a single winner, got {:?}", summary.resolution);
    };
    assert_eq!(summary.payouts.len(), 1);
    assert_eq!(summary.payouts[0].1, Money::from_units(18));
    assert_eq!(summary.standings.len(), 3);

    let winner = &summary.payouts[0].0;
    for player in players {
        let log = player.await.unwrap();
        assert!(log.contains(&ServerMessage::Notice(HostNotice::Won(winner.clone()))));
        assert!(!log.iter().any(|m| matches!(
            m,
            ServerMessage::Notice(HostNotice::Eliminated(_))
        )));
    }
}

#[tokio::test]
async fn test_everyone_disconnects_abandons_game() {
    let mut table = open_table(settings(12, 3, 17));
    let mut remotes = Vec::new();
    for name in ["a", "b", "c"] {
        remotes.push(table.join_remote(name).await);
    }
    table.start_when_ready().await;

    for remote in &mut remotes {
        while let Some(msg) = timeout(GAME_TIMEOUT, remote.recv()).await.unwrap() {
            if msg == ServerMessage::Menu {
                break;
            }
        }
    }
    drop(remotes);

    let summary = table.finish().await;
    assert_eq!(summary.resolution, Resolution::Abandoned);
    assert!(summary.payouts.is_empty());
    assert!(summary.standings.is_empty());
    assert_eq!(summary.pot, Money::from_units(6));
}

#[tokio::test]
async fn test_full_table_starts_without_operator() {
    let mut table = open_table(settings(12, 3, 3));
    let _players = [
        table.join("a", Script::Continue).await,
        table.join("b", Script::Continue).await,
        table.join("c", Script::FoldAfter(2)).await,
    ];
    loop {
        if let LobbyEvent::Started { participants } = table.next_event().await {
            assert_eq!(participants, 3);
            break;
        }
    }
    let summary = table.finish().await;
    assert_eq!(total(&summary.payouts), summary.pot);
}

#[tokio::test]
async fn test_early_start_is_ignored() {
    let mut table = open_table(settings(12, 3, 17));
    let _a = table.join("a", Script::Continue).await;
    let _b = table.join("b", Script::Continue).await;
    for _ in 0..2 {
        assert!(matches!(
            table.next_event().await,
            LobbyEvent::Joined { ready: false, .. }
        ));
    }
    table.start.send(()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let _c = table.join("c", Script::FoldAfter(2)).await;
    assert!(matches!(
        table.next_event().await,
        LobbyEvent::Joined {
            ready: true,
            participants: 3,
            ..
        }
    ));
    table.start.send(()).await.unwrap();
    assert_eq!(
        table.next_event().await,
        LobbyEvent::Started { participants: 3 }
    );
    table.finish().await;
}

#[tokio::test]
async fn test_late_join_is_refused() {
    let mut table = open_table(settings(12, 3, 3));
    let _players = [
        table.join("a", Script::Continue).await,
        table.join("b", Script::Continue).await,
        table.join("c", Script::FoldAfter(2)).await,
    ];
    loop {
        if let LobbyEvent::Started { .. } = table.next_event().await {
            break;
        }
    }

    let (conn, mut remote) = Connection::pair();
    table
        .joins
        .send(PendingJoin::new(Username::new("late"), conn))
        .await
        .unwrap();
    assert_eq!(
        timeout(GAME_TIMEOUT, remote.recv()).await.unwrap(),
        Some(ServerMessage::Notice(HostNotice::GameAlreadyStarted))
    );
    table.finish().await;
}

#[tokio::test]
async fn test_joins_closing_below_minimum_fails() {
    let table = open_table(settings(12, 3, 17));
    let _a = table.join("a", Script::Continue).await;
    let Table { joins, host, .. } = table;
    drop(joins);
    let result = timeout(GAME_TIMEOUT, host).await.unwrap().unwrap();
    assert!(matches!(
        result,
        Err(GameError::NotEnoughParticipants {
            joined: 1,
            required: 3
        })
    ));
}
