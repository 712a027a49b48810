//! The host: lobby, dealing, the round loop, and resolution.

use std::sync::Arc;
use tokio::{
    sync::mpsc,
    task::JoinSet,
    time::sleep,
};

use super::handler::{HandlerExit, SessionHandler};
use crate::{
    game::{
        GameSettings,
        entities::{Deck, Money, Username},
        eval::{Showdown, compare},
    },
    net::{
        connection::{Connection, PendingJoin},
        messages::{HostNotice, ServerMessage},
    },
    session::{
        Session,
        errors::{GameError, GameResult},
        registry::{ParticipantId, ParticipantView},
        state::{Phase, split_pot},
    },
};

/// Lines shown to everyone before the first deal.
pub const INTRO: [&str; 3] = ["The game has begun!", "Shuffling cards...", "Dealing cards..."];

/// Lobby updates for whoever operates the host.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LobbyEvent {
    Joined {
        name: Username,
        participants: usize,
        /// Enough participants to start.
        ready: bool,
    },
    Refused {
        name: Username,
        reason: String,
    },
    Started {
        participants: usize,
    },
}

/// How a game ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resolution {
    Winner(ParticipantId),
    /// Two winners, in registry order.
    Tie(ParticipantId, ParticipantId),
    /// Everyone left before a winner could be picked.
    Abandoned,
}

/// Result of a finished game.
#[derive(Clone, Debug)]
pub struct GameSummary {
    pub resolution: Resolution,
    /// Winners and what they took from the pot.
    pub payouts: Vec<(Username, Money)>,
    pub pot: Money,
    /// Rounds played.
    pub rounds: u64,
    /// Everyone still seated at the end, with final balances.
    pub standings: Vec<ParticipantView>,
}

/// Compare two participants' hands. A missing hand loses.
fn showdown(a: &ParticipantView, b: &ParticipantView) -> Showdown {
    match (&a.hand, &b.hand) {
        (Some(hand_a), Some(hand_b)) => compare(hand_a, hand_b),
        (Some(_), None) => Showdown::A,
        (None, Some(_)) => Showdown::B,
        (None, None) => Showdown::Tie,
    }
}

/// Winner after a simultaneous bankruptcy: walk adjacent pairs in registry
/// order and keep whoever won the latest comparison. This is a heuristic and
/// doesn't always pick the best hand at the table.
pub fn fold_left_winner(participants: &[ParticipantView]) -> Option<ParticipantId> {
    let mut candidate = participants.first()?.id;
    for pair in participants.windows(2) {
        match showdown(&pair[0], &pair[1]) {
            Showdown::A => candidate = pair[0].id,
            Showdown::B => candidate = pair[1].id,
            Showdown::Tie => {}
        }
    }
    Some(candidate)
}

/// Decide whether the game is over. `None` means play another round.
pub fn resolve(participants: &[ParticipantView], bankrupt: bool) -> Option<Resolution> {
    match participants {
        [] => Some(Resolution::Abandoned),
        _ if bankrupt => fold_left_winner(participants).map(Resolution::Winner),
        [only] => Some(Resolution::Winner(only.id)),
        [a, b] => Some(match showdown(a, b) {
            Showdown::A => Resolution::Winner(a.id),
            Showdown::B => Resolution::Winner(b.id),
            Showdown::Tie => Resolution::Tie(a.id, b.id),
        }),
        _ => None,
    }
}

pub struct Host {
    session: Arc<Session>,
    handlers: JoinSet<(ParticipantId, HandlerExit)>,
    lobby_events: Option<mpsc::UnboundedSender<LobbyEvent>>,
}

impl Host {
    /// # Errors
    ///
    /// Fails when the settings don't validate.
    pub fn new(settings: GameSettings) -> GameResult<Self> {
        Ok(Self::with_session(Arc::new(Session::new(settings)?)))
    }

    pub fn with_session(session: Arc<Session>) -> Self {
        Self {
            session,
            handlers: JoinSet::new(),
            lobby_events: None,
        }
    }

    #[must_use]
    pub fn with_lobby_events(mut self, events: mpsc::UnboundedSender<LobbyEvent>) -> Self {
        self.lobby_events = Some(events);
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Run one game from the lobby to resolution.
    ///
    /// The lobby ends when the operator sends on `start` with enough
    /// participants seated, or as soon as the table is full. If `joins`
    /// closes before that, the game starts with whoever is seated.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotEnoughParticipants`] when joins close before
    /// the minimum is reached.
    pub async fn run(
        mut self,
        mut joins: mpsc::Receiver<PendingJoin>,
        mut start: mpsc::Receiver<()>,
    ) -> GameResult<GameSummary> {
        self.lobby(&mut joins, &mut start).await?;
        let refuser = tokio::spawn(refuse_late_joins(joins));

        self.deal().await?;
        let (resolution, rounds) = self.play().await?;
        let summary = self.finish(resolution, rounds).await;

        refuser.abort();
        Ok(summary)
    }

    async fn lobby(
        &mut self,
        joins: &mut mpsc::Receiver<PendingJoin>,
        start: &mut mpsc::Receiver<()>,
    ) -> GameResult<()> {
        let settings = self.session.settings().clone();
        let mut operator_present = true;
        log::info!(
            "Lobby open: {} to {} participants",
            settings.min_participants,
            settings.max_participants
        );

        loop {
            tokio::select! {
                pending = joins.recv() => {
                    let Some(pending) = pending else {
                        let joined = self.session.active_count().await;
                        if joined >= settings.min_participants {
                            log::info!("No more joins, starting with {joined}");
                            break;
                        }
                        return Err(GameError::NotEnoughParticipants {
                            joined,
                            required: settings.min_participants,
                        });
                    };
                    self.seat(pending).await;
                    if self.session.active_count().await >= settings.max_participants {
                        log::info!("Table full, starting");
                        break;
                    }
                }
                signal = start.recv(), if operator_present => {
                    if signal.is_none() {
                        operator_present = false;
                        continue;
                    }
                    let joined = self.session.active_count().await;
                    if joined >= settings.min_participants {
                        log::info!("Operator started the game with {joined}");
                        break;
                    }
                    log::warn!(
                        "Ignoring start request: {joined} seated, {} needed",
                        settings.min_participants
                    );
                }
            }
        }

        let participants = self.session.active_count().await;
        self.emit(LobbyEvent::Started { participants });
        Ok(())
    }

    async fn seat(&mut self, pending: PendingJoin) {
        let PendingJoin {
            username,
            connection: Connection { inbound, outbound },
        } = pending;
        match self.session.join(username.clone(), outbound.clone()).await {
            Ok(id) => {
                let handler =
                    SessionHandler::new(id, username.clone(), self.session.clone(), inbound);
                self.handlers
                    .spawn(async move { (id, handler.run().await) });
                let participants = self.session.active_count().await;
                self.emit(LobbyEvent::Joined {
                    name: username,
                    participants,
                    ready: participants >= self.session.settings().min_participants,
                });
            }
            Err(e) => {
                log::warn!("Refused {username}: {e}");
                let notice = match e {
                    GameError::CapacityReached { .. } => HostNotice::TableFull,
                    _ => HostNotice::GameAlreadyStarted,
                };
                let _ = outbound.send(notice.into());
                let _ = outbound.send(HostNotice::ClosingConnection.into());
                self.emit(LobbyEvent::Refused {
                    name: username,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: LobbyEvent) {
        if let Some(events) = &self.lobby_events {
            let _ = events.send(event);
        }
    }

    async fn deal(&mut self) -> GameResult<()> {
        self.session.advance(Phase::Dealing).await?;
        let pause = self.session.settings().intro_pause;
        for line in INTRO {
            self.session
                .broadcast(ServerMessage::Status(line.to_string()))
                .await;
            sleep(pause).await;
        }
        let mut deck = Deck::default();
        deck.shuffle();
        self.session.deal(&mut deck).await;
        self.session.advance(Phase::RoundInProgress).await
    }

    async fn play(&mut self) -> GameResult<(Resolution, u64)> {
        let mut rounds = 0;
        loop {
            self.reap_handlers();
            self.session.show_round_info().await;
            let participants = self.session.views().await;
            let bankrupt = self.session.is_bankrupt().await;
            if let Some(resolution) = resolve(&participants, bankrupt) {
                log::info!(
                    "Resolved after {rounds} rounds with {} left: {resolution:?}",
                    participants.len()
                );
                return Ok((resolution, rounds));
            }

            let round = self.session.arm_round().await;
            self.session.broadcast(ServerMessage::Menu).await;
            log::debug!("Round {round} open for {} participants", participants.len());
            self.session.barrier().wait_settled(round).await;
            rounds = round;
        }
    }

    /// Log handlers that already stopped.
    fn reap_handlers(&mut self) {
        while let Some(joined) = self.handlers.try_join_next() {
            match joined {
                Ok((id, exit)) => log::debug!("Handler for {id} finished: {exit:?}"),
                Err(e) => log::error!("Handler task failed: {e}"),
            }
        }
    }

    async fn finish(mut self, resolution: Resolution, rounds: u64) -> GameSummary {
        if let Err(e) = self.session.advance(Phase::Resolved).await {
            log::error!("Couldn't mark the game resolved: {e}");
        }
        let pot = self.session.award_pot().await;
        let participants = self.session.views().await;
        let name_of = |id: ParticipantId| {
            participants
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.name.clone())
        };

        let mut payouts = Vec::new();
        match resolution {
            Resolution::Winner(id) => {
                payouts.extend(name_of(id).map(|name| (id, name, pot)));
            }
            Resolution::Tie(a, b) => {
                let (share_a, share_b) = split_pot(pot);
                payouts.extend(name_of(a).map(|name| (a, name, share_a)));
                payouts.extend(name_of(b).map(|name| (b, name, share_b)));
            }
            Resolution::Abandoned => {}
        }

        for (id, _, amount) in &payouts {
            if let Err(e) = self.session.credit(*id, *amount).await {
                log::error!("Couldn't pay out {amount} to {id}: {e}");
            }
        }
        match (resolution, payouts.as_slice()) {
            (Resolution::Winner(_), [(_, name, amount)]) => {
                log::info!("{name} won {amount}");
                self.session.broadcast(HostNotice::Won(name.clone())).await;
                self.session
                    .broadcast(HostNotice::Made(name.clone(), *amount))
                    .await;
            }
            (Resolution::Tie(..), [(_, a, share_a), (_, b, share_b)]) => {
                log::info!("{a} and {b} tied, splitting {pot}");
                self.session
                    .broadcast(HostNotice::Tied(a.clone(), b.clone()))
                    .await;
                self.session
                    .broadcast(HostNotice::Made(a.clone(), *share_a))
                    .await;
                self.session
                    .broadcast(HostNotice::Made(b.clone(), *share_b))
                    .await;
            }
            _ => {
                log::info!("No winner, {pot} left unclaimed");
                self.session.broadcast(HostNotice::NoWinner).await;
            }
        }

        let standings = self.session.close_all().await;
        self.reap_handlers();
        self.handlers.shutdown().await;

        GameSummary {
            resolution,
            payouts: payouts
                .into_iter()
                .map(|(_, name, amount)| (name, amount))
                .collect(),
            pot,
            rounds,
            standings,
        }
    }
}

/// Turn away anyone who connects after the lobby closed.
async fn refuse_late_joins(mut joins: mpsc::Receiver<PendingJoin>) {
    while let Some(pending) = joins.recv().await {
        log::info!("Refusing {}: game already started", pending.username);
        let outbound = &pending.connection.outbound;
        let _ = outbound.send(HostNotice::GameAlreadyStarted.into());
        let _ = outbound.send(HostNotice::ClosingConnection.into());
    }
}
