//! Per-participant round loop.

use std::{sync::Arc, time::Duration};
use tokio::time::timeout;

use crate::{
    game::entities::Username,
    net::{
        connection::Inbox,
        messages::{Decision, HostNotice},
    },
    session::{
        Departure, Session, Settlement,
        barrier::Recorded,
        errors::GameError,
        registry::ParticipantId,
    },
};

/// Where a handler is in its round loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandlerState {
    AwaitingGameStart,
    AwaitingDecision,
    DecisionRecorded,
    EliminatedOrFolded,
    AdvancingToNextRound,
}

/// Why a handler stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandlerExit {
    Folded,
    Eliminated,
    Disconnected,
    /// The game ended while the participant was still seated.
    GameOver,
}

enum Input {
    Line(String),
    TimedOut,
    Closed,
}

/// Drives one participant through the rounds until they leave or the game
/// ends.
pub struct SessionHandler {
    id: ParticipantId,
    name: Username,
    session: Arc<Session>,
    inbox: Inbox,
    state: HandlerState,
}

impl SessionHandler {
    pub fn new(id: ParticipantId, name: Username, session: Arc<Session>, inbox: Inbox) -> Self {
        Self {
            id,
            name,
            session,
            inbox,
            state: HandlerState::AwaitingGameStart,
        }
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub async fn run(mut self) -> HandlerExit {
        let mut round = 1;
        let exit = loop {
            match self.play_round(round).await {
                Ok(next) => round = next,
                Err(exit) => break exit,
            }
        };
        self.state = HandlerState::EliminatedOrFolded;
        log::debug!("Handler for {} ({}) stopped: {exit:?}", self.name, self.id);
        exit
    }

    /// Play `round`, returning the next round to wait for.
    async fn play_round(&mut self, round: u64) -> Result<u64, HandlerExit> {
        let session = self.session.clone();
        let barrier = session.barrier();

        // Watch for a disconnect while waiting for the round to open. Lines
        // sent before the menu is shown are ignored.
        let status = loop {
            let line = tokio::select! {
                biased;
                status = barrier.wait_open(round) => break status,
                line = self.inbox.recv() => line,
            };
            match line {
                Some(line) => log::debug!("{} sent {line:?} between rounds", self.name),
                None => return Err(self.disconnect().await),
            }
        };
        if status.finished {
            return Err(HandlerExit::GameOver);
        }
        let round = status.round;
        if !status.members.contains(&self.id) {
            return Err(HandlerExit::Eliminated);
        }

        self.state = HandlerState::AwaitingDecision;
        let input = tokio::select! {
            biased;
            input = self.read_decision() => Some(input),
            _ = barrier.wait_closed(round) => None,
        };
        let Some(input) = input else {
            // Released without us; nothing left to decide this round.
            self.state = HandlerState::AdvancingToNextRound;
            return Ok(round + 1);
        };
        let decision = match input {
            Input::Line(line) => Decision::parse(&line),
            Input::TimedOut => {
                log::info!("{} took too long to decide, folding", self.name);
                Decision::Fold
            }
            Input::Closed => return Err(self.disconnect().await),
        };
        log::debug!("{} chose {decision} in round {round}", self.name);

        if decision.is_fold() {
            match session.try_fold(self.id).await {
                Ok(_) => return Err(HandlerExit::Folded),
                Err(GameError::FoldNotAllowed { active }) => {
                    log::debug!("{} can't fold with {active} left", self.name);
                    session.send_to(self.id, HostNotice::FoldRefused).await;
                }
                Err(_) => return Err(HandlerExit::Eliminated),
            }
        }
        self.continue_round(round).await?;

        self.state = HandlerState::AdvancingToNextRound;
        Ok(round + 1)
    }

    async fn continue_round(&mut self, round: u64) -> Result<(), HandlerExit> {
        let session = self.session.clone();
        let barrier = session.barrier();

        let outcome = match session.pay_entry_fee(round, self.id).await {
            Ok(balance) => {
                log::debug!("{} paid in, balance {balance}", self.name);
                Recorded::Paid
            }
            Err(GameError::InsufficientBalance { balance, required }) => {
                log::info!("{} can't cover {required} with {balance}", self.name);
                Recorded::Shortfall
            }
            Err(GameError::UnknownParticipant(_)) => return Err(HandlerExit::Eliminated),
            Err(e) => {
                log::debug!("Decision from {} not recorded: {e}", self.name);
                return Ok(());
            }
        };

        self.state = HandlerState::DecisionRecorded;
        session.send_to(self.id, HostNotice::WaitForOthers).await;
        barrier.wait_closed(round).await;

        if outcome == Recorded::Shortfall {
            match session.settle_shortfall(self.id).await {
                Settlement::Eliminated => return Err(HandlerExit::Eliminated),
                Settlement::Bankruptcy => {}
            }
        }
        Ok(())
    }

    async fn read_decision(&mut self) -> Input {
        let decision_timeout: Option<Duration> = self.session.settings().decision_timeout;
        match decision_timeout {
            Some(limit) => match timeout(limit, self.inbox.recv()).await {
                Ok(Some(line)) => Input::Line(line),
                Ok(None) => Input::Closed,
                Err(_) => Input::TimedOut,
            },
            None => match self.inbox.recv().await {
                Some(line) => Input::Line(line),
                None => Input::Closed,
            },
        }
    }

    async fn disconnect(&mut self) -> HandlerExit {
        log::warn!("{} ({}) disconnected", self.name, self.id);
        self.session.remove(self.id, Departure::Disconnected).await;
        HandlerExit::Disconnected
    }
}
