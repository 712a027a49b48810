//! Round synchronization between participant handlers and the host.
//!
//! Every mutation publishes a fresh [`RoundStatus`] on a watch channel, and
//! waiters re-check their predicate against each new snapshot. Waiters also
//! wake up every `check_interval` to log who they're still waiting on.

use log::debug;
use std::{collections::BTreeSet, time::Duration};
use tokio::{sync::watch, time::timeout};

use super::{
    errors::{GameError, GameResult},
    registry::ParticipantId,
};

/// How often a blocked waiter logs the pending set.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of a participant's decision as far as the barrier is concerned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Recorded {
    /// The participant paid to continue.
    Paid,
    /// The participant wanted to continue but couldn't cover the fee; they
    /// settle once the round closes.
    Shortfall,
}

/// Snapshot of the current round.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RoundStatus {
    /// Round number, 0 before the first round is armed.
    pub round: u64,
    /// Participants still part of the round.
    pub members: BTreeSet<ParticipantId>,
    /// Participants that haven't decided yet.
    pub pending: BTreeSet<ParticipantId>,
    /// Participants with a shortfall that haven't settled yet.
    pub unsettled: BTreeSet<ParticipantId>,
    /// Active participant count when the round was armed.
    pub armed_with: usize,
    pub closed: bool,
    /// Set once the game is over; releases every waiter.
    pub finished: bool,
}

impl RoundStatus {
    pub fn active(&self) -> usize {
        self.members.len()
    }

    /// Whether the round can be released: everyone decided, at most one
    /// participant is left, or the table shrank to two during the round
    /// (nobody can fold anymore, so nothing else can change the outcome).
    pub fn can_close(&self) -> bool {
        self.pending.is_empty()
            || self.active() <= 1
            || (self.active() == 2 && self.armed_with > 2)
    }

    fn close_if_ready(&mut self) {
        if self.round > 0 && !self.closed && self.can_close() {
            self.closed = true;
            debug!(
                "Round {} closed with {} active, {} undecided",
                self.round,
                self.active(),
                self.pending.len()
            );
        }
    }

    fn is_closed(&self, round: u64) -> bool {
        self.finished || self.round > round || (self.round == round && self.closed)
    }
}

#[derive(Debug)]
pub struct RoundBarrier {
    tx: watch::Sender<RoundStatus>,
    check_interval: Duration,
}

impl Default for RoundBarrier {
    fn default() -> Self {
        Self::new(DEFAULT_CHECK_INTERVAL)
    }
}

impl RoundBarrier {
    pub fn new(check_interval: Duration) -> Self {
        let (tx, _) = watch::channel(RoundStatus::default());
        Self { tx, check_interval }
    }

    /// Open the next round for `ids`, marking all of them pending. Returns
    /// the new round number.
    pub fn arm(&self, ids: &[ParticipantId]) -> u64 {
        let mut round = 0;
        self.tx.send_modify(|status| {
            status.round += 1;
            status.members = ids.iter().copied().collect();
            status.pending = status.members.clone();
            status.unsettled.clear();
            status.armed_with = status.members.len();
            status.closed = false;
            status.close_if_ready();
            round = status.round;
        });
        debug!("Armed round {round} for {} participants", ids.len());
        round
    }

    /// Record `id`'s decision for `round`.
    ///
    /// # Errors
    ///
    /// Fails if `round` isn't the open round, the round already closed, or
    /// `id` has already decided.
    pub fn record(&self, round: u64, id: ParticipantId, outcome: Recorded) -> GameResult<()> {
        let mut result = Ok(());
        self.tx.send_if_modified(|status| {
            if status.round != round {
                result = Err(GameError::StaleRound {
                    open: status.round,
                    got: round,
                });
                return false;
            }
            if status.closed {
                result = Err(GameError::RoundClosed { round });
                return false;
            }
            if !status.pending.remove(&id) {
                result = Err(GameError::DecisionNotExpected { id, round });
                return false;
            }
            if outcome == Recorded::Shortfall {
                status.unsettled.insert(id);
            }
            status.close_if_ready();
            true
        });
        result
    }

    /// Drop `id` from the round entirely. Returns whether `id` was part of
    /// it.
    pub fn withdraw(&self, id: ParticipantId) -> bool {
        self.tx.send_if_modified(|status| {
            let was_member = status.members.remove(&id);
            let was_pending = status.pending.remove(&id);
            let was_unsettled = status.unsettled.remove(&id);
            status.close_if_ready();
            was_member || was_pending || was_unsettled
        })
    }

    /// Mark a shortfall as dealt with.
    pub fn settle(&self, id: ParticipantId) {
        self.tx.send_if_modified(|status| status.unsettled.remove(&id));
    }

    /// Release every waiter for good.
    pub fn finish(&self) {
        self.tx.send_modify(|status| {
            status.finished = true;
            status.closed = true;
        });
    }

    pub fn snapshot(&self) -> RoundStatus {
        self.tx.borrow().clone()
    }

    pub fn is_pending(&self, id: ParticipantId) -> bool {
        self.tx.borrow().pending.contains(&id)
    }

    /// Wait until `round` (or a later one) has been armed.
    pub async fn wait_open(&self, round: u64) -> RoundStatus {
        self.wait_until("round to open", |status| {
            status.finished || status.round >= round
        })
        .await
    }

    /// Wait until `round` has closed.
    pub async fn wait_closed(&self, round: u64) -> RoundStatus {
        self.wait_until("decisions", |status| status.is_closed(round))
            .await
    }

    /// Wait until `round` has closed and every shortfall has settled.
    pub async fn wait_settled(&self, round: u64) -> RoundStatus {
        self.wait_until("settlement", |status| {
            status.finished || (status.is_closed(round) && status.unsettled.is_empty())
        })
        .await
    }

    async fn wait_until<F>(&self, what: &str, mut pred: F) -> RoundStatus
    where
        F: FnMut(&RoundStatus) -> bool,
    {
        let mut rx = self.tx.subscribe();
        loop {
            let waited = timeout(self.check_interval, async {
                rx.wait_for(&mut pred)
                    .await
                    .map(|status| RoundStatus::clone(&status))
            })
            .await;
            match waited {
                Ok(Ok(status)) => return status,
                // The sender lives as long as `self`, so this can't happen
                // while we're borrowed.
                Ok(Err(_)) => return rx.borrow().clone(),
                Err(_) => {
                    let status = rx.borrow().clone();
                    debug!(
                        "Still waiting for {what} in round {}: pending {:?}, unsettled {:?}",
                        status.round, status.pending, status.unsettled
                    );
                }
            }
        }
    }
}
