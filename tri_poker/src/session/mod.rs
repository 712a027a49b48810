//! Shared game state for one game instance.
//!
//! A [`Session`] owns the participant [`Registry`], the [`GameState`] (pot
//! and phase) and the [`RoundBarrier`]. It's shared between the host and
//! every participant handler behind an `Arc`.
//!
//! Lock order is always registry first, then state. Operations that touch
//! both (paying the entry fee, joining) take them in that order and hold
//! them for the whole operation.

pub mod barrier;
pub mod errors;
pub mod registry;
pub mod state;

use tokio::sync::Mutex;

use barrier::{Recorded, RoundBarrier};
use errors::{GameError, GameResult};
use registry::{Participant, ParticipantId, ParticipantView, Registry};
use state::{GameState, Phase};

use crate::{
    game::{
        GameSettings,
        entities::{Deck, Money, Username},
    },
    net::{
        connection::Outbox,
        messages::{HostNotice, ServerMessage},
    },
};

/// Why a participant left the registry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Departure {
    Folded,
    Eliminated,
    Disconnected,
}

/// What happened to a participant who couldn't pay to continue.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Settlement {
    /// Nobody left can pay; the game ends with the fold-left pick.
    Bankruptcy,
    /// Only this participant is short; they're out.
    Eliminated,
}

#[derive(Debug)]
pub struct Session {
    settings: GameSettings,
    registry: Mutex<Registry>,
    state: Mutex<GameState>,
    barrier: RoundBarrier,
}

impl Session {
    /// # Errors
    ///
    /// Fails when the settings don't validate.
    pub fn new(settings: GameSettings) -> GameResult<Self> {
        Self::with_barrier(settings, RoundBarrier::default())
    }

    /// # Errors
    ///
    /// Fails when the settings don't validate.
    pub fn with_barrier(settings: GameSettings, barrier: RoundBarrier) -> GameResult<Self> {
        settings.validate()?;
        Ok(Self {
            state: Mutex::new(GameState::new(settings.entry_fee)),
            registry: Mutex::new(Registry::new()),
            settings,
            barrier,
        })
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn barrier(&self) -> &RoundBarrier {
        &self.barrier
    }

    /// Seat a new participant: assign the next id, charge the joining fee
    /// into the pot, and tell everyone else.
    ///
    /// # Errors
    ///
    /// Fails once the game has started or the table is full.
    pub async fn join(&self, name: Username, outbox: Outbox) -> GameResult<ParticipantId> {
        let mut registry = self.registry.lock().await;
        let mut state = self.state.lock().await;
        if state.phase() != Phase::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        if registry.count() >= self.settings.max_participants {
            return Err(GameError::CapacityReached {
                max: self.settings.max_participants,
            });
        }

        let id = registry.next_id();
        let participant = Participant::new(
            id,
            name.clone(),
            self.settings.balance_after_joining(),
            outbox,
        );
        registry.add(participant)?;
        state.collect_fee(self.settings.entry_fee);
        registry.broadcast(&HostNotice::Joined(name.clone()).into(), Some(id));
        log::info!(
            "{name} joined as {id} ({}/{} seated, pot {})",
            registry.count(),
            self.settings.max_participants,
            state.pot()
        );
        Ok(id)
    }

    /// Pay the entry fee to continue `round`. Returns the participant's new
    /// balance.
    ///
    /// The decision is recorded on the barrier before any money moves, all
    /// under the registry lock that every round-closing change also takes.
    /// A round that closed in the meantime therefore charges nothing. The
    /// rest of the table hears that `id` advanced.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RoundClosed`], [`GameError::StaleRound`] or
    /// [`GameError::DecisionNotExpected`] when `id` can't decide in `round`;
    /// nothing changes. Returns [`GameError::InsufficientBalance`] when the
    /// fee isn't covered; the shortfall is recorded and settles after the
    /// round closes.
    pub async fn pay_entry_fee(&self, round: u64, id: ParticipantId) -> GameResult<Money> {
        let mut registry = self.registry.lock().await;
        let participant = registry
            .find_by_id_mut(id)
            .ok_or(GameError::UnknownParticipant(id))?;
        let mut state = self.state.lock().await;
        let fee = state.entry_fee();
        let balance = participant.balance;
        if balance < fee {
            self.barrier.record(round, id, Recorded::Shortfall)?;
            return Err(GameError::InsufficientBalance {
                balance,
                required: fee,
            });
        }
        self.barrier.record(round, id, Recorded::Paid)?;
        state.try_debit(participant, fee)?;
        state.collect_fee(fee);
        let balance = participant.balance;
        let name = participant.name.clone();
        registry.broadcast(&HostNotice::Advanced(name).into(), Some(id));
        Ok(balance)
    }

    /// Fold `id` out of the game. Folding needs at least three active
    /// participants, checked under the same lock as the removal.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::FoldNotAllowed`] with two or fewer participants
    /// left, or [`GameError::UnknownParticipant`] if `id` is already gone.
    pub async fn try_fold(&self, id: ParticipantId) -> GameResult<ParticipantView> {
        let mut registry = self.registry.lock().await;
        if !registry.contains(id) {
            return Err(GameError::UnknownParticipant(id));
        }
        let active = registry.count();
        if active < 3 {
            return Err(GameError::FoldNotAllowed { active });
        }
        self.depart(&mut registry, id, Departure::Folded)
            .ok_or(GameError::UnknownParticipant(id))
    }

    /// Remove `id` for good. Removing someone who's already gone does
    /// nothing.
    pub async fn remove(&self, id: ParticipantId, reason: Departure) -> Option<ParticipantView> {
        let mut registry = self.registry.lock().await;
        self.depart(&mut registry, id, reason)
    }

    /// Resolve a shortfall once the round has closed. If every remaining
    /// participant is below the fee the game ends in bankruptcy, otherwise
    /// `id` alone is eliminated.
    pub async fn settle_shortfall(&self, id: ParticipantId) -> Settlement {
        let mut registry = self.registry.lock().await;
        let fee = self.settings.entry_fee;
        let settlement = if !registry.is_empty() && registry.iter().all(|p| p.balance < fee) {
            log::info!("Nobody left can cover the {fee} entry fee");
            self.state.lock().await.flag_bankruptcy();
            Settlement::Bankruptcy
        } else {
            self.depart(&mut registry, id, Departure::Eliminated);
            Settlement::Eliminated
        };
        self.barrier.settle(id);
        settlement
    }

    fn depart(
        &self,
        registry: &mut Registry,
        id: ParticipantId,
        reason: Departure,
    ) -> Option<ParticipantView> {
        let participant = registry.remove_by_id(id)?;
        let view = ParticipantView::from(&participant);
        let notice = match reason {
            Departure::Folded => HostNotice::Folded(view.name.clone()),
            Departure::Eliminated => HostNotice::Eliminated(view.name.clone()),
            Departure::Disconnected => HostNotice::Disconnected(view.name.clone()),
        };
        if reason != Departure::Disconnected {
            participant.send(notice.clone());
            participant.send(HostNotice::ClosingConnection);
        }
        // Dropping the participant drops their outbox and closes the channel.
        drop(participant);
        registry.broadcast(&notice.into(), None);
        self.barrier.withdraw(id);
        log::info!(
            "{} left ({reason:?}), {} participants remain",
            view.name,
            registry.count()
        );
        Some(view)
    }

    pub async fn broadcast(&self, msg: impl Into<ServerMessage>) {
        let msg = msg.into();
        self.registry.lock().await.broadcast(&msg, None);
    }

    pub async fn send_to(&self, id: ParticipantId, msg: impl Into<ServerMessage>) {
        if let Some(participant) = self.registry.lock().await.find_by_id(id) {
            participant.send(msg);
        }
    }

    /// Arm the barrier for everyone currently active. Returns the round.
    pub async fn arm_round(&self) -> u64 {
        let registry = self.registry.lock().await;
        self.barrier.arm(&registry.ids())
    }

    /// Deal three cards to each participant in registry order.
    pub async fn deal(&self, deck: &mut Deck) {
        let mut registry = self.registry.lock().await;
        for id in registry.ids() {
            if let Some(participant) = registry.find_by_id_mut(id) {
                participant.hand = Some(deck.deal_hand());
            }
        }
        log::debug!("Dealt {} hands, {} cards left", registry.count(), deck.remaining());
    }

    /// Send every participant their hand and the table stats.
    pub async fn show_round_info(&self) {
        let registry = self.registry.lock().await;
        let pot = self.state.lock().await.pot();
        let participants = registry.count();
        for participant in registry.iter() {
            if let Some(hand) = participant.hand {
                participant.send(ServerMessage::Hand(hand));
            }
            participant.send(ServerMessage::Stats {
                pot,
                participants,
                balance: participant.balance,
            });
        }
    }

    pub async fn views(&self) -> Vec<ParticipantView> {
        self.registry.lock().await.views()
    }

    pub async fn active_count(&self) -> usize {
        self.registry.lock().await.count()
    }

    pub async fn pot(&self) -> Money {
        self.state.lock().await.pot()
    }

    /// # Errors
    ///
    /// Fails on a backwards transition.
    pub async fn advance(&self, to: Phase) -> GameResult<()> {
        let mut state = self.state.lock().await;
        let from = state.phase();
        state.advance(to)?;
        if from != to {
            log::info!("Game moved from {from} to {to}");
        }
        Ok(())
    }

    pub async fn is_bankrupt(&self) -> bool {
        self.state.lock().await.is_bankrupt()
    }

    pub async fn award_pot(&self) -> Money {
        self.state.lock().await.award_pot()
    }

    /// # Errors
    ///
    /// Fails if `id` is no longer seated.
    pub async fn credit(&self, id: ParticipantId, amount: Money) -> GameResult<Money> {
        let mut registry = self.registry.lock().await;
        let participant = registry
            .find_by_id_mut(id)
            .ok_or(GameError::UnknownParticipant(id))?;
        participant.balance += amount;
        Ok(participant.balance)
    }

    /// Close every channel and release anyone waiting on the barrier.
    /// Returns the participants that were still seated.
    pub async fn close_all(&self) -> Vec<ParticipantView> {
        let mut registry = self.registry.lock().await;
        let mut remaining = Vec::with_capacity(registry.count());
        for id in registry.ids() {
            if let Some(participant) = registry.remove_by_id(id) {
                participant.send(HostNotice::ClosingConnection);
                remaining.push(ParticipantView::from(&participant));
            }
        }
        self.barrier.finish();
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::{Connection, Remote};
    use std::{sync::Arc, time::Duration};

    fn session() -> Session {
        Session::with_barrier(
            GameSettings::default(),
            RoundBarrier::new(Duration::from_millis(10)),
        )
        .unwrap()
    }

    async fn seat(session: &Session, name: &str) -> (ParticipantId, Remote) {
        let (conn, remote) = Connection::pair();
        let id = session.join(Username::new(name), conn.outbound).await.unwrap();
        (id, remote)
    }

    #[tokio::test]
    async fn test_join_charges_fee_and_announces() {
        let session = session();
        let (a, mut remote_a) = seat(&session, "alice").await;
        let (b, _remote_b) = seat(&session, "bob").await;
        assert_eq!((a, b), (ParticipantId(1), ParticipantId(2)));
        assert_eq!(session.pot().await, Money::from_units(4));

        let views = session.views().await;
        assert_eq!(views[0].name.as_str(), "bob");
        assert!(views.iter().all(|v| v.balance == Money::from_units(10)));
        assert_eq!(
            remote_a.drain(),
            vec![ServerMessage::Notice(HostNotice::Joined(Username::new("bob")))]
        );
    }

    #[tokio::test]
    async fn test_join_refused_after_start() {
        let session = session();
        session.advance(Phase::Dealing).await.unwrap();
        let (conn, _remote) = Connection::pair();
        assert_eq!(
            session.join(Username::new("late"), conn.outbound).await,
            Err(GameError::GameAlreadyStarted)
        );
    }

    #[tokio::test]
    async fn test_join_refused_when_full() {
        let settings = GameSettings::new(Money::from_units(2), Money::from_units(12), 2, 2);
        let session = Session::new(settings).unwrap();
        seat(&session, "a").await;
        seat(&session, "b").await;
        let (conn, _remote) = Connection::pair();
        assert_eq!(
            session.join(Username::new("c"), conn.outbound).await,
            Err(GameError::CapacityReached { max: 2 })
        );
    }

    /// Arm rounds for the whole table and pay for `id` until a payment
    /// fails.
    async fn pay_until_short(session: &Session, id: ParticipantId) {
        loop {
            let round = session.arm_round().await;
            if session.pay_entry_fee(round, id).await.is_err() {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_pay_entry_fee_is_atomic() {
        let session = session();
        let (id, _remote) = seat(&session, "alice").await;
        let (_other, _other_remote) = seat(&session, "bob").await;
        for expected in [8, 6, 4, 2, 0] {
            let round = session.arm_round().await;
            assert_eq!(
                session.pay_entry_fee(round, id).await,
                Ok(Money::from_units(expected))
            );
        }
        let pot = session.pot().await;
        let round = session.arm_round().await;
        assert!(matches!(
            session.pay_entry_fee(round, id).await,
            Err(GameError::InsufficientBalance { .. })
        ));
        assert_eq!(session.pot().await, pot);
        assert!(session.barrier().snapshot().unsettled.contains(&id));
    }

    #[tokio::test]
    async fn test_pay_after_round_closed_charges_nothing() {
        let session = session();
        let (a, _ra) = seat(&session, "a").await;
        let (_b, _rb) = seat(&session, "b").await;
        let (c, _rc) = seat(&session, "c").await;
        let round = session.arm_round().await;

        // Dropping to two closes the round for everyone still pending.
        session.try_fold(c).await.unwrap();
        assert!(session.barrier().snapshot().closed);
        let awarded = session.award_pot().await;
        assert_eq!(awarded, Money::from_units(6));

        assert_eq!(
            session.pay_entry_fee(round, a).await,
            Err(GameError::RoundClosed { round })
        );
        assert_eq!(session.pot().await, Money::ZERO);
        let views = session.views().await;
        assert!(views.iter().all(|v| v.balance == Money::from_units(10)));
    }

    #[tokio::test]
    async fn test_pay_twice_in_one_round_refused() {
        let session = session();
        let (a, _ra) = seat(&session, "a").await;
        let (_b, _rb) = seat(&session, "b").await;
        let round = session.arm_round().await;
        assert_eq!(session.pay_entry_fee(round, a).await, Ok(Money::from_units(8)));
        assert_eq!(
            session.pay_entry_fee(round, a).await,
            Err(GameError::DecisionNotExpected { id: a, round })
        );
        assert_eq!(session.pot().await, Money::from_units(6));
    }

    #[tokio::test]
    async fn test_advance_notice_skips_payer() {
        let session = session();
        let (a, mut ra) = seat(&session, "a").await;
        let (_b, mut rb) = seat(&session, "b").await;
        ra.drain();
        rb.drain();
        let round = session.arm_round().await;
        session.pay_entry_fee(round, a).await.unwrap();
        assert!(ra.drain().is_empty());
        assert_eq!(
            rb.drain(),
            vec![ServerMessage::Notice(HostNotice::Advanced(Username::new("a")))]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_fees_add_up() {
        let session = Arc::new(session());
        let mut remotes = Vec::new();
        let mut ids = Vec::new();
        for i in 0..8 {
            let (id, remote) = seat(&session, &format!("p{i}")).await;
            ids.push(id);
            remotes.push(remote);
        }
        let before = session.pot().await;

        let mut payments = 0u64;
        for _ in 0..6 {
            let round = session.arm_round().await;
            let mut tasks = Vec::new();
            for id in ids.iter().copied() {
                let session = session.clone();
                tasks.push(tokio::spawn(async move {
                    session.pay_entry_fee(round, id).await.is_ok()
                }));
            }
            for task in tasks {
                if task.await.unwrap() {
                    payments += 1;
                }
            }
            assert!(session.barrier().snapshot().closed);
        }

        // 10 units each at 2 per round.
        assert_eq!(payments, 8 * 5);
        assert_eq!(
            session.pot().await,
            before + Money::from_cents(payments * Money::from_units(2).cents())
        );
    }

    #[tokio::test]
    async fn test_fold_refused_with_two_left() {
        let session = session();
        let (a, _ra) = seat(&session, "a").await;
        let (_b, mut rb) = seat(&session, "b").await;
        let (c, _rc) = seat(&session, "c").await;
        rb.drain();

        let folded = session.try_fold(c).await.unwrap();
        assert_eq!(folded.name.as_str(), "c");
        assert_eq!(
            rb.drain(),
            vec![ServerMessage::Notice(HostNotice::Folded(Username::new("c")))]
        );

        assert_eq!(
            session.try_fold(a).await,
            Err(GameError::FoldNotAllowed { active: 2 })
        );
        assert_eq!(session.active_count().await, 2);
        assert_eq!(
            session.try_fold(c).await,
            Err(GameError::UnknownParticipant(c))
        );
    }

    #[tokio::test]
    async fn test_removal_closes_channel() {
        let session = session();
        let (a, mut remote) = seat(&session, "a").await;
        remote.drain();
        session.remove(a, Departure::Eliminated).await.unwrap();
        assert_eq!(
            remote.recv().await,
            Some(ServerMessage::Notice(HostNotice::Eliminated(Username::new("a"))))
        );
        assert_eq!(
            remote.recv().await,
            Some(ServerMessage::Notice(HostNotice::ClosingConnection))
        );
        assert_eq!(remote.recv().await, None);
        assert!(session.remove(a, Departure::Eliminated).await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_withdraws_from_round() {
        let session = session();
        let (a, _ra) = seat(&session, "a").await;
        let (b, _rb) = seat(&session, "b").await;
        let (c, _rc) = seat(&session, "c").await;
        let (d, _rd) = seat(&session, "d").await;
        let round = session.arm_round().await;
        for id in [a, b, c] {
            session
                .barrier()
                .record(round, id, barrier::Recorded::Paid)
                .unwrap();
        }
        assert!(!session.barrier().snapshot().closed);
        session.remove(d, Departure::Disconnected).await;
        assert!(session.barrier().snapshot().closed);
    }

    #[tokio::test]
    async fn test_shortfall_with_solvent_table_eliminates() {
        let session = session();
        let (a, _ra) = seat(&session, "a").await;
        let (_b, _rb) = seat(&session, "b").await;
        let (_c, _rc) = seat(&session, "c").await;
        pay_until_short(&session, a).await;

        assert_eq!(session.settle_shortfall(a).await, Settlement::Eliminated);
        assert_eq!(session.active_count().await, 2);
        assert!(!session.is_bankrupt().await);
    }

    #[tokio::test]
    async fn test_shortfall_with_broke_table_flags_bankruptcy() {
        let session = session();
        let mut ids = Vec::new();
        let mut remotes = Vec::new();
        for name in ["a", "b", "c"] {
            let (id, remote) = seat(&session, name).await;
            ids.push(id);
            remotes.push(remote);
        }
        for id in &ids {
            pay_until_short(&session, *id).await;
        }
        assert_eq!(session.settle_shortfall(ids[0]).await, Settlement::Bankruptcy);
        assert!(session.is_bankrupt().await);
        assert_eq!(session.active_count().await, 3);
    }

    #[tokio::test]
    async fn test_deal_gives_everyone_distinct_cards() {
        let session = session();
        let mut remotes = Vec::new();
        for i in 0..17 {
            remotes.push(seat(&session, &format!("p{i}")).await.1);
        }
        let mut deck = Deck::default();
        deck.shuffle();
        session.deal(&mut deck).await;

        let mut seen = std::collections::HashSet::new();
        for view in session.views().await {
            let hand = view.hand.unwrap();
            for card in hand.cards() {
                assert!(seen.insert(*card));
            }
        }
        assert_eq!(seen.len(), 51);
    }

    #[tokio::test]
    async fn test_close_all_finishes_barrier() {
        let session = session();
        let (_a, mut remote) = seat(&session, "a").await;
        remote.drain();
        let remaining = session.close_all().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(
            remote.recv().await,
            Some(ServerMessage::Notice(HostNotice::ClosingConnection))
        );
        assert_eq!(remote.recv().await, None);
        assert!(session.barrier().snapshot().finished);
    }
}
