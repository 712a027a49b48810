//! Ordered registry of active participants.
//!
//! Participants live in an arena keyed by their stable id; iteration order
//! is kept separately as a list of ids. New joiners go to the front.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
};

use super::errors::{GameError, GameResult};
use crate::{
    game::entities::{Hand, Money, Username},
    net::{connection::Outbox, messages::ServerMessage},
};

/// Stable participant identity, assigned at join time and never reused.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A seated participant.
#[derive(Debug)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: Username,
    pub balance: Money,
    pub hand: Option<Hand>,
    outbox: Outbox,
}

impl Participant {
    pub fn new(id: ParticipantId, name: Username, balance: Money, outbox: Outbox) -> Self {
        Self {
            id,
            name,
            balance,
            hand: None,
            outbox,
        }
    }

    /// Queue a message for the participant. A closed channel is ignored; the
    /// handler notices the disconnect on its next read.
    pub fn send(&self, msg: impl Into<ServerMessage>) {
        let _ = self.outbox.send(msg.into());
    }
}

/// Read-only copy of a participant's public state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub name: Username,
    pub balance: Money,
    pub hand: Option<Hand>,
}

impl From<&Participant> for ParticipantView {
    fn from(value: &Participant) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            balance: value.balance,
            hand: value.hand,
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    participants: HashMap<ParticipantId, Participant>,
    order: VecDeque<ParticipantId>,
    joined: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for the next joiner: one more than the number of joins so far, so
    /// ids stay unique even after removals.
    pub fn next_id(&self) -> ParticipantId {
        ParticipantId(self.joined + 1)
    }

    /// Insert at the head of the iteration order.
    pub fn add(&mut self, participant: Participant) -> GameResult<()> {
        let id = participant.id;
        if self.participants.contains_key(&id) {
            return Err(GameError::DuplicateParticipant(id));
        }
        self.participants.insert(id, participant);
        self.order.push_front(id);
        self.joined = self.joined.max(id.0);
        Ok(())
    }

    /// Unlink a participant. Removing an absent id does nothing.
    pub fn remove_by_id(&mut self, id: ParticipantId) -> Option<Participant> {
        let removed = self.participants.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(removed)
    }

    pub fn find_by_id(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn find_by_id_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.get_mut(&id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    pub fn count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Participants in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.order
            .iter()
            .filter_map(|id| self.participants.get(id))
    }

    /// Snapshot of the ids in iteration order.
    pub fn ids(&self) -> Vec<ParticipantId> {
        self.order.iter().copied().collect()
    }

    pub fn views(&self) -> Vec<ParticipantView> {
        self.iter().map(ParticipantView::from).collect()
    }

    /// Send a message to everyone except `skip`.
    pub fn broadcast(&self, msg: &ServerMessage, skip: Option<ParticipantId>) {
        for participant in self.iter().filter(|p| Some(p.id) != skip) {
            participant.send(msg.clone());
        }
    }
}
