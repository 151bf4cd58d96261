use std::{collections::BTreeMap, sync::{Arc, Mutex, MutexGuard, PoisonError}};

use msgs::ParticipantId;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ParticipantRecord {
    pub id: ParticipantId,
    pub display_name: String,
    pub score: u32,
    #[serde(skip)]
    pub acked: bool,
    pub connected: bool,
}

/// Everything the coordinator and the connection handlers share.
#[derive(Debug, Default)]
pub struct RoundState {
    current_word: Option<String>,
    winner: Option<ParticipantId>,
    participants: BTreeMap<ParticipantId, ParticipantRecord>,
}

impl RoundState {
    pub fn register(&mut self, id: ParticipantId, display_name: String) {
        self.participants.insert(id, ParticipantRecord {
            id,
            display_name,
            score: 0,
            acked: false,
            connected: true,
        });
    }

    pub fn set_current_word(&mut self, word: String) {
        self.current_word = Some(word);
    }

    pub fn current_word(&self) -> Option<&str> {
        self.current_word.as_deref()
    }

    fn live_mut(&mut self, id: ParticipantId) -> Option<&mut ParticipantRecord> {
        self.participants.get_mut(&id).filter(|participant| participant.connected)
    }

    /// Scores of disconnected participants are frozen.
    pub fn increment_score(&mut self, id: ParticipantId) -> bool {
        let Some(participant) = self.live_mut(id) else { return false };
        participant.score += 1;
        true
    }

    pub fn set_ack(&mut self, id: ParticipantId) {
        if let Some(participant) = self.live_mut(id) {
            participant.acked = true;
        }
    }

    pub fn clear_acks(&mut self) {
        for participant in self.participants.values_mut() {
            participant.acked = false;
        }
    }

    pub fn all_acked(&self, ids: &[ParticipantId]) -> bool {
        ids.iter().all(|id| self.participants.get(id).is_some_and(|participant| participant.acked))
    }

    /// First writer wins. Later claims return false and change nothing.
    pub fn declare_winner(&mut self, id: ParticipantId) -> bool {
        if self.winner.is_some() || self.live_mut(id).is_none() {
            return false;
        }
        self.winner = Some(id);
        true
    }

    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner
    }

    pub fn disconnect(&mut self, id: ParticipantId) {
        if let Some(participant) = self.participants.get_mut(&id) {
            participant.connected = false;
            participant.acked = false;
        }
    }

    pub fn live_participants(&self) -> Vec<ParticipantId> {
        self.participants.values().filter(|participant| participant.connected).map(|participant| participant.id).collect()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&ParticipantRecord> {
        self.participants.get(&id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &ParticipantRecord> {
        self.participants.values()
    }
}

/// Lock-guarded handle to the round state.
///
/// Every call takes the lock for the duration of one in-memory update. The
/// guard is never handed out, so it cannot be held across an await.
#[derive(Debug, Clone, Default)]
pub struct SharedRoundState {
    inner: Arc<Mutex<RoundState>>,
}

impl SharedRoundState {
    pub fn new() -> SharedRoundState {
        SharedRoundState::default()
    }

    fn lock(&self) -> MutexGuard<'_, RoundState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs several updates under one acquisition.
    pub fn update<T>(&self, f: impl FnOnce(&mut RoundState) -> T) -> T {
        f(&mut self.lock())
    }

    pub fn register(&self, id: ParticipantId, display_name: String) {
        self.lock().register(id, display_name)
    }

    pub fn set_current_word(&self, word: String) {
        self.lock().set_current_word(word)
    }

    pub fn current_word(&self) -> Option<String> {
        self.lock().current_word().map(str::to_owned)
    }

    pub fn increment_score(&self, id: ParticipantId) -> bool {
        self.lock().increment_score(id)
    }

    pub fn set_ack(&self, id: ParticipantId) {
        self.lock().set_ack(id)
    }

    pub fn clear_acks(&self) {
        self.lock().clear_acks()
    }

    pub fn all_acked(&self, ids: &[ParticipantId]) -> bool {
        self.lock().all_acked(ids)
    }

    pub fn declare_winner(&self, id: ParticipantId) -> bool {
        self.lock().declare_winner(id)
    }

    pub fn winner(&self) -> Option<ParticipantId> {
        self.lock().winner()
    }

    pub fn disconnect(&self, id: ParticipantId) {
        self.lock().disconnect(id)
    }

    pub fn live_participants(&self) -> Vec<ParticipantId> {
        self.lock().live_participants()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<ParticipantRecord> {
        self.lock().participant(id).cloned()
    }

    pub fn snapshot(&self) -> Vec<ParticipantRecord> {
        self.lock().participants().cloned().collect()
    }
}
