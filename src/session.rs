use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::ConversationTurn;

/// Per-session chat history held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Vec<ConversationTurn>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `id` if it names a live session, otherwise open a new one.
    pub fn resolve(&self, id: Option<Uuid>) -> Uuid {
        if let Some(id) = id {
            if self.sessions.read().contains_key(&id) {
                return id;
            }
        }
        let id = Uuid::new_v4();
        self.sessions.write().insert(id, Vec::new());
        id
    }

    /// Snapshot of a session's turns, oldest first.
    pub fn history(&self, id: Uuid) -> Vec<ConversationTurn> {
        self.sessions.read().get(&id).cloned().unwrap_or_default()
    }

    /// Append one user turn and the bot's reply together.
    pub fn record_exchange(&self, id: Uuid, user: ConversationTurn, bot: ConversationTurn) {
        let mut sessions = self.sessions.write();
        let turns = sessions.entry(id).or_default();
        turns.push(user);
        turns.push(bot);
    }

    /// Drop all turns of a session. Returns false if the session was unknown.
    pub fn clear(&self, id: Uuid) -> bool {
        match self.sessions.write().get_mut(&id) {
            Some(turns) => {
                turns.clear();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
