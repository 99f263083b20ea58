//! Ordered, append-only conversation log.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::types::ConversationTurn;

/// Storage for an agent's conversation turns.
///
/// Turns are only ever appended; `get` returns a snapshot that later appends
/// do not affect.
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    async fn append(&self, turn: ConversationTurn);

    async fn get(&self) -> Vec<ConversationTurn>;
}

/// Process-local memory backed by a vector.
#[derive(Debug, Default)]
pub struct InMemoryConversation {
    turns: Mutex<Vec<ConversationTurn>>,
}

impl InMemoryConversation {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationMemory for InMemoryConversation {
    async fn append(&self, turn: ConversationTurn) {
        self.turns.lock().await.push(turn);
    }

    async fn get(&self) -> Vec<ConversationTurn> {
        self.turns.lock().await.clone()
    }
}
