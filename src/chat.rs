//! Retrieval-augmented chat over the knowledge index.
//!
//! A turn embeds the question, pulls the nearest knowledge points as
//! context, and asks the generative model to answer from that context only.
//! Each question is also stored as a memory point, which retrieval never
//! returns.

use crate::embeddings::BoxedProvider;
use crate::error::{Error, Result};
use crate::genai::GenerativeModel;
use crate::model::{ChatMessage, BOT_AUTHOR};
use crate::storage::{lock, SharedStorage};
use crate::vector::{ensure_collection, Filter, Payload, Point, ScoredPoint, VectorIndex};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Most knowledge points used as context for one answer.
pub const RETRIEVAL_LIMIT: usize = 20;

/// Room used when none is given.
pub const DEFAULT_ROOM: &str = "geral";

pub const SYSTEM_INSTRUCTION: &str = concat!(
    "Você é um assistente (chatbot) da página Green Trail. ",
    "Responda o usuário utilizando apenas as informações dadas no contexto abaixo. ",
    "Se essa informação não está no contexto, diga 'Não tenho essa informação.'"
);

/// Join retrieved contents, one per line.
#[must_use]
pub fn build_context(hits: &[ScoredPoint]) -> String {
    hits.iter().fold(String::new(), |mut context, hit| {
        context.push_str(&hit.payload.content);
        context.push('\n');
        context
    })
}

#[must_use]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!("{SYSTEM_INSTRUCTION}\nContexto:\n{context}\n\nMensagem do usuário: {question}")
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub room: String,
    pub question: String,
    pub answer: String,
    /// Knowledge points used as context.
    pub context_points: usize,
    /// Id of the memory point stored for the question.
    pub memory_id: Uuid,
}

pub struct ChatService {
    store: SharedStorage,
    embedder: Arc<BoxedProvider>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn GenerativeModel>,
    collection: String,
    dimensions: usize,
}

impl ChatService {
    #[must_use]
    pub fn new(
        store: SharedStorage,
        embedder: Arc<BoxedProvider>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn GenerativeModel>,
        collection: &str,
        dimensions: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            index,
            generator,
            collection: collection.to_string(),
            dimensions,
        }
    }

    /// Answer `question` from `user` in `room`.
    ///
    /// The question is saved before anything else, so it stays in the room
    /// history even when answering fails.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a blank question, or the error of the
    /// failing embedding, index or generation call.
    pub async fn answer(&self, room: &str, user: &str, question: &str) -> Result<ChatReply> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidArgument("message is empty".into()));
        }
        let room_id = self.save_message(room, user, question)?;

        ensure_collection(self.index.as_ref(), &self.collection, self.dimensions).await?;
        let vector = self.embedder.generate_embedding(question).await?;

        let filter = Filter::knowledge_only();
        let hits = self
            .index
            .query(&self.collection, &vector, Some(&filter), RETRIEVAL_LIMIT)
            .await?;
        debug!(room, hits = hits.len(), "Retrieved context");

        let prompt = build_prompt(&build_context(&hits), question);
        let answer = self.generator.generate(&prompt).await?;

        let memory_id = Uuid::new_v4();
        let memory = Point {
            id: memory_id,
            vector,
            payload: Payload::memory(question),
        };
        self.index.upsert(&self.collection, vec![memory]).await?;

        lock(&self.store)?.add_message(room_id, BOT_AUTHOR, &answer)?;
        info!(room, context_points = hits.len(), "Answered chat message");

        Ok(ChatReply {
            room: room.to_string(),
            question: question.to_string(),
            answer,
            context_points: hits.len(),
            memory_id,
        })
    }

    fn save_message(&self, room: &str, user: &str, content: &str) -> Result<i64> {
        let mut store = lock(&self.store)?;
        let room = store.ensure_room(room)?;
        store.add_message(room.id, user, content)?;
        Ok(room.id)
    }

    /// The last `limit` messages of a room, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn history(&self, room: &str, limit: Option<usize>) -> Result<Vec<ChatMessage>> {
        lock(&self.store)?.list_messages(room, limit)
    }
}
