//! The most recently summarized document and the conversation about it.

use serde::Serialize;
use std::collections::VecDeque;

/// Speaker of a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Question asked by the client.
    User,
    /// Answer produced by the QA model.
    Assistant,
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Who produced the entry.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a user entry.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Build an assistant entry.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Document, summary, and bounded chat history for the current session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    document_text: String,
    last_summary: String,
    chat_history: VecDeque<ChatMessage>,
    history_limit: usize,
}

impl SessionContext {
    /// Create an empty session retaining at most `history_limit` chat entries.
    pub fn new(history_limit: usize) -> Self {
        Self {
            document_text: String::new(),
            last_summary: String::new(),
            chat_history: VecDeque::with_capacity(history_limit),
            history_limit,
        }
    }

    /// Install a freshly summarized document. The previous conversation is discarded.
    pub fn replace_document(&mut self, document_text: String, summary: String) {
        self.document_text = document_text;
        self.last_summary = summary;
        self.chat_history.clear();
    }

    /// Text QA should ground on: the document itself, or its summary when the text is missing.
    pub fn grounding_text(&self) -> Option<&str> {
        [self.document_text.as_str(), self.last_summary.as_str()]
            .into_iter()
            .find(|text| !text.trim().is_empty())
    }

    /// Append a question/answer pair, evicting the oldest entries beyond the limit.
    pub fn record_turn(&mut self, question: String, answer: String) {
        self.push(ChatMessage::user(question));
        self.push(ChatMessage::assistant(answer));
    }

    fn push(&mut self, message: ChatMessage) {
        if self.history_limit == 0 {
            return;
        }
        while self.chat_history.len() >= self.history_limit {
            self.chat_history.pop_front();
        }
        self.chat_history.push_back(message);
    }

    /// Conversation in chronological order.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.chat_history.iter().cloned().collect()
    }

    /// The most recent `count` entries in chronological order.
    pub fn recent_history(&self, count: usize) -> Vec<ChatMessage> {
        let skip = self.chat_history.len().saturating_sub(count);
        self.chat_history.iter().skip(skip).cloned().collect()
    }

    /// Drop the conversation, keeping the document.
    pub fn clear_chat(&mut self) {
        self.chat_history.clear();
    }
}
