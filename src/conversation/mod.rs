//! Conversation model and patient-utterance extraction
//!
//! Conversations arrive from an external document store as JSON. Messages are
//! either fully populated or bare reference ids; `MessageEntry` is a serde
//! untagged enum so the deserializer decides which form it has by role+content
//! presence. Reference ids are resolved in one batch through an injected
//! [`MessageResolver`]. Entries that fit neither form are filtered, never
//! failing the batch.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

/// Speaker role on a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

/// A fully populated transcript message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: None,
        }
    }

    pub fn patient(content: impl Into<String>) -> Self {
        Self::new(Role::Patient, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// A message reference awaiting batch resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

/// One entry in a conversation's message list.
///
/// Untagged: an object with role+content deserializes as `Inline`, an object
/// with only an id as `Reference`, anything else as `Malformed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageEntry {
    Inline(Message),
    Reference(MessageRef),
    Malformed(serde_json::Value),
}

/// A conversation as delivered by the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(default)]
    pub messages: Vec<MessageEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn inline(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into_iter().map(MessageEntry::Inline).collect(),
            created_at: None,
        }
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// A conversation with every surviving message fully populated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConversation {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ResolvedConversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            created_at: None,
        }
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Patient messages in order
    pub fn patient_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role == Role::Patient)
    }
}

/// Batch lookup for referenced messages, injected by the caller
#[async_trait]
pub trait MessageResolver: Send + Sync {
    /// Fetch the given message ids in one round trip, keyed by id.
    /// Ids absent from the result are treated as unresolvable and filtered.
    async fn fetch_messages(&self, ids: &[String]) -> EngineResult<HashMap<String, Message>>;
}

/// Resolve a batch of conversations, replacing references with fetched
/// messages and filtering malformed or unresolvable entries.
pub async fn resolve_conversations(
    conversations: &[Conversation],
    resolver: Option<&dyn MessageResolver>,
) -> EngineResult<Vec<ResolvedConversation>> {
    let ids: Vec<String> = conversations
        .iter()
        .flat_map(|c| c.messages.iter())
        .filter_map(|e| match e {
            MessageEntry::Reference(r) => Some(r.id.clone()),
            _ => None,
        })
        .collect();

    let fetched = if ids.is_empty() {
        HashMap::new()
    } else {
        match resolver {
            Some(resolver) => resolver.fetch_messages(&ids).await?,
            None => {
                return Err(EngineError::Resolution {
                    message: format!("{} message references but no resolver supplied", ids.len()),
                })
            }
        }
    };

    let mut resolved = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let mut messages = Vec::with_capacity(conversation.messages.len());
        for entry in &conversation.messages {
            match entry {
                MessageEntry::Inline(message) => messages.push(message.clone()),
                MessageEntry::Reference(r) => match fetched.get(&r.id) {
                    Some(message) => messages.push(message.clone()),
                    None => debug!(id = %r.id, "message reference unresolvable, skipping"),
                },
                MessageEntry::Malformed(value) => {
                    warn!(entry = %value, "malformed message entry, skipping");
                }
            }
        }
        resolved.push(ResolvedConversation {
            messages,
            created_at: conversation.created_at,
        });
    }
    Ok(resolved)
}

/// All patient messages across a batch, in conversation order
pub fn patient_messages(conversations: &[ResolvedConversation]) -> Vec<&Message> {
    conversations
        .iter()
        .flat_map(|c| c.patient_messages())
        .collect()
}

/// Patient utterances joined into one text blob
pub fn combined_patient_text(conversations: &[ResolvedConversation]) -> String {
    patient_messages(conversations)
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
