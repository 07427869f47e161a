//! Action Normalizer - Raw change records to uniform Actions
//!
//! Only chat and comment documents written by the human player become
//! Actions. Everything else is dropped without an error.

use std::collections::BTreeSet;

use grader_domain::{Action, Participant, ParticipantKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::EngineError;

const CHATS: &str = "chats";
const COMMENTS: &str = "comments";
/// Joins the two participant names of a direct chat id
const CHAT_ID_SEPARATOR: char = '-';
const MENTION_PATTERN: &str = r"@([A-Za-z0-9_.\-]+)";

/// Document identifier, either plain or extended-JSON `{"$oid": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Plain(String),
    Oid {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

impl DocumentId {
    pub fn as_str(&self) -> &str {
        match self {
            DocumentId::Plain(id) => id,
            DocumentId::Oid { oid } => oid,
        }
    }
}

/// One change notification from the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// insert, update, replace or delete
    pub op: String,
    #[serde(alias = "coll")]
    pub collection: String,
    #[serde(alias = "doc", default)]
    pub document: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatMessage {
    #[serde(rename = "_id")]
    id: Option<DocumentId>,
    message_type: String,
    messenger: Option<DocumentId>,
    /// Sender username when the store denormalizes it
    username: Option<String>,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatDocument {
    chat_id: String,
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentDocument {
    #[serde(rename = "_id")]
    id: Option<DocumentId>,
    comment_type: String,
    commentor: Option<DocumentId>,
    username: Option<String>,
    post: Option<DocumentId>,
    #[serde(default)]
    body: String,
}

enum Op {
    Insert,
    Update,
}

impl Op {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "insert" => Some(Op::Insert),
            "update" | "replace" => Some(Op::Update),
            _ => None,
        }
    }
}

/// Turns change records into Actions
#[derive(Debug, Clone)]
pub struct ActionNormalizer {
    mention: Regex,
    /// Usernames of simulated agents, used to pick a direct-chat target
    known_agents: BTreeSet<String>,
}

impl ActionNormalizer {
    pub fn new(known_agents: impl IntoIterator<Item = String>) -> Result<Self, EngineError> {
        let mention = Regex::new(MENTION_PATTERN)
            .map_err(|e| EngineError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            mention,
            known_agents: known_agents.into_iter().collect(),
        })
    }

    /// Usernames mentioned with `@name`, in order, without repeats
    pub fn mentions(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for capture in self.mention.captures_iter(text) {
            let name = capture[1].trim_end_matches('.').to_string();
            if !name.is_empty() && !found.contains(&name) {
                found.push(name);
            }
        }
        found
    }

    /// Normalize a batch, keeping source order
    pub fn normalize(&self, records: &[ChangeRecord]) -> Vec<Action> {
        records
            .iter()
            .flat_map(|record| self.normalize_one(record))
            .collect()
    }

    pub fn normalize_one(&self, record: &ChangeRecord) -> Vec<Action> {
        let Some(op) = Op::parse(&record.op) else {
            return Vec::new();
        };
        match record.collection.as_str() {
            CHATS => self.chat_actions(op, &record.document),
            COMMENTS => self.comment_action(&record.document).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn chat_actions(&self, op: Op, document: &serde_json::Value) -> Vec<Action> {
        let chat: ChatDocument = match serde_json::from_value(document.clone()) {
            Ok(chat) => chat,
            Err(err) => {
                debug!(error = %err, "Skipping malformed chat document");
                return Vec::new();
            }
        };

        // An update appends one message; only that one is new
        let messages: &[ChatMessage] = match op {
            Op::Insert => &chat.messages,
            Op::Update => match chat.messages.split_last() {
                Some((last, _)) => std::slice::from_ref(last),
                None => &[],
            },
        };

        let participants: Vec<&str> = chat.chat_id.split(CHAT_ID_SEPARATOR).collect();
        let direct = participants.len() == 2;

        messages
            .iter()
            .filter_map(|message| {
                let author = participant(
                    &message.message_type,
                    message.messenger.as_ref(),
                    message.username.as_deref(),
                )?;
                if !author.is_human() {
                    return None;
                }
                let target = if direct {
                    self.direct_target(&participants, author.username.as_deref())
                } else {
                    None
                };
                let id = message
                    .id
                    .as_ref()
                    .map(|id| id.as_str().to_string())
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let mentioned = self.mentions(&message.body);
                Some(
                    Action::chat(id, message.body.clone(), author, chat.chat_id.clone(), target, direct)
                        .with_mentions(mentioned),
                )
            })
            .collect()
    }

    fn comment_action(&self, document: &serde_json::Value) -> Option<Action> {
        let comment: CommentDocument = match serde_json::from_value(document.clone()) {
            Ok(comment) => comment,
            Err(err) => {
                debug!(error = %err, "Skipping malformed comment document");
                return None;
            }
        };
        let author = participant(
            &comment.comment_type,
            comment.commentor.as_ref(),
            comment.username.as_deref(),
        )?;
        if !author.is_human() {
            return None;
        }

        let id = comment
            .id
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mentioned = self.mentions(&comment.body);
        let mut action = Action::comment(id, comment.body, author).with_mentions(mentioned);
        if let Some(post) = comment.post {
            action = action.with_post(post.as_str());
        }
        Some(action)
    }

    /// The participant that is not the sender, else the known agent
    fn direct_target(&self, participants: &[&str], sender: Option<&str>) -> Option<String> {
        if let Some(sender) = sender {
            if let Some(other) = participants.iter().find(|p| **p != sender) {
                return Some((*other).to_string());
            }
        }
        participants
            .iter()
            .find(|p| self.known_agents.contains(**p))
            .map(|p| (*p).to_string())
    }
}

fn participant(kind: &str, id: Option<&DocumentId>, username: Option<&str>) -> Option<Participant> {
    let kind = ParticipantKind::parse(kind)?;
    Some(Participant {
        kind,
        id: id.map(|id| id.as_str().to_string()),
        username: username.map(str::to_string),
    })
}
