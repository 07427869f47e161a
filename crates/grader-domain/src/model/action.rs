//! Action - One human-authored comment or chat message
//!
//! Actions are ephemeral: built from change notifications, fed to the
//! classifier, then dropped. They are never persisted.

use super::agent::AgentId;
use super::attribute::Attribute;
use super::objective::TaskType;

/// Who authored a message, resolved once when the change is ingested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantKind {
    /// Scripted feed character
    Actor,
    /// Simulated agent
    Agent,
    /// The human player
    User,
    /// Built-in assistant
    ChatBot,
}

impl ParticipantKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Actor" => Some(ParticipantKind::Actor),
            "Agent" => Some(ParticipantKind::Agent),
            "User" => Some(ParticipantKind::User),
            "ChatBot" => Some(ParticipantKind::ChatBot),
            _ => None,
        }
    }
}

/// The author of a message or comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub kind: ParticipantKind,
    pub id: Option<String>,
    pub username: Option<String>,
}

impl Participant {
    pub fn new(kind: ParticipantKind) -> Self {
        Self {
            kind,
            id: None,
            username: None,
        }
    }

    pub fn is_human(&self) -> bool {
        self.kind == ParticipantKind::User
    }
}

/// Unique identifier for an Action (the underlying message/comment id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ActionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the action happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Comment under a feed post
    PublicComment,
    /// Message in a group chat
    Chat,
    /// Message in a 1:1 chat
    DirectChat,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::PublicComment => "public_comment",
            ActionKind::Chat => "chat",
            ActionKind::DirectChat => "direct_chat",
        }
    }

    /// Objective task type this kind of action can satisfy
    pub fn task_type(&self) -> TaskType {
        match self {
            ActionKind::PublicComment => TaskType::Comment,
            ActionKind::Chat | ActionKind::DirectChat => TaskType::Dm,
        }
    }
}

/// A normalized user action
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub id: ActionId,
    pub text: String,
    pub kind: ActionKind,
    pub author: Participant,
    pub chat_id: Option<String>,
    pub post_id: Option<String>,
    /// Inferred recipient of a direct chat
    pub target: Option<String>,
    /// Usernames from @mentions
    pub mentioned: Vec<String>,
}

impl Action {
    /// Create a public comment action
    pub fn comment(id: impl Into<String>, text: impl Into<String>, author: Participant) -> Self {
        Self {
            id: ActionId::new(id),
            text: text.into(),
            kind: ActionKind::PublicComment,
            author,
            chat_id: None,
            post_id: None,
            target: None,
            mentioned: Vec::new(),
        }
    }

    /// Create a chat action; two-party chats become direct chats
    pub fn chat(
        id: impl Into<String>,
        text: impl Into<String>,
        author: Participant,
        chat_id: impl Into<String>,
        target: Option<String>,
        direct: bool,
    ) -> Self {
        Self {
            id: ActionId::new(id),
            text: text.into(),
            kind: if direct {
                ActionKind::DirectChat
            } else {
                ActionKind::Chat
            },
            author,
            chat_id: Some(chat_id.into()),
            post_id: None,
            target,
            mentioned: Vec::new(),
        }
    }

    /// Builder: set the post a comment belongs to
    pub fn with_post(mut self, post_id: impl Into<String>) -> Self {
        self.post_id = Some(post_id.into());
        self
    }

    /// Builder: set mentions
    pub fn with_mentions(mut self, mentioned: Vec<String>) -> Self {
        self.mentioned = mentioned;
        self
    }

    /// Whether the action addresses `username` (direct target or mention)
    pub fn addresses(&self, username: &str) -> bool {
        self.target.as_deref() == Some(username) || self.mentioned.iter().any(|m| m == username)
    }
}

/// One classifier result: an action matched a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch {
    pub action_id: ActionId,
    pub category: String,
    /// Agent references (store id or username)
    pub affected_agents: Vec<String>,
}

impl CategoryMatch {
    pub fn new(
        action_id: ActionId,
        category: impl Into<String>,
        affected_agents: Vec<String>,
    ) -> Self {
        Self {
            action_id,
            category: category.into(),
            affected_agents,
        }
    }

    /// De-duplication key
    pub fn key(&self) -> (&ActionId, &str) {
        (&self.action_id, self.category.as_str())
    }
}

/// One raw attribute change caused by one action, before clamping
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub action_id: ActionId,
    pub category: String,
    pub agent: AgentId,
    pub attribute: Attribute,
    pub delta: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Participant {
        Participant {
            kind: ParticipantKind::User,
            id: Some("u-1".to_string()),
            username: Some("player".to_string()),
        }
    }

    #[test]
    fn test_task_type_mapping() {
        assert_eq!(ActionKind::PublicComment.task_type(), TaskType::Comment);
        assert_eq!(ActionKind::DirectChat.task_type(), TaskType::Dm);
        assert_eq!(ActionKind::Chat.task_type(), TaskType::Dm);
    }

    #[test]
    fn test_chat_constructor_kinds() {
        let direct = Action::chat("m1", "hi", user(), "bully1-player", Some("bully1".into()), true);
        let group = Action::chat("m2", "hi", user(), "group-x-y", None, false);

        assert_eq!(direct.kind, ActionKind::DirectChat);
        assert_eq!(group.kind, ActionKind::Chat);
    }

    #[test]
    fn test_addresses_target_or_mention() {
        let action = Action::comment("c1", "@victim1 you ok?", user())
            .with_mentions(vec!["victim1".to_string()]);

        assert!(action.addresses("victim1"));
        assert!(!action.addresses("bully1"));
    }

    #[test]
    fn test_only_users_are_human() {
        assert!(user().is_human());
        assert!(!Participant::new(ParticipantKind::Agent).is_human());
        assert_eq!(ParticipantKind::parse("ChatBot"), Some(ParticipantKind::ChatBot));
        assert_eq!(ParticipantKind::parse("Robot"), None);
    }
}
