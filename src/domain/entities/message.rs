use super::User;

/// Message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    /// `name` and `args` come from the first line, `body` holds the
    /// remaining non-blank lines (poll options, vote numbers).
    Command {
        name: String,
        args: Vec<String>,
        body: Vec<String>,
    },
    Empty,
}

impl Content {
    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Content::Command { .. })
    }
}

/// An incoming chat message
#[derive(Debug, Clone)]
pub struct Message {
    /// Transport message ID, used to thread replies
    pub id: String,
    /// Channel (chat) the message was posted in
    pub chat_id: String,
    pub sender: Option<User>,
    pub content: Content,
    pub platform: String,
}

impl Message {
    pub fn new(chat_id: impl Into<String>, content: Content) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            sender: None,
            content,
            platform: "unknown".to_string(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_sender_opt(mut self, user: Option<User>) -> Self {
        if let Some(u) = user {
            self.sender = Some(u);
        }
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.sender.as_ref().map(|u| u.id.as_str())
    }
}

/// Text the bot sends back in response to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat_id: String,
    pub text: String,
    /// Message to thread the reply under; `None` posts to the channel
    pub reply_to: Option<String>,
}

impl Reply {
    /// Post to the channel of `message`.
    pub fn to_channel(message: &Message, text: impl Into<String>) -> Self {
        Self {
            chat_id: message.chat_id.clone(),
            text: text.into(),
            reply_to: None,
        }
    }

    /// Answer `message` directly.
    pub fn to_sender(message: &Message, text: impl Into<String>) -> Self {
        Self {
            chat_id: message.chat_id.clone(),
            text: text.into(),
            reply_to: Some(message.id.clone()),
        }
    }
}
