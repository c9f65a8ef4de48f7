//! Telegram adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::errors::BotError;
use crate::application::messaging::MessageParser;
use crate::domain::entities::{self, COMMANDS};
use crate::domain::traits::{Bot, BotInfo};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope every Bot API method answers with
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T, BotError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(BotError::Network(format!(
                "{} failed: {}",
                method,
                self.description.unwrap_or_else(|| "no result".to_string())
            ))),
        }
    }
}

/// Telegram bot adapter
pub struct TelegramAdapter {
    token: String,
    client: Client,
    info: BotInfo,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            info: BotInfo {
                id: "unknown".to_string(),
                name: "vote-bot".to_string(),
                username: "vote_bot".to_string(),
            },
        }
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    async fn call<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp, BotError>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = self.client
            .post(self.api_url(method))
            .json(request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(BotError::Network(format!("Telegram API error {}: {}", status, error)));
        }

        let data: ApiResponse<Resp> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        data.into_result(method)
    }

    /// Fetch bot info from Telegram API
    pub async fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        #[derive(Deserialize)]
        struct BotInfoResponse {
            id: i64,
            first_name: String,
            username: String,
        }

        let me: BotInfoResponse = self.call("getMe", &serde_json::json!({})).await?;

        self.info = BotInfo {
            id: me.id.to_string(),
            name: me.first_name,
            username: me.username,
        };

        Ok(())
    }

    /// Long-poll for updates using getUpdates API
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: u64,
            allowed_updates: Vec<String>,
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message".to_string()],
        };

        self.call("getUpdates", &request).await
    }

    /// Get the next update offset
    pub fn get_next_offset(updates: &[Update]) -> Option<i64> {
        updates.iter()
            .map(|u| u.update_id + 1)
            .max()
    }

    /// Convert an update into a chat message.
    ///
    /// Updates without text and messages sent by bots are skipped.
    pub fn to_message(parser: &MessageParser, update: &Update) -> Option<entities::Message> {
        let msg = update.message.as_ref()?;
        let text = msg.text.as_deref()?;
        let from = msg.from.as_ref()?;
        if from.is_bot {
            return None;
        }

        let mut sender = entities::User::new(from.id.to_string());
        if let Some(username) = &from.username {
            sender = sender.with_username(username);
        }
        if let Some(first_name) = &from.first_name {
            sender = sender.with_first_name(first_name);
        }

        let message = parser
            .parse(msg.chat.id.to_string(), text, Some(sender))
            .with_id(msg.message_id.to_string())
            .with_platform("telegram");
        Some(message)
    }

    /// Register the poll commands with Telegram
    pub async fn register_commands(&self) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct Command {
            command: String,
            description: String,
        }

        #[derive(Serialize)]
        struct SetMyCommandsRequest {
            commands: Vec<Command>,
        }

        let commands = COMMANDS
            .iter()
            .map(|cmd| Command {
                command: cmd.name.to_string(),
                description: cmd.description.to_string(),
            })
            .collect();

        let _: bool = self.call("setMyCommands", &SetMyCommandsRequest { commands }).await?;

        tracing::info!(count = COMMANDS.len(), "Registered bot commands with Telegram");
        Ok(())
    }
}

/// First eight characters of the token, safe on any UTF-8 input
fn token_preview(token: &str) -> String {
    token.chars().take(8).collect()
}

#[async_trait]
impl Bot for TelegramAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!("Starting Telegram bot (token: {}...)", token_preview(&self.token));
        Ok(())
    }

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: &'a str,
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_to_message_id: Option<i64>,
        }

        #[derive(Deserialize)]
        struct MessageResult {
            message_id: i64,
        }

        tracing::debug!(chat_id, reply_to, "Sending message");

        let request = SendMessageRequest {
            chat_id,
            text,
            reply_to_message_id: reply_to.and_then(|id| id.parse().ok()),
        };

        let sent: MessageResult = self.call("sendMessage", &request).await?;
        Ok(sent.message_id.to_string())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Content;

    fn update(json: &str) -> Update {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_update_becomes_message() {
        let update = update(
            r#"{"update_id": 10, "message": {"message_id": 77,
                "from": {"id": 5, "is_bot": false, "username": "bob"},
                "chat": {"id": -100}, "text": "/vote@vote_bot 3\n1 2"}}"#,
        );
        let msg = TelegramAdapter::to_message(&MessageParser::new("/"), &update).unwrap();

        assert_eq!(msg.id, "77");
        assert_eq!(msg.chat_id, "-100");
        assert_eq!(msg.sender_id(), Some("5"));
        assert_eq!(msg.platform, "telegram");
        assert_eq!(
            msg.content,
            Content::Command {
                name: "vote".to_string(),
                args: vec!["3".to_string()],
                body: vec!["1 2".to_string()],
            }
        );
    }

    #[test]
    fn test_bot_and_textless_updates_are_skipped() {
        let parser = MessageParser::new("/");
        let from_bot = update(
            r#"{"update_id": 1, "message": {"message_id": 1, "from": {"id": 9, "is_bot": true},
                "chat": {"id": 1}, "text": "/results 1"}}"#,
        );
        let sticker = update(
            r#"{"update_id": 2, "message": {"message_id": 2,
                "from": {"id": 5}, "chat": {"id": 1}}}"#,
        );
        let edited = update(r#"{"update_id": 3}"#);

        assert!(TelegramAdapter::to_message(&parser, &from_bot).is_none());
        assert!(TelegramAdapter::to_message(&parser, &sticker).is_none());
        assert!(TelegramAdapter::to_message(&parser, &edited).is_none());
    }

    #[test]
    fn test_token_preview_is_char_safe() {
        assert_eq!(token_preview("123456789:abc"), "12345678");
        assert_eq!(token_preview("12"), "12");
        assert_eq!(token_preview("ключ-бота-7"), "ключ-бот");
    }

    #[test]
    fn test_next_offset() {
        let updates = vec![update(r#"{"update_id": 4}"#), update(r#"{"update_id": 9}"#)];
        assert_eq!(TelegramAdapter::get_next_offset(&updates), Some(10));
        assert_eq!(TelegramAdapter::get_next_offset(&[]), None);
    }

    #[test]
    fn test_api_error_envelope() {
        let resp: ApiResponse<bool> =
            serde_json::from_str(r#"{"ok": false, "description": "Unauthorized"}"#).unwrap();
        let err = resp.into_result("getMe").unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
    }
}
