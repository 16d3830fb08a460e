use serde::{Deserialize, Serialize};

use crate::models::{ChatId, Message};

/// Frames sent over `/ws` from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A message was persisted in a chat the client has joined.
    NewMessage { message: Message },
}

impl ServerEvent {
    /// The room this event belongs to.
    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::NewMessage { message } => message.chat_id,
        }
    }
}

/// Frames sent over `/ws` from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Start receiving `new_message` events for a chat.
    JoinChat {
        #[serde(rename = "chatId", deserialize_with = "chat_id_lenient")]
        chat_id: ChatId,
    },

    /// Stop receiving events for a chat without closing the socket.
    LeaveChat {
        #[serde(rename = "chatId", deserialize_with = "chat_id_lenient")]
        chat_id: ChatId,
    },
}

/// Browsers send the id either as a number or as the string from a URL segment.
fn chat_id_lenient<'de, D>(de: D) -> Result<ChatId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(ChatId),
        Text(String),
    }

    match Raw::deserialize(de)? {
        Raw::Num(id) => Ok(id),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
