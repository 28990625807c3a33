//! models/bot_model.rs
//! Respuestas de la Bot API (formato Telegram).

use serde::{Deserialize, Serialize};

/// Acuse genérico `{ ok, description?, result? }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotAck {
    pub ok: bool,
    pub description: Option<String>,
    pub error_code: Option<i64>,
    pub result: Option<serde_json::Value>,
}

impl BotAck {
    #[cfg(test)]
    pub fn success() -> Self {
        Self {
            ok: true,
            description: None,
            error_code: None,
            result: None,
        }
    }

    #[cfg(test)]
    pub fn rejected(description: &str) -> Self {
        Self {
            ok: false,
            description: Some(description.to_string()),
            error_code: None,
            result: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    pub can_join_groups: Option<bool>,
    pub can_read_all_group_messages: Option<bool>,
}

/// Payload de sendMessage
#[derive(Debug, Clone, Serialize)]
pub struct SendMessagePayload<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
}
