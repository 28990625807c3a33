//! services/bot_service.rs
//! Transporte hacia la Bot API (formato Telegram).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::models::bot_model::{BotAck, BotInfo, SendMessagePayload};

/// Operaciones remotas del bot. En tests se reemplaza por un mock.
#[async_trait]
pub trait BotTransport: Send + Sync {
    /// Un acuse con `ok = false` es un rechazo del bot, no un error de transporte.
    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<BotAck>;

    async fn get_bot_info(&self) -> Result<BotInfo>;
}

#[derive(Clone)]
pub struct TelegramBotTransport {
    http_client: Client,
    api_url: String,
    token: String,
}

impl TelegramBotTransport {
    pub fn new(api_url: &str, token: &str, request_timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("No se pudo construir el cliente HTTP del bot")?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }
}

#[async_trait]
impl BotTransport for TelegramBotTransport {
    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<BotAck> {
        let payload = SendMessagePayload {
            chat_id: recipient_id,
            text,
        };

        let resp = self
            .http_client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await
            .context("(send_message) Fallo al POST sendMessage")?;

        let status = resp.status();
        let body_txt = resp
            .text()
            .await
            .context("(send_message) No se pudo leer la respuesta de sendMessage")?;
        log::debug!(
            "(send_message) -> chat_id='{}': status={}",
            recipient_id,
            status
        );

        // La Bot API responde {ok:false, description} también con 4xx; sin un
        // acuse legible no se puede dar el envío por hecho
        match serde_json::from_str::<BotAck>(&body_txt) {
            Ok(ack) => Ok(ack),
            Err(_) => Err(anyhow!(
                "Respuesta inesperada de sendMessage ({}): {}",
                status,
                body_txt
            )),
        }
    }

    async fn get_bot_info(&self) -> Result<BotInfo> {
        let resp = self
            .http_client
            .get(self.method_url("getMe"))
            .send()
            .await
            .context("(get_bot_info) Fallo al GET getMe")?;

        let ack = resp
            .json::<BotAck>()
            .await
            .context("(get_bot_info) Respuesta de getMe no es JSON válido")?;

        if !ack.ok {
            return Err(anyhow!(
                "getMe rechazado: {}",
                ack.description.unwrap_or_else(|| "sin descripción".to_string())
            ));
        }

        let result = ack
            .result
            .ok_or_else(|| anyhow!("getMe sin campo result"))?;
        serde_json::from_value(result).context("(get_bot_info) result de getMe inválido")
    }
}
