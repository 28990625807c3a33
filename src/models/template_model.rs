//! models/template_model.rs
//! Plantillas de mensajes guardadas por el operador.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tipo fijo con el que se guardan las plantillas en la tabla `message_templates`.
pub const BOT_MESSAGE_TEMPLATE_TYPE: &str = "bot_message";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub use_count: u32,
}

impl MessageTemplate {
    pub fn new(id: String, name: String, content: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            content,
            created_at: now,
            last_used: None,
            use_count: 0,
        }
    }

    /// Marca la plantilla como usada. `last_used` nunca retrocede aunque el
    /// reloj lo haga.
    pub fn mark_used(&mut self, now: DateTime<Utc>) {
        let used_at = match self.last_used {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        self.last_used = Some(used_at);
        self.use_count = self.use_count.saturating_add(1);
    }
}

/// Body de POST /api/templates
#[derive(Debug, Clone, Deserialize)]
pub struct SaveTemplateRequest {
    /// Si viene, se actualiza la plantilla existente
    pub id: Option<String>,
    pub name: String,
    pub content: String,
}

/// Body de POST /api/templates/render
#[derive(Debug, Clone, Deserialize)]
pub struct RenderTemplateRequest {
    pub content: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderTemplateResponse {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UseTemplateResponse {
    pub success: bool,
    pub template_id: String,
    pub content: String,
    pub use_count: u32,
}

/// Evento emitido por los repositorios cuando cambia la colección.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateChange {
    Saved(String),
    Deleted(String),
    Used(String),
    /// El blob local fue modificado por otro proceso
    ExternallyModified,
}
