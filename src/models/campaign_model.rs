use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignMessageStatus {
    Pending,
    Sent,
    Failed,
}

impl CampaignMessageStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CampaignMessageStatus::Pending)
    }
}

/// Una fila por lead seleccionado. Se crea en `pending` y pasa una única vez
/// a `sent` o `failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMessageEntry {
    pub lead_id: String,
    pub lead_name: String,
    pub status: CampaignMessageStatus,
    pub error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub recipient_id: Option<String>,
}

impl CampaignMessageEntry {
    pub fn pending(lead_id: String, lead_name: String, recipient_id: Option<String>) -> Self {
        Self {
            lead_id,
            lead_name,
            status: CampaignMessageStatus::Pending,
            error: None,
            sent_at: None,
            recipient_id,
        }
    }
}

/// Vista completa del estado de la campaña actual
#[derive(Debug, Clone, Default, Serialize)]
pub struct CampaignSnapshot {
    pub message: String,
    pub selected_lead_ids: Vec<String>,
    pub entries: Vec<CampaignMessageEntry>,
    pub is_sending: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub entries: Vec<CampaignMessageEntry>,
}

impl CampaignSummary {
    pub fn from_entries(entries: Vec<CampaignMessageEntry>) -> Self {
        let sent = entries
            .iter()
            .filter(|e| e.status == CampaignMessageStatus::Sent)
            .count();
        let failed = entries
            .iter()
            .filter(|e| e.status == CampaignMessageStatus::Failed)
            .count();
        Self {
            total: entries.len(),
            sent,
            failed,
            entries,
        }
    }
}

/// Body de POST /api/campaigns/dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchRequest {
    pub message: String,
    pub lead_ids: Vec<String>,

    /// Variables `{{clave}}` a sustituir en el mensaje antes de enviar
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Si es true, la campaña corre en segundo plano
    #[serde(default)]
    pub async_send: bool,
}

/// Body de PUT /api/campaigns/draft
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignDraftRequest {
    pub message: Option<String>,
    pub lead_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchResponse {
    pub success: bool,
    pub message: String,
    pub summary: Option<CampaignSummary>,
}
