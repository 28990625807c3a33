//! services/campaign_state.rs
//! Estado en memoria de la campaña actual: mensaje, leads seleccionados y una
//! fila de estado por destinatario. No se persiste.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};

use crate::{
    errors::DispatchError,
    models::campaign_model::{CampaignMessageEntry, CampaignMessageStatus, CampaignSnapshot},
};

#[derive(Clone)]
pub struct CampaignState {
    inner: Arc<RwLock<CampaignSnapshot>>,
    /// Se incrementa en cada cambio para que los observadores refresquen
    revision: Arc<watch::Sender<u64>>,
}

impl Default for CampaignState {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignState {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        CampaignState {
            inner: Arc::new(RwLock::new(CampaignSnapshot::default())),
            revision: Arc::new(revision),
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub async fn snapshot(&self) -> CampaignSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn set_message(&self, message: &str) {
        self.inner.write().await.message = message.to_string();
        self.bump();
    }

    /// Actualiza el borrador (mensaje y/o selección) sin tocar las filas de estado
    pub async fn set_draft(&self, message: Option<String>, lead_ids: Option<Vec<String>>) {
        {
            let mut state = self.inner.write().await;
            if let Some(message) = message {
                state.message = message;
            }
            if let Some(lead_ids) = lead_ids {
                state.selected_lead_ids = lead_ids;
            }
        }
        self.bump();
    }

    /// Marca la campaña como en curso. Falla si ya hay una enviándose.
    pub async fn reserve(&self) -> Result<(), DispatchError> {
        {
            let mut state = self.inner.write().await;
            if state.is_sending {
                return Err(DispatchError::CampaignInProgress);
            }
            state.is_sending = true;
        }
        self.bump();
        Ok(())
    }

    /// Libera la reserva cuando el envío no llegó a empezar
    pub async fn release(&self) {
        self.inner.write().await.is_sending = false;
        self.bump();
    }

    /// Publica de una vez todas las filas `pending`, reemplazando la corrida anterior.
    pub async fn publish(
        &self,
        message: &str,
        lead_ids: &[String],
        entries: Vec<CampaignMessageEntry>,
    ) {
        {
            let mut state = self.inner.write().await;
            state.message = message.to_string();
            state.selected_lead_ids = lead_ids.to_vec();
            state.entries = entries;
            state.started_at = Some(Utc::now());
            state.finished_at = None;
        }
        self.bump();
    }

    /// Aplica el resultado de una fila. Solo se permite `pending -> sent|failed`
    /// y una única vez; devuelve false si la transición no aplica.
    pub async fn record_outcome(
        &self,
        index: usize,
        status: CampaignMessageStatus,
        error: Option<String>,
        sent_at: Option<DateTime<Utc>>,
    ) -> bool {
        if !status.is_terminal() {
            return false;
        }

        let applied = {
            let mut state = self.inner.write().await;
            match state.entries.get_mut(index) {
                Some(entry) if entry.status == CampaignMessageStatus::Pending => {
                    entry.status = status;
                    entry.error = error;
                    entry.sent_at = sent_at;
                    true
                }
                _ => false,
            }
        };

        if applied {
            self.bump();
        }
        applied
    }

    /// Cierra una campaña interrumpida: toda fila aún `pending` pasa a `failed`
    /// con `reason` y se libera la reserva.
    pub async fn abandon(&self, reason: &str) {
        {
            let mut state = self.inner.write().await;
            for entry in state
                .entries
                .iter_mut()
                .filter(|e| e.status == CampaignMessageStatus::Pending)
            {
                entry.status = CampaignMessageStatus::Failed;
                entry.error = Some(reason.to_string());
            }
            state.is_sending = false;
            state.finished_at = Some(Utc::now());
        }
        self.bump();
    }

    pub async fn finish(&self) -> Vec<CampaignMessageEntry> {
        let entries = {
            let mut state = self.inner.write().await;
            state.is_sending = false;
            state.finished_at = Some(Utc::now());
            state.entries.clone()
        };
        self.bump();
        entries
    }
}
