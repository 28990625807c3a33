use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::{
    errors::DispatchError,
    models::campaign_model::{
        CampaignMessageEntry, CampaignMessageStatus, CampaignSummary, DispatchRequest,
    },
    services::{
        bot_service::BotTransport, campaign_state::CampaignState,
        crm_directory_service::CrmDirectoryService, recipient_resolver::RecipientResolver,
        template_variables,
    },
};

pub const NO_RECIPIENT_REASON: &str = "no recipient id found";
pub const GENERIC_SEND_FAILURE: &str = "failed to send message";

/// Resultado terminal de un destinatario
#[derive(Debug)]
enum DeliveryOutcome {
    Sent,
    Failed(String),
}

/// Envía un mensaje a cada lead seleccionado, uno por uno y en orden,
/// actualizando `CampaignState` tras cada envío.
#[derive(Clone)]
pub struct DispatchService {
    transport: Arc<dyn BotTransport>,
    directory: CrmDirectoryService,
    state: CampaignState,
    send_timeout: Duration,
}

impl DispatchService {
    pub fn new(
        transport: Arc<dyn BotTransport>,
        directory: CrmDirectoryService,
        state: CampaignState,
        send_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            directory,
            state,
            send_timeout,
        }
    }

    /// Aplica las variables del request y despacha de forma síncrona.
    pub async fn dispatch_request(
        &self,
        req: &DispatchRequest,
    ) -> Result<CampaignSummary, DispatchError> {
        let message = template_variables::apply(&req.message, &req.variables);
        self.dispatch(&message, &req.lead_ids).await
    }

    /// Igual que `dispatch_request` pero el envío corre en segundo plano.
    /// Las validaciones y la reserva se hacen antes de volver.
    pub async fn dispatch_request_in_background(
        &self,
        req: &DispatchRequest,
    ) -> Result<(), DispatchError> {
        let message = template_variables::apply(&req.message, &req.variables);
        self.start(&message, &req.lead_ids).await?;

        let campaign = self.spawn_run(message, req.lead_ids.clone());
        tokio::spawn(async move {
            match campaign.await {
                Ok(Ok(summary)) => log::info!(
                    "(dispatch_in_background) Campaña terminada: {} enviados, {} fallidos",
                    summary.sent,
                    summary.failed
                ),
                Ok(Err(e)) => log::error!("(dispatch_in_background) Campaña abortada: {}", e),
                Err(e) => log::error!("(dispatch_in_background) La tarea de envío murió: {}", e),
            }
        });
        Ok(())
    }

    /// El envío corre en su propia tarea: si el llamador se cancela (cliente
    /// HTTP desconectado) la campaña igual termina y libera la reserva.
    pub async fn dispatch(
        &self,
        message_text: &str,
        lead_ids: &[String],
    ) -> Result<CampaignSummary, DispatchError> {
        self.start(message_text, lead_ids).await?;

        self.spawn_run(message_text.to_string(), lead_ids.to_vec())
            .await
            .map_err(|e| DispatchError::Aborted(e.to_string()))?
    }

    /// Lanza `run` en una tarea tokio. Si la tarea entra en pánico, las filas
    /// que quedaron en pending pasan a failed y se libera la reserva.
    fn spawn_run(
        &self,
        message: String,
        lead_ids: Vec<String>,
    ) -> JoinHandle<Result<CampaignSummary, DispatchError>> {
        let service = self.clone();
        let state = self.state.clone();
        let task = tokio::spawn(async move { service.run(&message, &lead_ids).await });

        tokio::spawn(async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("(dispatch) La tarea de envío terminó con error: {}", e);
                    state.abandon(&format!("dispatch aborted: {}", e)).await;
                    Err(DispatchError::Aborted(e.to_string()))
                }
            }
        })
    }

    /// Precondiciones + reserva. Nada se marca como pending si fallan.
    async fn start(&self, message_text: &str, lead_ids: &[String]) -> Result<(), DispatchError> {
        if message_text.trim().is_empty() {
            return Err(DispatchError::EmptyMessage);
        }
        if lead_ids.is_empty() {
            return Err(DispatchError::EmptySelection);
        }
        self.state.reserve().await
    }

    /// Requiere una reserva previa en `CampaignState`.
    async fn run(
        &self,
        message_text: &str,
        lead_ids: &[String],
    ) -> Result<CampaignSummary, DispatchError> {
        let (leads, subscriptions) = match self.directory.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("(dispatch) No se pudieron cargar leads/suscripciones: {:?}", e);
                self.state.release().await;
                return Err(DispatchError::Directory(e));
            }
        };
        let resolver = RecipientResolver::new(leads, subscriptions);

        // 1) Todas las filas en pending, publicadas de una vez
        let entries: Vec<CampaignMessageEntry> = lead_ids
            .iter()
            .map(|lead_id| {
                CampaignMessageEntry::pending(
                    lead_id.clone(),
                    resolver.lead_name(lead_id),
                    resolver.resolve(lead_id),
                )
            })
            .collect();
        self.state.publish(message_text, lead_ids, entries.clone()).await;

        log::info!(
            "(dispatch) Iniciando campaña para {} leads ({} con recipient_id)",
            entries.len(),
            entries.iter().filter(|e| e.recipient_id.is_some()).count()
        );

        // 2) Secuencial y en orden; un fallo no detiene a los siguientes
        for (index, entry) in entries.iter().enumerate() {
            let outcome = self
                .deliver(entry.recipient_id.as_deref(), message_text)
                .await;

            match outcome {
                DeliveryOutcome::Sent => {
                    log::info!(
                        "(dispatch) Lead '{}' ({}) -> sent",
                        entry.lead_name,
                        entry.lead_id
                    );
                    self.state
                        .record_outcome(index, CampaignMessageStatus::Sent, None, Some(Utc::now()))
                        .await;
                }
                DeliveryOutcome::Failed(reason) => {
                    log::error!(
                        "(dispatch) Lead '{}' ({}) -> failed: {}",
                        entry.lead_name,
                        entry.lead_id,
                        reason
                    );
                    self.state
                        .record_outcome(index, CampaignMessageStatus::Failed, Some(reason), None)
                        .await;
                }
            }
        }

        let summary = CampaignSummary::from_entries(self.state.finish().await);
        log::info!(
            "(dispatch) Campaña finalizada: total={}, sent={}, failed={}",
            summary.total,
            summary.sent,
            summary.failed
        );
        Ok(summary)
    }

    async fn deliver(&self, recipient_id: Option<&str>, message_text: &str) -> DeliveryOutcome {
        let Some(recipient_id) = recipient_id else {
            return DeliveryOutcome::Failed(NO_RECIPIENT_REASON.to_string());
        };

        let send = self.transport.send_message(recipient_id, message_text);
        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(ack)) if ack.ok => DeliveryOutcome::Sent,
            Ok(Ok(ack)) => DeliveryOutcome::Failed(
                ack.description
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_SEND_FAILURE.to_string()),
            ),
            Ok(Err(e)) => {
                let reason = e.to_string();
                if reason.trim().is_empty() {
                    DeliveryOutcome::Failed(GENERIC_SEND_FAILURE.to_string())
                } else {
                    DeliveryOutcome::Failed(reason)
                }
            }
            Err(_) => DeliveryOutcome::Failed(format!(
                "send timed out after {}s",
                self.send_timeout.as_secs()
            )),
        }
    }
}
