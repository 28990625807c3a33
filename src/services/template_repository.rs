//! services/template_repository.rs
//! Interfaz común de los dos backends de plantillas (SQLite y blob local).

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    errors::TemplateError,
    models::template_model::{MessageTemplate, TemplateChange},
};

/// Capacidad de persistencia de plantillas. El backend concreto se elige al
/// construir la app según `TEMPLATE_BACKEND`.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Más recientes primero (por `created_at`)
    async fn list(&self) -> Result<Vec<MessageTemplate>, TemplateError>;

    /// Crea (sin `id`) o actualiza nombre/contenido (con `id`).
    /// Un `id` inexistente devuelve `TemplateError::NotFound`.
    async fn save(
        &self,
        name: &str,
        content: &str,
        id: Option<&str>,
    ) -> Result<MessageTemplate, TemplateError>;

    /// true si existía y se borró
    async fn delete(&self, id: &str) -> Result<bool, TemplateError>;

    /// Incrementa `use_count`, actualiza `last_used` y devuelve la plantilla
    async fn mark_used(&self, id: &str) -> Result<Option<MessageTemplate>, TemplateError>;

    fn subscribe(&self) -> broadcast::Receiver<TemplateChange>;
}

/// Capacidad del canal de notificaciones de cambios
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Publica un cambio; que nadie escuche no es un error.
pub(crate) fn notify(tx: &broadcast::Sender<TemplateChange>, change: TemplateChange) {
    let _ = tx.send(change);
}
