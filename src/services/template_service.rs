use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    errors::TemplateError,
    models::template_model::{MessageTemplate, TemplateChange},
    services::template_repository::TemplateRepository,
};

/// Fachada sobre el repositorio activo. Aquí se aplica la política de errores
/// hacia afuera: `list`, `delete` y `use_template` nunca fallan.
#[derive(Clone)]
pub struct TemplateService {
    repository: Arc<dyn TemplateRepository>,
}

impl TemplateService {
    pub fn new(repository: Arc<dyn TemplateRepository>) -> Self {
        TemplateService { repository }
    }

    /// Lista las plantillas; ante error de lectura devuelve lista vacía.
    pub async fn list(&self) -> Vec<MessageTemplate> {
        match self.repository.list().await {
            Ok(templates) => templates,
            Err(e) => {
                log::error!("(TemplateService::list) Error leyendo plantillas: {:?}", e);
                Vec::new()
            }
        }
    }

    /// Valida y guarda. Nombre y contenido no pueden quedar vacíos.
    pub async fn save(
        &self,
        name: &str,
        content: &str,
        id: Option<&str>,
    ) -> Result<MessageTemplate, TemplateError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TemplateError::Validation(
                "Template name cannot be empty".to_string(),
            ));
        }
        if content.trim().is_empty() {
            return Err(TemplateError::Validation(
                "Template content cannot be empty".to_string(),
            ));
        }

        let id = id.map(str::trim).filter(|s| !s.is_empty());
        self.repository.save(name, content, id).await.map_err(|e| {
            log::error!("(TemplateService::save) Error guardando plantilla: {:?}", e);
            e
        })
    }

    pub async fn delete(&self, id: &str) -> bool {
        match self.repository.delete(id).await {
            Ok(deleted) => {
                if !deleted {
                    log::info!("(TemplateService::delete) Plantilla {} no existe", id);
                }
                deleted
            }
            Err(e) => {
                log::error!(
                    "(TemplateService::delete) Error borrando plantilla {}: {:?}",
                    id,
                    e
                );
                false
            }
        }
    }

    /// Devuelve la plantilla usada (con contadores actualizados) o `None`.
    pub async fn use_template(&self, id: &str) -> Option<MessageTemplate> {
        match self.repository.mark_used(id).await {
            Ok(Some(template)) => Some(template),
            Ok(None) => {
                log::info!("(TemplateService::use_template) Plantilla {} no existe", id);
                None
            }
            Err(e) => {
                log::error!(
                    "(TemplateService::use_template) Error marcando uso de {}: {:?}",
                    id,
                    e
                );
                None
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TemplateChange> {
        self.repository.subscribe()
    }
}
