//! errors.rs
//! Errores de dominio de plantillas y campañas.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Template blob I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template blob serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Message text is empty")]
    EmptyMessage,

    #[error("No leads selected")]
    EmptySelection,

    #[error("A campaign is already being sent")]
    CampaignInProgress,

    /// Falló la carga de leads/suscripciones antes de marcar nada como pending
    #[error("Could not load recipients: {0}")]
    Directory(anyhow::Error),

    /// La tarea de envío terminó sin completar la lista
    #[error("Campaign dispatch aborted: {0}")]
    Aborted(String),
}

impl DispatchError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DispatchError::EmptyMessage | DispatchError::EmptySelection
        )
    }
}
