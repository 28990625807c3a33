//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod bot_service;
pub mod campaign_state;
pub mod crm_directory_service;
pub mod dispatch_service;
pub mod local_template_repository;
pub mod recipient_resolver;
pub mod sqlite_template_repository;
pub mod template_repository;
pub mod template_service;
pub mod template_variables;
