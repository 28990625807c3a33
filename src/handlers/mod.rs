//! handlers/mod.rs
//! Módulo que agrupa los distintos handlers (plantillas, campañas, leads, bot).
pub mod bot_handler;
pub mod campaign_handler;
pub mod lead_handler;
pub mod template_handler;
