//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod bot_model;
pub mod campaign_model;
pub mod lead_model;
pub mod template_model;
