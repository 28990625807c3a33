//! handlers/bot_handler.rs
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::services::bot_service::BotTransport;

/// GET /api/bot/info
pub async fn bot_info_endpoint(transport: web::Data<Arc<dyn BotTransport>>) -> HttpResponse {
    match transport.get_bot_info().await {
        Ok(info) => HttpResponse::Ok().json(info),
        Err(e) => {
            log::error!("(bot_info_endpoint) {:?}", e);
            HttpResponse::BadGateway().json(json!({
                "success": false,
                "error": format!("{}", e)
            }))
        }
    }
}
