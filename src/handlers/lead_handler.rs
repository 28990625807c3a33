//! handlers/lead_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{
    models::lead_model::{UpsertLeadRequest, UpsertSubscriptionRequest},
    services::crm_directory_service::CrmDirectoryService,
};

fn internal_error(e: anyhow::Error) -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({
        "success": false,
        "error": format!("{:#}", e)
    }))
}

#[derive(Deserialize)]
pub struct LeadQuery {
    subscribed_only: Option<bool>,
}

/// GET /api/leads
pub async fn list_leads_endpoint(
    directory: web::Data<CrmDirectoryService>,
    query: web::Query<LeadQuery>,
) -> HttpResponse {
    let subscribed_only = query.subscribed_only.unwrap_or(false);

    match directory.lead_collection(subscribed_only).await {
        Ok(collection) => HttpResponse::Ok().json(collection),
        Err(e) => {
            log::error!("(list_leads_endpoint) {:?}", e);
            internal_error(e)
        }
    }
}

/// POST /api/leads
pub async fn upsert_lead_endpoint(
    directory: web::Data<CrmDirectoryService>,
    body: web::Json<UpsertLeadRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    if req.id.trim().is_empty() || req.name.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "Lead id and name are required"
        }));
    }

    match directory.upsert_lead(&req).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "id": req.id })),
        Err(e) => internal_error(e),
    }
}

/// GET /api/subscriptions
pub async fn list_subscriptions_endpoint(directory: web::Data<CrmDirectoryService>) -> HttpResponse {
    match directory.list_subscriptions().await {
        Ok(subs) => HttpResponse::Ok().json(subs),
        Err(e) => internal_error(e),
    }
}

/// POST /api/subscriptions
pub async fn upsert_subscription_endpoint(
    directory: web::Data<CrmDirectoryService>,
    body: web::Json<UpsertSubscriptionRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    if req.id.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "Subscription id is required"
        }));
    }

    match directory.upsert_subscription(&req).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "success": true, "id": req.id })),
        Err(e) => internal_error(e),
    }
}
