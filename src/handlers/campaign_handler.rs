//! handlers/campaign_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    errors::DispatchError,
    models::campaign_model::{CampaignDraftRequest, DispatchRequest, DispatchResponse},
    services::{campaign_state::CampaignState, dispatch_service::DispatchService},
};

fn dispatch_error_response(e: DispatchError) -> HttpResponse {
    let body = json!({
        "success": false,
        "error": e.to_string()
    });
    match e {
        e if e.is_validation() => HttpResponse::BadRequest().json(body),
        DispatchError::CampaignInProgress => HttpResponse::Conflict().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// POST /api/campaigns/dispatch
pub async fn dispatch_campaign_endpoint(
    dispatch_service: web::Data<DispatchService>,
    body: web::Json<DispatchRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    if req.async_send {
        match dispatch_service.dispatch_request_in_background(&req).await {
            Ok(()) => HttpResponse::Accepted().json(DispatchResponse {
                success: true,
                message: "Campaign queued for async processing".to_string(),
                summary: None,
            }),
            Err(e) => dispatch_error_response(e),
        }
    } else {
        match dispatch_service.dispatch_request(&req).await {
            Ok(summary) => HttpResponse::Ok().json(DispatchResponse {
                success: true,
                message: "Campaign processed".to_string(),
                summary: Some(summary),
            }),
            Err(e) => dispatch_error_response(e),
        }
    }
}

/// PUT /api/campaigns/draft
pub async fn update_draft_endpoint(
    campaign_state: web::Data<CampaignState>,
    body: web::Json<CampaignDraftRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    campaign_state.set_draft(req.message, req.lead_ids).await;
    HttpResponse::Ok().json(campaign_state.snapshot().await)
}

/// GET /api/campaigns/current
pub async fn current_campaign_endpoint(campaign_state: web::Data<CampaignState>) -> HttpResponse {
    HttpResponse::Ok().json(campaign_state.snapshot().await)
}
