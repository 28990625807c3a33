//! handlers/template_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    errors::TemplateError,
    models::template_model::{
        RenderTemplateRequest, RenderTemplateResponse, SaveTemplateRequest, UseTemplateResponse,
    },
    services::{
        campaign_state::CampaignState, template_service::TemplateService, template_variables,
    },
};

/// GET /api/templates
pub async fn list_templates_endpoint(template_service: web::Data<TemplateService>) -> HttpResponse {
    HttpResponse::Ok().json(template_service.list().await)
}

/// POST /api/templates
pub async fn save_template_endpoint(
    template_service: web::Data<TemplateService>,
    body: web::Json<SaveTemplateRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    match template_service
        .save(&req.name, &req.content, req.id.as_deref())
        .await
    {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(TemplateError::Validation(msg)) => HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": msg
        })),
        Err(e @ TemplateError::NotFound(_)) => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": e.to_string()
        })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": format!("Failed to save template: {}", e)
        })),
    }
}

/// DELETE /api/templates/{id}
pub async fn delete_template_endpoint(
    template_service: web::Data<TemplateService>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = path.into_inner();
    let deleted = template_service.delete(&id).await;
    HttpResponse::Ok().json(json!({
        "success": true,
        "deleted": deleted
    }))
}

/// POST /api/templates/{id}/use
/// Además copia el contenido al mensaje borrador de la campaña.
pub async fn use_template_endpoint(
    template_service: web::Data<TemplateService>,
    campaign_state: web::Data<CampaignState>,
    path: web::Path<String>,
) -> HttpResponse {
    let id = path.into_inner();

    match template_service.use_template(&id).await {
        Some(template) => {
            campaign_state.set_message(&template.content).await;
            HttpResponse::Ok().json(UseTemplateResponse {
                success: true,
                template_id: template.id,
                content: template.content,
                use_count: template.use_count,
            })
        }
        None => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": format!("Template not found: {}", id)
        })),
    }
}

/// POST /api/templates/render
pub async fn render_template_endpoint(body: web::Json<RenderTemplateRequest>) -> HttpResponse {
    let req = body.into_inner();
    HttpResponse::Ok().json(RenderTemplateResponse {
        content: template_variables::apply(&req.content, &req.variables),
    })
}
