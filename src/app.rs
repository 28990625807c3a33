//! app.rs
use crate::handlers::{bot_handler, campaign_handler, lead_handler, template_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/templates")
                    .route(
                        "",
                        web::get().to(template_handler::list_templates_endpoint),
                    )
                    .route(
                        "",
                        web::post().to(template_handler::save_template_endpoint),
                    )
                    .route(
                        "/render",
                        web::post().to(template_handler::render_template_endpoint),
                    )
                    .route(
                        "/{id}",
                        web::delete().to(template_handler::delete_template_endpoint),
                    )
                    .route(
                        "/{id}/use",
                        web::post().to(template_handler::use_template_endpoint),
                    ),
            )
            .service(
                web::scope("/leads")
                    .route("", web::get().to(lead_handler::list_leads_endpoint))
                    .route("", web::post().to(lead_handler::upsert_lead_endpoint)),
            )
            .service(
                web::scope("/subscriptions")
                    .route(
                        "",
                        web::get().to(lead_handler::list_subscriptions_endpoint),
                    )
                    .route(
                        "",
                        web::post().to(lead_handler::upsert_subscription_endpoint),
                    ),
            )
            .service(
                web::scope("/campaigns")
                    .route(
                        "/dispatch",
                        web::post().to(campaign_handler::dispatch_campaign_endpoint),
                    )
                    .route(
                        "/draft",
                        web::put().to(campaign_handler::update_draft_endpoint),
                    )
                    .route(
                        "/current",
                        web::get().to(campaign_handler::current_campaign_endpoint),
                    ),
            )
            .service(
                web::scope("/bot").route("/info", web::get().to(bot_handler::bot_info_endpoint)),
            ),
    );
}
