use std::{sync::Arc, time::Duration};

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use dotenv::dotenv;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::app_config::{AppConfig, TemplateBackend};
use crate::database::setup_database;
use crate::logger::init_logger;
use crate::models::template_model::TemplateChange;
use crate::services::bot_service::{BotTransport, TelegramBotTransport};
use crate::services::campaign_state::CampaignState;
use crate::services::crm_directory_service::CrmDirectoryService;
use crate::services::dispatch_service::DispatchService;
use crate::services::local_template_repository::LocalTemplateRepository;
use crate::services::sqlite_template_repository::SqliteTemplateRepository;
use crate::services::template_repository::TemplateRepository;
use crate::services::template_service::TemplateService;

mod app;
mod config;
mod database;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

/// Cada cuánto se revisa el blob local por cambios externos
const LOCAL_BLOB_POLL_INTERVAL: Duration = Duration::from_secs(2);

fn build_template_repository(
    config: &AppConfig,
    db_pool: &sqlx::Pool<sqlx::Sqlite>,
) -> Arc<dyn TemplateRepository> {
    match config.template_backend {
        TemplateBackend::Sqlite => {
            log::info!(
                "Plantillas en SQLite (user_id={})",
                config.template_user_id
            );
            Arc::new(SqliteTemplateRepository::new(
                db_pool.clone(),
                &config.template_user_id,
            ))
        }
        TemplateBackend::Local => {
            log::info!("Plantillas en blob local {:?}", config.templates_file);
            let repo = LocalTemplateRepository::new(config.templates_file.clone());
            repo.watch_external_changes(LOCAL_BLOB_POLL_INTERVAL);
            Arc::new(repo)
        }
    }
}

fn spawn_template_change_logger(mut rx: broadcast::Receiver<TemplateChange>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(change) => log::debug!("(templates) Cambio: {:?}", change),
                Err(RecvError::Lagged(n)) => {
                    log::warn!("(templates) Se perdieron {} notificaciones", n)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env().context("Configuración inválida")?;

    let db_pool = setup_database(&config.database_path).await?;

    // Plantillas
    let template_service = TemplateService::new(build_template_repository(&config, &db_pool));
    spawn_template_change_logger(template_service.subscribe());

    // Bot
    let transport: Arc<dyn BotTransport> = Arc::new(TelegramBotTransport::new(
        &config.bot_api_url,
        &config.bot_token,
        config.send_timeout(),
    )?);
    match transport.get_bot_info().await {
        Ok(info) => log::info!(
            "Bot conectado: {} (@{})",
            info.first_name,
            info.username.unwrap_or_default()
        ),
        Err(e) => log::warn!("No se pudo consultar getMe al arrancar: {:?}", e),
    }

    // Campañas
    let directory = CrmDirectoryService::new(db_pool.clone());
    let campaign_state = CampaignState::new();
    let dispatch_service = DispatchService::new(
        transport.clone(),
        directory.clone(),
        campaign_state.clone(),
        config.send_timeout(),
    );

    // Levantar servidor
    log::info!(
        "Levantando servidor en {}:{}",
        config.server_host,
        config.server_port
    );
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(template_service.clone()))
            .app_data(web::Data::new(directory.clone()))
            .app_data(web::Data::new(campaign_state.clone()))
            .app_data(web::Data::new(dispatch_service.clone()))
            .app_data(web::Data::new(transport.clone()))
            .configure(app::init_app)
    })
    .workers(1)
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    Ok(())
}
