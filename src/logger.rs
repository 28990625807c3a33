//! logger.rs
//! Configuración del logger usando env_logger.

/// Filtro por defecto: nuestro crate en info y las dependencias ruidosas
/// (sqlx registra cada query, hyper/reqwest cada conexión) solo en warn.
const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn,reqwest=warn,actix_server=warn";

pub fn init_logger() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();
}
