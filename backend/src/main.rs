mod clients;
mod config;
mod error;
mod services;
mod xlsx;

use crate::clients::ReportClients;
use crate::config::ServerConfig;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = ServerConfig::from_env().map_err(io::Error::other)?;
    let clients = ReportClients::from_config(&config).map_err(io::Error::other)?;

    info!(
        "Exporting project '{}' into bucket '{}'",
        config.project_id, config.bucket
    );
    info!("Server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(clients.clone()))
            .service(services::reports::configure_routes())
    })
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}
