mod config;
mod db;
mod services;
mod session;
mod state;

use crate::config::Config;
use crate::state::AppState;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use log::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = Config::parse();
    let (host, port) = config.bind_address();

    let state = AppState::from_config(&config);
    info!(
        "Tenant databases stored under {}",
        config.data_dir.display()
    );
    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(services::voters::configure_routes())
    })
        .bind((host.as_str(), port))?
        .run()
        .await
}
