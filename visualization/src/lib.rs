pub mod api;
pub mod database;
pub mod errors;
mod frontend;
pub mod route_view;

#[cfg(test)]
mod tests;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use api::v1::{config_api, diagnostics_api, route_api, routes_api};
use common::types::config::DashboardConfig;
use database::FeedDatabase;
use log::info;

pub async fn run_server(database: FeedDatabase, config: DashboardConfig) -> std::io::Result<()> {
    let address = (config.bind.clone(), config.port);
    info!(
        target: "dashboard",
        "Serving {} on http://{}:{}",
        database.path().display(),
        address.0,
        address.1
    );

    HttpServer::new(move || {
        let cors = config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin));

        App::new()
            .wrap(cors)
            // Make the store and config available in all handlers
            .app_data(web::Data::new(database.clone()))
            .app_data(web::Data::new(config.clone()))
            .configure(configure_app)
    })
    .bind(address)?
    .run()
    .await
}

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg
        // API endpoints
        .service(routes_api)
        .service(route_api)
        .service(diagnostics_api)
        .service(config_api)
        // Frontend
        .service(frontend::index);
}
