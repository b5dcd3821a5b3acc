use std::io;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

use crate::handlers;
use crate::state::AppState;

/// Routes under `/api`, shared by the server and the HTTP tests.
pub fn app_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/chat", web::post().to(handlers::chat::handler))
            .route("/stream", web::post().to(handlers::stream::handler))
            .route("/reset", web::post().to(handlers::reset::handler))
            .route("/stop/{session_id}", web::post().to(handlers::stop::handler))
            .route(
                "/transcript/{session_id}",
                web::get().to(handlers::transcript::handler),
            )
            .route("/health", web::get().to(handlers::health::handler))
            .route("/inventory", web::post().to(handlers::inventory::handler)),
    );
}

pub async fn run_server(state: AppState, host: &str, port: u16) -> io::Result<()> {
    log::info!(
        "Starting pharmacy assistant on http://{}:{} (model: {})",
        host,
        port,
        state.assistant.model_name()
    );
    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .configure(app_config)
    })
    .bind((host, port))?
    .run()
    .await
}
