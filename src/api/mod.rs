// ============================================================================
// HTTP API
// ============================================================================
//
// GET /api/order/{order_uid}  order as JSON (200 / 404 / 500)
// GET /health                 component health, 503 until warm-up finished
// GET /metrics                Prometheus text format
//
// ============================================================================

mod handlers;

use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use kameo::actor::ActorRef;

use crate::actors::HealthMonitorActor;
use crate::metrics::Metrics;
use crate::services::OrderService;

/// Shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub health: ActorRef<HealthMonitorActor>,
    pub metrics: Arc<Metrics>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/order/{order_uid}", web::get().to(handlers::get_order))
        .route("/health", web::get().to(handlers::health))
        .route("/metrics", web::get().to(handlers::metrics));
}

/// Bind the listener. The returned server must be awaited to run.
pub fn start_server(state: AppState, host: &str, port: u16) -> std::io::Result<Server> {
    tracing::info!("🌐 Starting HTTP server on http://{}:{}", host, port);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure)
    })
    .disable_signals()
    .bind((host, port))?
    .run();

    Ok(server)
}
