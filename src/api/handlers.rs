use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use prometheus::{Encoder, TextEncoder};

use super::AppState;
use crate::actors::GetSystemHealth;

pub(super) async fn get_order(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let order_uid = path.into_inner();

    match state.orders.get_order(&order_uid).await {
        Ok(Some(order)) => HttpResponse::Ok().json(order.as_ref()),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "order not found",
            "order_uid": order_uid,
        })),
        Err(_) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "failed to load order",
        })),
    }
}

pub(super) async fn health(state: web::Data<AppState>) -> impl Responder {
    match state.health.ask(GetSystemHealth).await {
        Ok(health) => {
            let status = if health.is_serving() {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            HttpResponse::build(status).json(health)
        }
        Err(e) => {
            tracing::error!(error = %e, "Health monitor did not answer");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unknown",
            }))
        }
    }
}

pub(super) async fn metrics(state: web::Data<AppState>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, App};
    use kameo::prelude::*;

    use super::super::{configure, AppState};
    use crate::actors::{HealthMonitorActor, MarkReady};
    use crate::cache::OrderCache;
    use crate::metrics::Metrics;
    use crate::services::OrderService;
    use crate::testing::{valid_order, InMemoryOrderRepository};

    fn state(repository: Arc<InMemoryOrderRepository>) -> AppState {
        let metrics = Arc::new(Metrics::new().unwrap());
        let orders = OrderService::new(repository, Arc::new(OrderCache::new()))
            .with_metrics(metrics.clone());
        AppState {
            orders: Arc::new(orders),
            health: HealthMonitorActor::spawn(HealthMonitorActor::without_probes()),
            metrics,
        }
    }

    #[actix_web::test]
    async fn test_get_order_from_cache() {
        let state = state(Arc::new(InMemoryOrderRepository::new()));
        let mut order = valid_order("A1");
        order.delivery.phone = "79720000000".to_string();
        state.orders.cache().insert(order.clone());
        let app = test::init_service(App::new().app_data(actix_web::web::Data::new(state)).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/order/A1").to_request();
        let body: crate::domain::order::Order = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body, order);
    }

    #[actix_web::test]
    async fn test_unknown_order_is_404() {
        let state = state(Arc::new(InMemoryOrderRepository::new()));
        let app = test::init_service(App::new().app_data(actix_web::web::Data::new(state)).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/order/missing").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_storage_failure_is_500() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        repository.fail_reads(true);
        let state = state(repository);
        let app = test::init_service(App::new().app_data(actix_web::web::Data::new(state)).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/order/A1").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 500);
    }

    #[actix_web::test]
    async fn test_health_waits_for_ready() {
        let state = state(Arc::new(InMemoryOrderRepository::new()));
        let monitor = state.health.clone();
        let app = test::init_service(App::new().app_data(actix_web::web::Data::new(state)).configure(configure)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), 503);

        monitor.tell(MarkReady).await.unwrap();

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn test_metrics_endpoint_exposes_cache_counters() {
        let state = state(Arc::new(InMemoryOrderRepository::new()));
        let app = test::init_service(App::new().app_data(actix_web::web::Data::new(state)).configure(configure)).await;

        let _ = test::call_service(&app, test::TestRequest::get().uri("/api/order/x").to_request()).await;
        let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("order_cache_misses_total 1"));
    }
}
