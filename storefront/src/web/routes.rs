// storefront/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{earning_handlers, event_handlers, order_handlers, push_handlers, store_handlers};
use actix_web::{web, HttpResponse};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed bodies answer with the same `{error}` shape as every other failure.
fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .app_data(json_config())
      .route("/health", web::get().to(health_check_handler))
      .route(
        "/orders/status",
        web::post().to(order_handlers::update_order_status_handler),
      )
      .service(
        web::scope("/stores/{store_id}")
          .route(
            "/permission-catalog",
            web::get().to(store_handlers::permission_catalog_handler),
          )
          .route(
            "/push-subscriptions",
            web::post().to(push_handlers::subscribe_handler),
          )
          .route("/events", web::get().to(event_handlers::store_events_handler)),
      )
      .route(
        "/affiliate-earnings/{earning_id}/status",
        web::post().to(earning_handlers::update_earning_status_handler),
      ),
  );
}
