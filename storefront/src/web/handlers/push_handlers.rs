// storefront/src/web/handlers/push_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::load_store_for_member;
use crate::errors::AppError;
use crate::models::NewPushSubscription;
use crate::services::web_push::push_audience;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct SubscriptionKeys {
  pub p256dh: String,
  pub auth: String,
}

/// The browser's `PushSubscription.toJSON()`.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
  pub endpoint: String,
  pub keys: SubscriptionKeys,
}

#[instrument(name = "handler::push_subscribe", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn subscribe_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<SubscribeRequest>,
) -> Result<HttpResponse, AppError> {
  let store = load_store_for_member(&app_state, path.into_inner(), auth_user.user_id).await?;
  let payload = req_payload.into_inner();
  push_audience(&payload.endpoint)?;
  if payload.keys.p256dh.trim().is_empty() || payload.keys.auth.trim().is_empty() {
    return Err(AppError::Validation("Subscription keys are required".to_string()));
  }

  let subscription = app_state
    .repository
    .upsert_push_subscription(
      NewPushSubscription {
        store_id: store.id,
        user_id: auth_user.user_id,
        endpoint: payload.endpoint,
        p256dh: payload.keys.p256dh,
        auth: payload.keys.auth,
      },
      Utc::now(),
    )
    .await?;
  info!(subscription_id = %subscription.id, "Push subscription stored.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "data": subscription })))
}
