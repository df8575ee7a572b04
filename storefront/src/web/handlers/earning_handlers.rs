// storefront/src/web/handlers/earning_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::EarningStatus;
use crate::services::commission::change_earning_status;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct EarningStatusRequest {
  pub status: EarningStatus,
}

#[instrument(name = "handler::earning_status", skip(app_state, auth_user, req_payload), fields(user_id = %auth_user.user_id))]
pub async fn update_earning_status_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<EarningStatusRequest>,
) -> Result<HttpResponse, AppError> {
  let earning = change_earning_status(
    app_state.repository.as_ref(),
    &app_state.realtime,
    auth_user.user_id,
    path.into_inner(),
    req_payload.status,
    Utc::now(),
  )
  .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "data": earning })))
}
