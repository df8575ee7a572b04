// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use flowline::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::StatusChangeCtxData;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
  pub order_id: Uuid,
  pub status: String,
  #[serde(default)]
  pub skip_notification: bool,
}

#[instrument(
  name = "handler::update_order_status",
  skip(app_state, req_payload, auth_user),
  fields(user_id = %auth_user.user_id, order_id = %req_payload.order_id, status = %req_payload.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(StatusChangeCtxData::new(
    app_state.get_ref().clone(),
    auth_user.user_id,
    payload.order_id,
    payload.status,
    payload.skip_notification,
  ));

  match app_state.flowline.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx.read();
      let transition = guard
        .transition
        .as_ref()
        .ok_or_else(|| AppError::Internal("Status change finished without a committed transition".to_string()))?;
      info!(
        changed = transition.changed(),
        enqueued = transition.enqueued,
        "Order status updated."
      );
      Ok(HttpResponse::Ok().json(json!({ "success": true, "data": transition.snapshot })))
    }
    PipelineResult::Stopped { step } => {
      warn!(%step, "Status change pipeline stopped early.");
      Err(AppError::Internal(format!("Status change halted at step '{}'", step)))
    }
  }
}
