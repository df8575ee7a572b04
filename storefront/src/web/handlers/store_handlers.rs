// storefront/src/web/handlers/store_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use super::load_store;
use crate::errors::AppError;
use crate::services::authorization::{require_owner, PermissionCatalog};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

/// Permission flags the owner can hand out, with the defaults for new employees.
#[instrument(name = "handler::permission_catalog", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn permission_catalog_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let store_id = path.into_inner();
  let store = load_store(&app_state, store_id).await?;
  require_owner(auth_user.user_id, &store)?;

  let configs = app_state.repository.list_status_configs(store.id).await?;
  let catalog = PermissionCatalog::project(&configs);
  Ok(HttpResponse::Ok().json(json!({
    "defaults": catalog.defaults(),
    "entries": catalog.entries,
  })))
}
