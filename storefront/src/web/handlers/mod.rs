// storefront/src/web/handlers/mod.rs

pub mod earning_handlers;
pub mod event_handlers;
pub mod order_handlers;
pub mod push_handlers;
pub mod store_handlers;

use crate::errors::{AppError, Result};
use crate::models::Store;
use crate::state::AppState;
use crate::services::authorization::authorize_store_member;
use uuid::Uuid;

pub(crate) async fn load_store(app_state: &AppState, store_id: Uuid) -> Result<Store> {
  app_state
    .repository
    .find_store(store_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Store {} not found", store_id)))
}

/// The store, if `user_id` is its owner or an active employee.
pub(crate) async fn load_store_for_member(app_state: &AppState, store_id: Uuid, user_id: Uuid) -> Result<Store> {
  let store = load_store(app_state, store_id).await?;
  let employee = if store.is_owned_by(user_id) {
    None
  } else {
    app_state.repository.find_employee(store.id, user_id).await?
  };
  authorize_store_member(user_id, &store, employee.as_ref())?;
  Ok(store)
}
