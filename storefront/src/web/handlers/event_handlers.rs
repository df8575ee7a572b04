// storefront/src/web/handlers/event_handlers.rs

use actix_web::{http::header, web, HttpResponse};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

use super::load_store_for_member;
use crate::errors::AppError;
use crate::realtime::{refetch_stream, EventDeduper, RefetchDebouncer};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Default, Deserialize)]
pub struct EventStreamQuery {
  /// Set by the dashboard when its tab comes back to the foreground.
  #[serde(default)]
  pub resumed: bool,
}

#[instrument(name = "handler::store_events", skip(app_state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn store_events_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  query: web::Query<EventStreamQuery>,
) -> Result<HttpResponse, AppError> {
  let store = load_store_for_member(&app_state, path.into_inner(), auth_user.user_id).await?;

  let settings = &app_state.config.realtime;
  let mut debouncer = RefetchDebouncer::new(
    settings.debounce,
    settings.visibility_grace,
    EventDeduper::new(settings.dedup_capacity, settings.dedup_window),
  );
  if query.resumed {
    debouncer.on_resume(Instant::now());
  }
  info!(store_id = %store.id, resumed = query.resumed, "Event stream opened.");

  let stream = refetch_stream(app_state.realtime.subscribe(), debouncer, store.id);
  Ok(
    HttpResponse::Ok()
      .content_type("text/event-stream")
      .insert_header((header::CACHE_CONTROL, "no-cache"))
      .streaming(stream),
  )
}
