// storefront/src/pipelines/mod.rs

//! Defines and registers the flowline pipelines used by the service.

use crate::errors::AppError;
use crate::state::AppState;
use flowline::Flowline;
use std::sync::Arc;

pub mod contexts;
pub mod status_change_pipeline;

/// Called once at startup, before the server accepts requests.
pub fn register_all_pipelines(flowline: &Arc<Flowline<AppError>>, app_state: &AppState) {
  tracing::info!("Registering pipelines...");
  status_change_pipeline::register_status_change_pipeline(flowline, app_state);
  tracing::info!(count = flowline.len(), "All application pipelines registered.");
}
