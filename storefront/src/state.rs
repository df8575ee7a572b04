// storefront/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::realtime::RealtimeHub;
use crate::repository::Repository;
use flowline::Flowline;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct AppState {
  pub repository: Arc<dyn Repository>,
  pub flowline: Arc<Flowline<AppError>>,
  pub config: Arc<AppConfig>,
  pub realtime: RealtimeHub,
  /// Shared with the notification dispatcher; poked after entries are enqueued.
  pub dispatcher_wakeup: Arc<Notify>,
}
