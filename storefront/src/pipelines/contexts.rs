// storefront/src/pipelines/contexts.rs

//! Data carried through pipeline runs. Handlers receive it wrapped in `flowline::ContextData`.

use crate::models::{NewNotification, Order, OrderStatus, Store};
use crate::repository::Transition;
use crate::services::authorization::Authorization;
use crate::state::AppState;
use uuid::Uuid;

#[derive(Clone)]
pub struct StatusChangeCtxData {
  pub app_state: AppState,
  pub actor_id: Uuid,
  pub order_id: Uuid,
  /// As sent by the client; may be a localized alias.
  pub requested_status: String,
  pub skip_notification: bool,

  pub target_status: Option<OrderStatus>,
  pub order: Option<Order>,
  pub store: Option<Store>,
  pub authorization: Option<Authorization>,
  pub planned: Vec<NewNotification>,
  pub transition: Option<Transition>,
  pub realtime_listeners: usize,
}

impl StatusChangeCtxData {
  pub fn new(app_state: AppState, actor_id: Uuid, order_id: Uuid, requested_status: String, skip_notification: bool) -> Self {
    Self {
      app_state,
      actor_id,
      order_id,
      requested_status,
      skip_notification,
      target_status: None,
      order: None,
      store: None,
      authorization: None,
      planned: Vec::new(),
      transition: None,
      realtime_listeners: 0,
    }
  }
}
