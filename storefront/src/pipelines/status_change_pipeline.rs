// storefront/src/pipelines/status_change_pipeline.rs

use crate::errors::AppError;
use crate::models::{NewNotification, NotificationKind, Order, OrderStatus};
use crate::pipelines::contexts::StatusChangeCtxData;
use crate::realtime::{ChangeEvent, ChangeTable};
use crate::repository::TransitionRequest;
use crate::services::authorization::authorize_status_change;
use crate::services::status_normalizer::normalize_status;
use crate::state::AppState;
use flowline::{ContextData, Flowline, Pipeline, PipelineControl, StepDef};
use std::sync::Arc;
use tracing::{debug, info};

/// Side effects owed to a status change that actually happened.
pub fn plan_notifications(order: &Order, target: OrderStatus) -> Vec<NewNotification> {
  let entry = |kind| NewNotification {
    kind,
    order_id: order.id,
    store_id: order.store_id,
    status: target,
  };
  let mut planned = vec![entry(NotificationKind::WhatsappMessage), entry(NotificationKind::Push)];
  if target == OrderStatus::Delivered && order.store_affiliate_id.is_some() {
    planned.push(entry(NotificationKind::AffiliateCommission));
  }
  planned
}

fn missing(what: &str) -> AppError {
  AppError::Internal(format!("status change pipeline reached a step without {}", what))
}

pub fn build_status_change_pipeline() -> Pipeline<StatusChangeCtxData, AppError> {
  let mut p = Pipeline::<StatusChangeCtxData, AppError>::new(vec![
    StepDef::required("normalize_status"),
    StepDef::required("load_order"),
    StepDef::required("authorize_actor"),
    StepDef::required("plan_notifications").skip_if(|ctx: &ContextData<StatusChangeCtxData>| ctx.read().skip_notification),
    StepDef::required("commit_status"),
    StepDef::optional("publish_realtime")
      .tolerate_failures()
      .skip_if(|ctx: &ContextData<StatusChangeCtxData>| !ctx.read().transition.as_ref().is_some_and(|t| t.changed())),
    StepDef::optional("wake_dispatcher")
      .tolerate_failures()
      .skip_if(|ctx: &ContextData<StatusChangeCtxData>| ctx.read().transition.as_ref().map_or(0, |t| t.enqueued) == 0),
  ]);

  p.on("normalize_status", |ctx: ContextData<StatusChangeCtxData>| async move {
    let raw = ctx.read().requested_status.clone();
    let status = normalize_status(&raw)?;
    if status.as_str() != raw {
      debug!(alias = %raw, %status, "Status alias normalized.");
    }
    ctx.write().target_status = Some(status);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("load_order", |ctx: ContextData<StatusChangeCtxData>| async move {
    let (repository, order_id) = {
      let guard = ctx.read();
      (guard.app_state.repository.clone(), guard.order_id)
    };
    let order = repository
      .find_order(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
    let store = repository
      .find_store(order.store_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Store {} not found", order.store_id)))?;
    {
      let mut guard = ctx.write();
      guard.order = Some(order);
      guard.store = Some(store);
    }
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("authorize_actor", |ctx: ContextData<StatusChangeCtxData>| async move {
    let (repository, actor_id, store, target) = {
      let guard = ctx.read();
      (
        guard.app_state.repository.clone(),
        guard.actor_id,
        guard.store.clone().ok_or_else(|| missing("a store"))?,
        guard.target_status.ok_or_else(|| missing("a target status"))?,
      )
    };
    let employee = if store.is_owned_by(actor_id) {
      None
    } else {
      repository.find_employee(store.id, actor_id).await?
    };
    let authorization = authorize_status_change(actor_id, &store, employee.as_ref(), target)?;
    debug!(?authorization, "Status change authorized.");
    ctx.write().authorization = Some(authorization);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("plan_notifications", |ctx: ContextData<StatusChangeCtxData>| async move {
    let planned = {
      let guard = ctx.read();
      let order = guard.order.as_ref().ok_or_else(|| missing("an order"))?;
      let target = guard.target_status.ok_or_else(|| missing("a target status"))?;
      plan_notifications(order, target)
    };
    ctx.write().planned = planned;
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("commit_status", |ctx: ContextData<StatusChangeCtxData>| async move {
    let (repository, request) = {
      let guard = ctx.read();
      let request = TransitionRequest {
        order_id: guard.order_id,
        target: guard.target_status.ok_or_else(|| missing("a target status"))?,
        suppress_notifications: guard.skip_notification,
        planned: guard.planned.clone(),
      };
      (guard.app_state.repository.clone(), request)
    };
    let transition = repository.commit_transition(request).await?;
    info!(
      previous = %transition.previous,
      status = %transition.snapshot.status,
      enqueued = transition.enqueued,
      "Order status committed."
    );
    ctx.write().transition = Some(transition);
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("publish_realtime", |ctx: ContextData<StatusChangeCtxData>| async move {
    let (realtime, event) = {
      let guard = ctx.read();
      let order = guard.order.as_ref().ok_or_else(|| missing("an order"))?;
      let transition = guard.transition.as_ref().ok_or_else(|| missing("a committed transition"))?;
      (
        guard.app_state.realtime.clone(),
        ChangeEvent::new(order.store_id, ChangeTable::Orders, order.id, transition.snapshot.updated_at),
      )
    };
    let listeners = realtime.publish(event);
    ctx.write().realtime_listeners = listeners;
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p.on("wake_dispatcher", |ctx: ContextData<StatusChangeCtxData>| async move {
    let wakeup = ctx.read().app_state.dispatcher_wakeup.clone();
    wakeup.notify_one();
    Ok::<_, AppError>(PipelineControl::Continue)
  });

  p
}

pub fn register_status_change_pipeline(flowline: &Arc<Flowline<AppError>>, _app_state: &AppState) {
  flowline.register_pipeline(build_status_change_pipeline());
}
