// storefront/src/repository/memory.rs

//! In-process repository with the same contract as the Postgres one.

use super::{ensure_transition_allowed, lease_until, DeliveryFailure, Repository, Transition, TransitionRequest};
use crate::errors::{AppError, Result};
use crate::models::{
  AffiliateEarning, EarningStatus, NewAffiliateEarning, NewPushSubscription, Order, OrderItem, OrderSnapshot,
  OrderStatus, OrderStatusConfig, OutboxEntry, PushSubscription, Store, StoreAffiliate, StoreEmployee,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
  stores: HashMap<Uuid, Store>,
  orders: HashMap<Uuid, Order>,
  items: Vec<OrderItem>,
  status_configs: Vec<OrderStatusConfig>,
  employees: Vec<StoreEmployee>,
  push_subscriptions: Vec<PushSubscription>,
  store_affiliates: HashMap<Uuid, StoreAffiliate>,
  earnings: Vec<AffiliateEarning>,
  outbox: Vec<OutboxEntry>,
  suppressed_commits: usize,
  fail_writes: bool,
}

impl MemoryState {
  fn check_writable(&self) -> Result<()> {
    if self.fail_writes {
      return Err(AppError::Persistence("memory repository is rejecting writes".to_string()));
    }
    Ok(())
  }

  fn outbox_entry_mut(&mut self, entry_id: Uuid) -> Result<&mut OutboxEntry> {
    self
      .outbox
      .iter_mut()
      .find(|e| e.id == entry_id)
      .ok_or_else(|| AppError::NotFound(format!("Outbox entry {} not found", entry_id)))
  }
}

/// Everything lives behind one mutex, so each call is its own transaction.
#[derive(Default)]
pub struct MemoryRepository {
  state: Mutex<MemoryState>,
}

impl MemoryRepository {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_store(&self, store: Store) {
    self.state.lock().stores.insert(store.id, store);
  }

  pub fn insert_order(&self, order: Order) {
    self.state.lock().orders.insert(order.id, order);
  }

  pub fn insert_order_item(&self, item: OrderItem) {
    self.state.lock().items.push(item);
  }

  /// Replaces any config the store already has for the same status.
  pub fn insert_status_config(&self, config: OrderStatusConfig) {
    let mut state = self.state.lock();
    state
      .status_configs
      .retain(|c| !(c.store_id == config.store_id && c.status_key == config.status_key));
    state.status_configs.push(config);
  }

  pub fn insert_employee(&self, employee: StoreEmployee) {
    self.state.lock().employees.push(employee);
  }

  pub fn insert_store_affiliate(&self, link: StoreAffiliate) {
    self.state.lock().store_affiliates.insert(link.id, link);
  }

  pub fn insert_push_subscription(&self, subscription: PushSubscription) {
    self.state.lock().push_subscriptions.push(subscription);
  }

  pub fn order(&self, order_id: Uuid) -> Option<Order> {
    self.state.lock().orders.get(&order_id).cloned()
  }

  pub fn outbox(&self) -> Vec<OutboxEntry> {
    self.state.lock().outbox.clone()
  }

  pub fn push_subscription(&self, subscription_id: Uuid) -> Option<PushSubscription> {
    self
      .state
      .lock()
      .push_subscriptions
      .iter()
      .find(|s| s.id == subscription_id)
      .cloned()
  }

  pub fn earnings(&self) -> Vec<AffiliateEarning> {
    self.state.lock().earnings.clone()
  }

  /// Number of commits that ran with notification suppression switched on.
  pub fn suppressed_commits(&self) -> usize {
    self.state.lock().suppressed_commits
  }

  /// Makes every write fail with a persistence error.
  pub fn set_fail_writes(&self, fail: bool) {
    self.state.lock().fail_writes = fail;
  }
}

#[async_trait]
impl Repository for MemoryRepository {
  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    Ok(self.state.lock().orders.get(&order_id).cloned())
  }

  async fn list_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    Ok(self.state.lock().items.iter().filter(|i| i.order_id == order_id).cloned().collect())
  }

  async fn find_store(&self, store_id: Uuid) -> Result<Option<Store>> {
    Ok(self.state.lock().stores.get(&store_id).cloned())
  }

  async fn find_employee(&self, store_id: Uuid, user_id: Uuid) -> Result<Option<StoreEmployee>> {
    Ok(
      self
        .state
        .lock()
        .employees
        .iter()
        .find(|e| e.store_id == store_id && e.user_id == user_id)
        .cloned(),
    )
  }

  async fn list_status_configs(&self, store_id: Uuid) -> Result<Vec<OrderStatusConfig>> {
    let mut configs: Vec<OrderStatusConfig> = self
      .state
      .lock()
      .status_configs
      .iter()
      .filter(|c| c.store_id == store_id)
      .cloned()
      .collect();
    configs.sort_by_key(|c| c.sort_order);
    Ok(configs)
  }

  async fn find_status_config(&self, store_id: Uuid, status: OrderStatus) -> Result<Option<OrderStatusConfig>> {
    Ok(
      self
        .state
        .lock()
        .status_configs
        .iter()
        .find(|c| c.store_id == store_id && c.status_key == status)
        .cloned(),
    )
  }

  async fn commit_transition(&self, request: TransitionRequest) -> Result<Transition> {
    let mut state = self.state.lock();
    state.check_writable()?;

    let now = Utc::now();
    let order = state
      .orders
      .get_mut(&request.order_id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", request.order_id)))?;
    let previous = order.status;
    ensure_transition_allowed(previous, request.target)?;

    order.status = request.target;
    order.updated_at = now;
    let snapshot = OrderSnapshot {
      id: order.id,
      status: order.status,
      updated_at: order.updated_at,
    };

    if request.suppress_notifications {
      state.suppressed_commits += 1;
    }

    let mut enqueued = 0;
    if !request.suppress_notifications && previous != request.target {
      for planned in request.planned {
        state.outbox.push(OutboxEntry {
          id: Uuid::new_v4(),
          kind: planned.kind,
          order_id: planned.order_id,
          store_id: planned.store_id,
          status: planned.status,
          attempts: 0,
          last_error: None,
          next_attempt_at: now,
          created_at: now,
          delivered_at: None,
          failed_at: None,
        });
        enqueued += 1;
      }
    }

    Ok(Transition {
      snapshot,
      previous,
      enqueued,
    })
  }

  async fn claim_due_notifications(&self, now: DateTime<Utc>, limit: i64, lease: Duration) -> Result<Vec<OutboxEntry>> {
    let mut state = self.state.lock();
    let hidden_until = lease_until(now, lease);
    let mut due: Vec<&mut OutboxEntry> = state
      .outbox
      .iter_mut()
      .filter(|e| e.is_pending() && e.next_attempt_at <= now)
      .collect();
    due.sort_by_key(|e| e.next_attempt_at);

    let limit = usize::try_from(limit).unwrap_or(0);
    let mut claimed = Vec::new();
    for entry in due.into_iter().take(limit) {
      claimed.push(entry.clone());
      entry.next_attempt_at = hidden_until;
    }
    Ok(claimed)
  }

  async fn mark_notification_delivered(&self, entry_id: Uuid, now: DateTime<Utc>) -> Result<()> {
    let mut state = self.state.lock();
    state.check_writable()?;
    let entry = state.outbox_entry_mut(entry_id)?;
    entry.attempts += 1;
    entry.delivered_at = Some(now);
    Ok(())
  }

  async fn record_notification_failure(&self, entry_id: Uuid, failure: DeliveryFailure, now: DateTime<Utc>) -> Result<()> {
    let mut state = self.state.lock();
    state.check_writable()?;
    let entry = state.outbox_entry_mut(entry_id)?;
    entry.attempts += 1;
    entry.last_error = Some(failure.error);
    match failure.retry_at {
      Some(retry_at) => entry.next_attempt_at = retry_at,
      None => entry.failed_at = Some(now),
    }
    Ok(())
  }

  async fn list_notifications(&self, order_id: Uuid) -> Result<Vec<OutboxEntry>> {
    Ok(self.state.lock().outbox.iter().filter(|e| e.order_id == order_id).cloned().collect())
  }

  async fn list_active_push_subscriptions(&self, store_id: Uuid) -> Result<Vec<PushSubscription>> {
    Ok(
      self
        .state
        .lock()
        .push_subscriptions
        .iter()
        .filter(|s| s.store_id == store_id && s.is_active)
        .cloned()
        .collect(),
    )
  }

  async fn deactivate_push_subscription(&self, subscription_id: Uuid, now: DateTime<Utc>) -> Result<()> {
    let mut state = self.state.lock();
    state.check_writable()?;
    if let Some(subscription) = state.push_subscriptions.iter_mut().find(|s| s.id == subscription_id) {
      subscription.is_active = false;
      subscription.updated_at = now;
    }
    Ok(())
  }

  async fn upsert_push_subscription(&self, subscription: NewPushSubscription, now: DateTime<Utc>) -> Result<PushSubscription> {
    let mut state = self.state.lock();
    state.check_writable()?;
    if let Some(existing) = state
      .push_subscriptions
      .iter_mut()
      .find(|s| s.endpoint == subscription.endpoint)
    {
      existing.store_id = subscription.store_id;
      existing.user_id = subscription.user_id;
      existing.p256dh = subscription.p256dh;
      existing.auth = subscription.auth;
      existing.is_active = true;
      existing.updated_at = now;
      return Ok(existing.clone());
    }
    let row = PushSubscription {
      id: Uuid::new_v4(),
      store_id: subscription.store_id,
      user_id: subscription.user_id,
      endpoint: subscription.endpoint,
      p256dh: subscription.p256dh,
      auth: subscription.auth,
      is_active: true,
      created_at: now,
      updated_at: now,
    };
    state.push_subscriptions.push(row.clone());
    Ok(row)
  }

  async fn find_store_affiliate(&self, store_affiliate_id: Uuid) -> Result<Option<StoreAffiliate>> {
    Ok(self.state.lock().store_affiliates.get(&store_affiliate_id).cloned())
  }

  async fn insert_affiliate_earning(&self, earning: NewAffiliateEarning, now: DateTime<Utc>) -> Result<Option<AffiliateEarning>> {
    let mut state = self.state.lock();
    state.check_writable()?;
    if state.earnings.iter().any(|e| e.order_id == earning.order_id) {
      return Ok(None);
    }
    let row = AffiliateEarning {
      id: Uuid::new_v4(),
      store_affiliate_id: earning.store_affiliate_id,
      store_id: earning.store_id,
      order_id: earning.order_id,
      amount_cents: earning.amount_cents,
      status: EarningStatus::Pending,
      created_at: now,
      updated_at: now,
    };
    state.earnings.push(row.clone());
    Ok(Some(row))
  }

  async fn find_affiliate_earning(&self, earning_id: Uuid) -> Result<Option<AffiliateEarning>> {
    Ok(self.state.lock().earnings.iter().find(|e| e.id == earning_id).cloned())
  }

  async fn find_affiliate_earning_for_order(&self, order_id: Uuid) -> Result<Option<AffiliateEarning>> {
    Ok(self.state.lock().earnings.iter().find(|e| e.order_id == order_id).cloned())
  }

  async fn update_affiliate_earning_status(
    &self,
    earning_id: Uuid,
    from: EarningStatus,
    to: EarningStatus,
    now: DateTime<Utc>,
  ) -> Result<Option<AffiliateEarning>> {
    let mut state = self.state.lock();
    state.check_writable()?;
    match state.earnings.iter_mut().find(|e| e.id == earning_id && e.status == from) {
      Some(earning) => {
        earning.status = to;
        earning.updated_at = now;
        Ok(Some(earning.clone()))
      }
      None => Ok(None),
    }
  }
}
