// storefront/src/repository/mod.rs

//! Persistence seam between the service and the database.

pub mod memory;
pub mod postgres;

use crate::errors::{AppError, Result};
use crate::models::{
  AffiliateEarning, EarningStatus, NewAffiliateEarning, NewNotification, NewPushSubscription, Order, OrderItem,
  OrderSnapshot, OrderStatus, OrderStatusConfig, OutboxEntry, PushSubscription, Store, StoreAffiliate, StoreEmployee,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// A requested status write together with the outbox entries it should produce.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
  pub order_id: Uuid,
  pub target: OrderStatus,
  /// Sets `app.suppress_notifications` for the transaction and writes no outbox entries.
  pub suppress_notifications: bool,
  pub planned: Vec<NewNotification>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
  pub snapshot: OrderSnapshot,
  pub previous: OrderStatus,
  /// Outbox entries written in the same transaction.
  pub enqueued: usize,
}

impl Transition {
  pub fn changed(&self) -> bool {
    self.previous != self.snapshot.status
  }
}

/// What happened to a failed delivery attempt.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
  pub error: String,
  /// `None` gives up on the entry.
  pub retry_at: Option<DateTime<Utc>>,
}

/// Terminal orders keep their status. Re-applying the current status is allowed.
pub fn ensure_transition_allowed(previous: OrderStatus, target: OrderStatus) -> Result<()> {
  if previous.is_terminal() && previous != target {
    return Err(AppError::InvalidTransition(format!(
      "Order is already {} and cannot move to {}",
      previous, target
    )));
  }
  Ok(())
}

#[async_trait]
pub trait Repository: Send + Sync {
  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>>;
  async fn list_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;
  async fn find_store(&self, store_id: Uuid) -> Result<Option<Store>>;
  async fn find_employee(&self, store_id: Uuid, user_id: Uuid) -> Result<Option<StoreEmployee>>;

  /// Configs ordered by `sort_order`.
  async fn list_status_configs(&self, store_id: Uuid) -> Result<Vec<OrderStatusConfig>>;
  async fn find_status_config(&self, store_id: Uuid, status: OrderStatus) -> Result<Option<OrderStatusConfig>>;

  /// Writes the status (and, when it changed and nothing is suppressed, the planned
  /// outbox entries) atomically under a row lock on the order.
  async fn commit_transition(&self, request: TransitionRequest) -> Result<Transition>;

  /// Pending entries due at `now`, hidden from other claimers for `lease`.
  async fn claim_due_notifications(&self, now: DateTime<Utc>, limit: i64, lease: Duration) -> Result<Vec<OutboxEntry>>;
  async fn mark_notification_delivered(&self, entry_id: Uuid, now: DateTime<Utc>) -> Result<()>;
  async fn record_notification_failure(&self, entry_id: Uuid, failure: DeliveryFailure, now: DateTime<Utc>) -> Result<()>;
  async fn list_notifications(&self, order_id: Uuid) -> Result<Vec<OutboxEntry>>;

  async fn list_active_push_subscriptions(&self, store_id: Uuid) -> Result<Vec<PushSubscription>>;
  async fn deactivate_push_subscription(&self, subscription_id: Uuid, now: DateTime<Utc>) -> Result<()>;
  /// Inserts, or reactivates and refreshes the keys of the row with the same endpoint.
  async fn upsert_push_subscription(&self, subscription: NewPushSubscription, now: DateTime<Utc>) -> Result<PushSubscription>;

  async fn find_store_affiliate(&self, store_affiliate_id: Uuid) -> Result<Option<StoreAffiliate>>;
  /// `None` when an earning for the order already exists.
  async fn insert_affiliate_earning(&self, earning: NewAffiliateEarning, now: DateTime<Utc>) -> Result<Option<AffiliateEarning>>;
  async fn find_affiliate_earning(&self, earning_id: Uuid) -> Result<Option<AffiliateEarning>>;
  async fn find_affiliate_earning_for_order(&self, order_id: Uuid) -> Result<Option<AffiliateEarning>>;
  /// Compare-and-set on the current status. `None` when it no longer is `from`.
  async fn update_affiliate_earning_status(
    &self,
    earning_id: Uuid,
    from: EarningStatus,
    to: EarningStatus,
    now: DateTime<Utc>,
  ) -> Result<Option<AffiliateEarning>>;
}

pub(crate) fn lease_until(now: DateTime<Utc>, lease: Duration) -> DateTime<Utc> {
  now + chrono::Duration::from_std(lease).unwrap_or_else(|_| chrono::Duration::seconds(60))
}
