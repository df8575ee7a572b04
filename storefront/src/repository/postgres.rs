// storefront/src/repository/postgres.rs

use super::{ensure_transition_allowed, lease_until, DeliveryFailure, Repository, Transition, TransitionRequest};
use crate::errors::{AppError, Result};
use crate::models::{
  AffiliateEarning, EarningStatus, NewAffiliateEarning, NewPushSubscription, Order, OrderItem, OrderSnapshot,
  OrderStatus, OrderStatusConfig, OutboxEntry, PushSubscription, Store, StoreAffiliate, StoreEmployee,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, store_id, order_number, customer_name, customer_phone, delivery_type, \
  delivery_address, payment_method, change_for_cents, subtotal_cents, delivery_fee_cents, total_cents, notes, \
  status, store_affiliate_id, created_at, updated_at";

const OUTBOX_COLUMNS: &str =
  "id, kind, order_id, store_id, status, attempts, last_error, next_attempt_at, created_at, delivered_at, failed_at";

const EARNING_COLUMNS: &str = "id, store_affiliate_id, store_id, order_id, amount_cents, status, created_at, updated_at";

const SUBSCRIPTION_COLUMNS: &str = "id, store_id, user_id, endpoint, p256dh, auth, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PgRepository {
  pool: PgPool,
}

impl PgRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl Repository for PgRepository {
  async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    Ok(sqlx::query_as::<_, Order>(&sql).bind(order_id).fetch_optional(&self.pool).await?)
  }

  async fn list_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    Ok(
      sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_name, quantity, unit_price_cents, addons, flavors, notes \
         FROM order_items WHERE order_id = $1 ORDER BY created_at, id",
      )
      .bind(order_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn find_store(&self, store_id: Uuid) -> Result<Option<Store>> {
    Ok(
      sqlx::query_as::<_, Store>("SELECT id, owner_id, name, phone, address, whatsapp_instance_id FROM stores WHERE id = $1")
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_employee(&self, store_id: Uuid, user_id: Uuid) -> Result<Option<StoreEmployee>> {
    Ok(
      sqlx::query_as::<_, StoreEmployee>(
        "SELECT id, store_id, user_id, is_active, permissions FROM store_employees WHERE store_id = $1 AND user_id = $2",
      )
      .bind(store_id)
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn list_status_configs(&self, store_id: Uuid) -> Result<Vec<OrderStatusConfig>> {
    Ok(
      sqlx::query_as::<_, OrderStatusConfig>(
        "SELECT id, store_id, status_key, label, color, sort_order, is_active, message_template \
         FROM order_status_configs WHERE store_id = $1 ORDER BY sort_order, id",
      )
      .bind(store_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn find_status_config(&self, store_id: Uuid, status: OrderStatus) -> Result<Option<OrderStatusConfig>> {
    Ok(
      sqlx::query_as::<_, OrderStatusConfig>(
        "SELECT id, store_id, status_key, label, color, sort_order, is_active, message_template \
         FROM order_status_configs WHERE store_id = $1 AND status_key = $2",
      )
      .bind(store_id)
      .bind(status)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  #[instrument(name = "PgRepository::commit_transition", skip(self, request), fields(order_id = %request.order_id, target = %request.target))]
  async fn commit_transition(&self, request: TransitionRequest) -> Result<Transition> {
    let mut tx = self.pool.begin().await?;

    if request.suppress_notifications {
      // Transaction-local, so pooled connections never carry it into other requests.
      sqlx::query("SELECT set_config('app.suppress_notifications', 'on', true)")
        .execute(&mut *tx)
        .await?;
    }

    let previous: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
      .bind(request.order_id)
      .fetch_optional(&mut *tx)
      .await?;
    let previous = previous.ok_or_else(|| AppError::NotFound(format!("Order {} not found", request.order_id)))?;
    ensure_transition_allowed(previous, request.target)?;

    let snapshot = sqlx::query_as::<_, OrderSnapshot>(
      "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING id, status, updated_at",
    )
    .bind(request.order_id)
    .bind(request.target)
    .fetch_one(&mut *tx)
    .await?;

    let mut enqueued = 0;
    if !request.suppress_notifications && previous != request.target {
      for planned in &request.planned {
        sqlx::query(
          "INSERT INTO notification_outbox (id, kind, order_id, store_id, status, next_attempt_at) \
           VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(planned.kind)
        .bind(planned.order_id)
        .bind(planned.store_id)
        .bind(planned.status)
        .execute(&mut *tx)
        .await?;
        enqueued += 1;
      }
    }

    tx.commit().await?;
    debug!(%previous, enqueued, "Status committed.");
    Ok(Transition {
      snapshot,
      previous,
      enqueued,
    })
  }

  async fn claim_due_notifications(&self, now: DateTime<Utc>, limit: i64, lease: Duration) -> Result<Vec<OutboxEntry>> {
    // Pushing next_attempt_at forward is the claim; a crashed dispatcher's entries reappear after the lease.
    let sql = format!(
      "UPDATE notification_outbox SET next_attempt_at = $2 \
       WHERE id IN ( \
         SELECT id FROM notification_outbox \
         WHERE delivered_at IS NULL AND failed_at IS NULL AND next_attempt_at <= $1 \
         ORDER BY next_attempt_at LIMIT $3 FOR UPDATE SKIP LOCKED) \
       RETURNING {}",
      OUTBOX_COLUMNS
    );
    let mut claimed = sqlx::query_as::<_, OutboxEntry>(&sql)
      .bind(now)
      .bind(lease_until(now, lease))
      .bind(limit)
      .fetch_all(&self.pool)
      .await?;
    claimed.sort_by_key(|e| e.created_at);
    Ok(claimed)
  }

  async fn mark_notification_delivered(&self, entry_id: Uuid, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE notification_outbox SET attempts = attempts + 1, delivered_at = $2 WHERE id = $1")
      .bind(entry_id)
      .bind(now)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn record_notification_failure(&self, entry_id: Uuid, failure: DeliveryFailure, now: DateTime<Utc>) -> Result<()> {
    let query = match failure.retry_at {
      Some(retry_at) => sqlx::query(
        "UPDATE notification_outbox SET attempts = attempts + 1, last_error = $2, next_attempt_at = $3 WHERE id = $1",
      )
      .bind(entry_id)
      .bind(failure.error)
      .bind(retry_at),
      None => sqlx::query(
        "UPDATE notification_outbox SET attempts = attempts + 1, last_error = $2, failed_at = $3 WHERE id = $1",
      )
      .bind(entry_id)
      .bind(failure.error)
      .bind(now),
    };
    query.execute(&self.pool).await?;
    Ok(())
  }

  async fn list_notifications(&self, order_id: Uuid) -> Result<Vec<OutboxEntry>> {
    let sql = format!(
      "SELECT {} FROM notification_outbox WHERE order_id = $1 ORDER BY created_at",
      OUTBOX_COLUMNS
    );
    Ok(sqlx::query_as::<_, OutboxEntry>(&sql).bind(order_id).fetch_all(&self.pool).await?)
  }

  async fn list_active_push_subscriptions(&self, store_id: Uuid) -> Result<Vec<PushSubscription>> {
    let sql = format!(
      "SELECT {} FROM push_subscriptions WHERE store_id = $1 AND is_active",
      SUBSCRIPTION_COLUMNS
    );
    Ok(sqlx::query_as::<_, PushSubscription>(&sql).bind(store_id).fetch_all(&self.pool).await?)
  }

  async fn deactivate_push_subscription(&self, subscription_id: Uuid, now: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE push_subscriptions SET is_active = FALSE, updated_at = $2 WHERE id = $1")
      .bind(subscription_id)
      .bind(now)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn upsert_push_subscription(&self, subscription: NewPushSubscription, now: DateTime<Utc>) -> Result<PushSubscription> {
    let sql = format!(
      "INSERT INTO push_subscriptions (id, store_id, user_id, endpoint, p256dh, auth, is_active, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $7) \
       ON CONFLICT (endpoint) DO UPDATE SET store_id = EXCLUDED.store_id, user_id = EXCLUDED.user_id, \
         p256dh = EXCLUDED.p256dh, auth = EXCLUDED.auth, is_active = TRUE, updated_at = EXCLUDED.updated_at \
       RETURNING {}",
      SUBSCRIPTION_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, PushSubscription>(&sql)
        .bind(Uuid::new_v4())
        .bind(subscription.store_id)
        .bind(subscription.user_id)
        .bind(subscription.endpoint)
        .bind(subscription.p256dh)
        .bind(subscription.auth)
        .bind(now)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn find_store_affiliate(&self, store_affiliate_id: Uuid) -> Result<Option<StoreAffiliate>> {
    Ok(
      sqlx::query_as::<_, StoreAffiliate>(
        "SELECT id, store_id, affiliate_id, commission_rate_bps, is_active FROM store_affiliates WHERE id = $1",
      )
      .bind(store_affiliate_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn insert_affiliate_earning(&self, earning: NewAffiliateEarning, now: DateTime<Utc>) -> Result<Option<AffiliateEarning>> {
    let sql = format!(
      "INSERT INTO affiliate_earnings (id, store_affiliate_id, store_id, order_id, amount_cents, status, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, 'pending', $6, $6) \
       ON CONFLICT (order_id) DO NOTHING RETURNING {}",
      EARNING_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, AffiliateEarning>(&sql)
        .bind(Uuid::new_v4())
        .bind(earning.store_affiliate_id)
        .bind(earning.store_id)
        .bind(earning.order_id)
        .bind(earning.amount_cents)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_affiliate_earning(&self, earning_id: Uuid) -> Result<Option<AffiliateEarning>> {
    let sql = format!("SELECT {} FROM affiliate_earnings WHERE id = $1", EARNING_COLUMNS);
    Ok(sqlx::query_as::<_, AffiliateEarning>(&sql).bind(earning_id).fetch_optional(&self.pool).await?)
  }

  async fn find_affiliate_earning_for_order(&self, order_id: Uuid) -> Result<Option<AffiliateEarning>> {
    let sql = format!("SELECT {} FROM affiliate_earnings WHERE order_id = $1", EARNING_COLUMNS);
    Ok(sqlx::query_as::<_, AffiliateEarning>(&sql).bind(order_id).fetch_optional(&self.pool).await?)
  }

  async fn update_affiliate_earning_status(
    &self,
    earning_id: Uuid,
    from: EarningStatus,
    to: EarningStatus,
    now: DateTime<Utc>,
  ) -> Result<Option<AffiliateEarning>> {
    let sql = format!(
      "UPDATE affiliate_earnings SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2 RETURNING {}",
      EARNING_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, AffiliateEarning>(&sql)
        .bind(earning_id)
        .bind(from)
        .bind(to)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?,
    )
  }
}
