// storefront/src/services/commission.rs

use crate::errors::{AppError, Result};
use crate::models::{AffiliateEarning, EarningStatus, NewAffiliateEarning, Order, OrderStatus};
use crate::realtime::{ChangeEvent, ChangeTable, RealtimeHub};
use crate::repository::Repository;
use crate::services::authorization::require_owner;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

/// Basis points of the subtotal, rounded down to the cent.
pub fn commission_amount_cents(subtotal_cents: i64, rate_bps: i32) -> i64 {
  subtotal_cents * i64::from(rate_bps) / 10_000
}

#[derive(Debug, Clone)]
pub enum CommissionOutcome {
  Created(AffiliateEarning),
  /// The order's earning from an earlier run, republished unchanged.
  AlreadyRecorded(AffiliateEarning),
  /// No affiliate link, an inactive one, or the order is not delivered.
  NotApplicable(&'static str),
}

#[instrument(name = "commission::record", skip_all, fields(order_id = %order.id))]
pub async fn record_commission(
  repository: &dyn Repository,
  realtime: &RealtimeHub,
  order: &Order,
  now: DateTime<Utc>,
) -> Result<CommissionOutcome> {
  if order.status != OrderStatus::Delivered {
    return Ok(CommissionOutcome::NotApplicable("order is not delivered"));
  }
  let Some(link_id) = order.store_affiliate_id else {
    return Ok(CommissionOutcome::NotApplicable("order has no affiliate"));
  };
  let link = match repository.find_store_affiliate(link_id).await? {
    Some(link) if link.is_active && link.store_id == order.store_id => link,
    _ => return Ok(CommissionOutcome::NotApplicable("affiliate link is inactive")),
  };

  let earning = NewAffiliateEarning {
    store_affiliate_id: link.id,
    store_id: order.store_id,
    order_id: order.id,
    amount_cents: commission_amount_cents(order.subtotal_cents, link.commission_rate_bps),
  };
  match repository.insert_affiliate_earning(earning, now).await? {
    Some(created) => {
      info!(earning_id = %created.id, amount_cents = created.amount_cents, "Affiliate commission recorded.");
      realtime.publish(earning_changed(&created));
      Ok(CommissionOutcome::Created(created))
    }
    None => {
      let existing = repository
        .find_affiliate_earning_for_order(order.id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Earning for order {} vanished after a conflict", order.id)))?;
      // Same version as the first publish, listeners that saw it drop this one.
      realtime.publish(earning_changed(&existing));
      Ok(CommissionOutcome::AlreadyRecorded(existing))
    }
  }
}

fn earning_changed(earning: &AffiliateEarning) -> ChangeEvent {
  ChangeEvent::new(earning.store_id, ChangeTable::AffiliateEarnings, earning.id, earning.updated_at)
}

/// Owner-driven move along pending → approved → paid, or to cancelled.
#[instrument(name = "commission::change_status", skip_all, fields(%earning_id, next = next.as_str()))]
pub async fn change_earning_status(
  repository: &dyn Repository,
  realtime: &RealtimeHub,
  actor_id: Uuid,
  earning_id: Uuid,
  next: EarningStatus,
  now: DateTime<Utc>,
) -> Result<AffiliateEarning> {
  let earning = repository
    .find_affiliate_earning(earning_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Earning {} not found", earning_id)))?;
  let store = repository
    .find_store(earning.store_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Store {} not found", earning.store_id)))?;
  require_owner(actor_id, &store)?;

  if !earning.status.can_transition_to(next) {
    return Err(AppError::InvalidTransition(format!(
      "Earning cannot move from {} to {}",
      earning.status.as_str(),
      next.as_str()
    )));
  }
  let updated = repository
    .update_affiliate_earning_status(earning.id, earning.status, next, now)
    .await?
    .ok_or_else(|| AppError::InvalidTransition("Earning changed concurrently, reload and retry".to_string()))?;
  realtime.publish(earning_changed(&updated));
  Ok(updated)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn commission_is_basis_points_of_subtotal() {
    assert_eq!(commission_amount_cents(10_000, 1_000), 1_000);
    assert_eq!(commission_amount_cents(4_599, 750), 344);
    assert_eq!(commission_amount_cents(0, 1_000), 0);
  }

  #[test]
  fn earning_lifecycle_moves() {
    use EarningStatus::*;
    assert!(Pending.can_transition_to(Approved));
    assert!(Approved.can_transition_to(Paid));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Approved.can_transition_to(Cancelled));
    assert!(!Paid.can_transition_to(Cancelled));
    assert!(!Pending.can_transition_to(Paid));
    assert!(!Cancelled.can_transition_to(Pending));
  }
}
