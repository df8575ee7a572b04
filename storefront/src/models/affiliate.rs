// storefront/src/models/affiliate.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "earning_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EarningStatus {
  Pending,
  Approved,
  Paid,
  Cancelled,
}

impl EarningStatus {
  /// pending → approved → paid, and pending | approved → cancelled.
  pub fn can_transition_to(self, next: EarningStatus) -> bool {
    matches!(
      (self, next),
      (EarningStatus::Pending, EarningStatus::Approved)
        | (EarningStatus::Approved, EarningStatus::Paid)
        | (EarningStatus::Pending, EarningStatus::Cancelled)
        | (EarningStatus::Approved, EarningStatus::Cancelled)
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      EarningStatus::Pending => "pending",
      EarningStatus::Approved => "approved",
      EarningStatus::Paid => "paid",
      EarningStatus::Cancelled => "cancelled",
    }
  }
}

/// Link between a store and an affiliate who earns on attributed orders.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoreAffiliate {
  pub id: Uuid,
  pub store_id: Uuid,
  pub affiliate_id: Uuid,
  /// Commission in basis points of the order subtotal (1000 = 10%).
  pub commission_rate_bps: i32,
  pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AffiliateEarning {
  pub id: Uuid,
  pub store_affiliate_id: Uuid,
  pub store_id: Uuid,
  pub order_id: Uuid,
  pub amount_cents: i64,
  pub status: EarningStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAffiliateEarning {
  pub store_affiliate_id: Uuid,
  pub store_id: Uuid,
  pub order_id: Uuid,
  pub amount_cents: i64,
}
