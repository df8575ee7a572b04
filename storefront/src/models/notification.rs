// storefront/src/models/notification.rs

use crate::models::order::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "notification_kind_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  WhatsappMessage,
  Push,
  AffiliateCommission,
}

impl NotificationKind {
  pub fn as_str(self) -> &'static str {
    match self {
      NotificationKind::WhatsappMessage => "whatsapp_message",
      NotificationKind::Push => "push",
      NotificationKind::AffiliateCommission => "affiliate_commission",
    }
  }
}

/// A side effect to record in the outbox together with a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
  pub kind: NotificationKind,
  pub order_id: Uuid,
  pub store_id: Uuid,
  pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OutboxEntry {
  pub id: Uuid,
  pub kind: NotificationKind,
  pub order_id: Uuid,
  pub store_id: Uuid,
  /// The status the order entered when this entry was written.
  pub status: OrderStatus,
  pub attempts: i32,
  pub last_error: Option<String>,
  pub next_attempt_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
  pub delivered_at: Option<DateTime<Utc>>,
  pub failed_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
  pub fn is_pending(&self) -> bool {
    self.delivered_at.is_none() && self.failed_at.is_none()
  }
}
