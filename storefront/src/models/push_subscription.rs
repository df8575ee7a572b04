// storefront/src/models/push_subscription.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PushSubscription {
  pub id: Uuid,
  pub store_id: Uuid,
  pub user_id: Uuid,
  pub endpoint: String,
  #[serde(skip_serializing)]
  pub p256dh: String,
  #[serde(skip_serializing)]
  pub auth: String,
  /// Cleared when the push service reports the endpoint gone. Rows are never deleted.
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPushSubscription {
  pub store_id: Uuid,
  pub user_id: Uuid,
  pub endpoint: String,
  pub p256dh: String,
  pub auth: String,
}
