// storefront/src/models/status_config.rs

use crate::models::order::OrderStatus;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A store's presentation of one canonical status.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderStatusConfig {
  pub id: Uuid,
  pub store_id: Uuid,
  pub status_key: OrderStatus,
  pub label: String,
  pub color: String,
  pub sort_order: i32,
  pub is_active: bool,
  /// WhatsApp message sent to the customer when an order enters this status.
  pub message_template: Option<String>,
}
