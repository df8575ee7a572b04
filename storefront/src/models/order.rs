// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// The closed set of order states. Nothing else is ever written to `orders.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Preparing,
  Ready,
  InDelivery,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 7] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::InDelivery,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  /// Wire value, e.g. `in_delivery`.
  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Preparing => "preparing",
      OrderStatus::Ready => "ready",
      OrderStatus::InDelivery => "in_delivery",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  /// Exact match on the canonical wire value only. Aliases go through the normalizer.
  pub fn from_wire(value: &str) -> Option<OrderStatus> {
    OrderStatus::ALL.into_iter().find(|s| s.as_str() == value)
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }

  /// Label used when a store has no config for this status.
  pub fn default_label(self) -> &'static str {
    match self {
      OrderStatus::Pending => "Pendente",
      OrderStatus::Confirmed => "Confirmado",
      OrderStatus::Preparing => "Em preparo",
      OrderStatus::Ready => "Pronto",
      OrderStatus::InDelivery => "Saiu para entrega",
      OrderStatus::Delivered => "Entregue",
      OrderStatus::Cancelled => "Cancelado",
    }
  }
}

impl std::fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "delivery_type_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
  Pickup,
  Delivery,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub store_id: Uuid,
  /// Per-store number shown to customers.
  pub order_number: i64,
  pub customer_name: String,
  pub customer_phone: String,
  pub delivery_type: DeliveryType,
  pub delivery_address: Option<String>,
  pub payment_method: String,
  /// Bill the customer pays cash with, when change is needed.
  pub change_for_cents: Option<i64>,
  pub subtotal_cents: i64,
  pub delivery_fee_cents: i64,
  pub total_cents: i64,
  pub notes: Option<String>,
  pub status: OrderStatus,
  /// Set when the sale is attributed to an affiliate of the store.
  pub store_affiliate_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// What the status endpoint reports back after a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct OrderSnapshot {
  pub id: Uuid,
  pub status: OrderStatus,
  pub updated_at: DateTime<Utc>,
}
