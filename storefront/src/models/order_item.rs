// storefront/src/models/order_item.rs

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAddon {
  pub name: String,
  #[serde(default = "one")]
  pub quantity: i32,
  #[serde(default)]
  pub price_cents: i64,
}

fn one() -> i32 {
  1
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  pub unit_price_cents: i64,
  pub addons: Json<Vec<ItemAddon>>,
  /// Flavor names for split items (e.g. half-and-half pizzas).
  pub flavors: Json<Vec<String>>,
  pub notes: Option<String>,
}

impl OrderItem {
  /// Line total including addons, which are priced per unit of the item.
  pub fn line_total_cents(&self) -> i64 {
    let addons_per_unit: i64 = self.addons.iter().map(|a| a.price_cents * i64::from(a.quantity)).sum();
    (self.unit_price_cents + addons_per_unit) * i64::from(self.quantity)
  }
}
