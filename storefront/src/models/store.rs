// storefront/src/models/store.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Store {
  pub id: Uuid,
  pub owner_id: Uuid,
  pub name: String,
  pub phone: String,
  pub address: Option<String>,
  /// Gateway instance the store's WhatsApp number is connected through.
  pub whatsapp_instance_id: Option<String>,
}

impl Store {
  pub fn is_owned_by(&self, user_id: Uuid) -> bool {
    self.owner_id == user_id
  }
}
