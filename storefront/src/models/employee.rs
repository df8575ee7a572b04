// storefront/src/models/employee.rs

use crate::models::order::OrderStatus;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const CHANGE_ANY_STATUS: &str = "change_any_status";
const CHANGE_STATUS_PREFIX: &str = "change_status_";

/// Status-change grants of one employee.
///
/// Stored as a flat JSON object, `{"change_any_status": true, "change_status_ready": false, ...}`.
/// Keys that do not name a canonical status are dropped on parse, and only a JSON
/// `true` grants anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
  pub change_any_status: bool,
  pub per_status: BTreeMap<OrderStatus, bool>,
}

impl PermissionSet {
  pub fn permission_key(status: OrderStatus) -> String {
    format!("{}{}", CHANGE_STATUS_PREFIX, status.as_str())
  }

  pub fn with_status(mut self, status: OrderStatus, granted: bool) -> Self {
    self.per_status.insert(status, granted);
    self
  }

  pub fn with_any_status(mut self, granted: bool) -> Self {
    self.change_any_status = granted;
    self
  }

  /// Absent flags deny.
  pub fn allows(&self, status: OrderStatus) -> bool {
    self.change_any_status || self.per_status.get(&status).copied().unwrap_or(false)
  }

  pub fn from_flags(flags: &Map<String, Value>) -> Self {
    let mut set = PermissionSet::default();
    for (key, value) in flags {
      let granted = matches!(value, Value::Bool(true));
      if key == CHANGE_ANY_STATUS {
        set.change_any_status = granted;
      } else if let Some(status) = key.strip_prefix(CHANGE_STATUS_PREFIX).and_then(OrderStatus::from_wire) {
        set.per_status.insert(status, granted);
      }
    }
    set
  }

  pub fn to_flags(&self) -> Map<String, Value> {
    let mut flags = Map::new();
    flags.insert(CHANGE_ANY_STATUS.to_string(), Value::Bool(self.change_any_status));
    for (status, granted) in &self.per_status {
      flags.insert(Self::permission_key(*status), Value::Bool(*granted));
    }
    flags
  }
}

impl Serialize for PermissionSet {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_flags().serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for PermissionSet {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    // Anything other than an object (null, legacy arrays) carries no grants.
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
      Value::Object(flags) => PermissionSet::from_flags(&flags),
      _ => PermissionSet::default(),
    })
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoreEmployee {
  pub id: Uuid,
  pub store_id: Uuid,
  pub user_id: Uuid,
  pub is_active: bool,
  pub permissions: Json<PermissionSet>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn parses_flat_flags_and_ignores_unknown_keys() {
    let raw = json!({
      "change_any_status": false,
      "change_status_ready": true,
      "change_status_in_delivery": false,
      "change_status_entregue": true,
      "manage_products": true,
    });
    let set: PermissionSet = serde_json::from_value(raw).unwrap();
    assert!(!set.change_any_status);
    assert!(set.allows(OrderStatus::Ready));
    assert!(!set.allows(OrderStatus::InDelivery));
    assert!(!set.allows(OrderStatus::Delivered));
    assert_eq!(set.per_status.len(), 2);
  }

  #[test]
  fn only_json_true_grants() {
    let set: PermissionSet = serde_json::from_value(json!({ "change_status_ready": "true" })).unwrap();
    assert!(!set.allows(OrderStatus::Ready));
  }

  #[test]
  fn non_object_payload_grants_nothing() {
    let set: PermissionSet = serde_json::from_value(json!(null)).unwrap();
    assert_eq!(set, PermissionSet::default());
  }

  #[test]
  fn any_status_overrides_missing_flags() {
    let set = PermissionSet::default().with_any_status(true);
    assert!(OrderStatus::ALL.iter().all(|s| set.allows(*s)));
  }

  #[test]
  fn flags_use_status_wire_names() {
    let flags = PermissionSet::default().with_status(OrderStatus::InDelivery, true).to_flags();
    assert_eq!(flags.get("change_status_in_delivery"), Some(&Value::Bool(true)));
    assert_eq!(flags.get("change_any_status"), Some(&Value::Bool(false)));
  }
}
