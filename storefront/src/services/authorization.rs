// storefront/src/services/authorization.rs

//! Who may change an order's status, and the permission flags a store offers.

use crate::errors::{AppError, Result};
use crate::models::{OrderStatus, OrderStatusConfig, PermissionSet, Store, StoreEmployee};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
  AnyStatus,
  Status(OrderStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
  Owner,
  Employee { employee_id: Uuid, grant: Grant },
}

fn active_employee<'a>(employee: Option<&'a StoreEmployee>, store: &Store) -> Result<&'a StoreEmployee> {
  match employee {
    Some(e) if e.is_active && e.store_id == store.id => Ok(e),
    Some(_) => Err(AppError::Forbidden("Employee access is inactive for this store".to_string())),
    None => Err(AppError::Forbidden("No access to this store".to_string())),
  }
}

/// Owner first, then the employee's flags. Callers pass the canonical target.
pub fn authorize_status_change(
  actor_id: Uuid,
  store: &Store,
  employee: Option<&StoreEmployee>,
  target: OrderStatus,
) -> Result<Authorization> {
  if store.is_owned_by(actor_id) {
    return Ok(Authorization::Owner);
  }
  let employee = active_employee(employee, store)?;
  let permissions = &employee.permissions.0;
  let grant = if permissions.change_any_status {
    Grant::AnyStatus
  } else if permissions.allows(target) {
    Grant::Status(target)
  } else {
    return Err(AppError::Forbidden(format!(
      "Missing permission '{}'",
      PermissionSet::permission_key(target)
    )));
  };
  Ok(Authorization::Employee {
    employee_id: employee.id,
    grant,
  })
}

/// Read access to a store's feeds: the owner or any active employee.
pub fn authorize_store_member(actor_id: Uuid, store: &Store, employee: Option<&StoreEmployee>) -> Result<()> {
  if store.is_owned_by(actor_id) {
    return Ok(());
  }
  active_employee(employee, store).map(|_| ())
}

pub fn require_owner(actor_id: Uuid, store: &Store) -> Result<()> {
  if store.is_owned_by(actor_id) {
    Ok(())
  } else {
    Err(AppError::Forbidden("Only the store owner can do this".to_string()))
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
  pub key: String,
  pub status: OrderStatus,
  pub label: String,
  pub default_granted: bool,
}

/// Permission flags projected from a store's status configuration.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionCatalog {
  pub entries: Vec<CatalogEntry>,
}

impl PermissionCatalog {
  /// Granted to new employees unless the owner says otherwise.
  pub const DEFAULT_GRANTED: [OrderStatus; 2] = [OrderStatus::Confirmed, OrderStatus::Preparing];

  /// One flag per configured status in display order. A store without configs gets
  /// the built-in statuses.
  pub fn project(configs: &[OrderStatusConfig]) -> Self {
    let mut entries: Vec<CatalogEntry> = Vec::new();
    let mut push = |status: OrderStatus, label: &str| {
      if entries.iter().any(|e| e.status == status) {
        return;
      }
      entries.push(CatalogEntry {
        key: PermissionSet::permission_key(status),
        status,
        label: label.to_string(),
        default_granted: Self::DEFAULT_GRANTED.contains(&status),
      });
    };

    if configs.is_empty() {
      for status in OrderStatus::ALL {
        push(status, status.default_label());
      }
    } else {
      let mut ordered: Vec<&OrderStatusConfig> = configs.iter().collect();
      ordered.sort_by_key(|c| c.sort_order);
      for config in ordered {
        push(config.status_key, &config.label);
      }
    }
    Self { entries }
  }

  pub fn defaults(&self) -> PermissionSet {
    self
      .entries
      .iter()
      .fold(PermissionSet::default(), |set, e| set.with_status(e.status, e.default_granted))
  }
}
