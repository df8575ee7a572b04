// storefront/tests/status_normalizer_tests.rs

use std::collections::HashMap;
use storefront::errors::AppError;
use storefront::models::OrderStatus;
use storefront::services::status_normalizer::{aliases, normalize_status};

#[test]
fn every_alias_maps_to_exactly_one_status() {
  let mut seen: HashMap<&str, OrderStatus> = HashMap::new();
  for (alias, status) in aliases() {
    if let Some(previous) = seen.insert(alias, status) {
      panic!("alias '{}' listed twice ({:?} and {:?})", alias, previous, status);
    }
    assert_eq!(normalize_status(alias).unwrap(), status, "alias '{}'", alias);
  }
}

#[test]
fn every_status_has_at_least_one_alias() {
  for status in OrderStatus::ALL {
    assert!(aliases().any(|(_, s)| s == status), "{:?} has no alias", status);
  }
}

#[test]
fn pending_aliases() {
  for raw in ["pendente", "aguardando", "novo", "em_aberto"] {
    assert_eq!(normalize_status(raw).unwrap(), OrderStatus::Pending);
  }
}

#[test]
fn accented_and_plain_spellings_agree() {
  assert_eq!(normalize_status("separação").unwrap(), normalize_status("separacao").unwrap());
  assert_eq!(normalize_status("concluído").unwrap(), normalize_status("concluido").unwrap());
  assert_eq!(normalize_status("produção").unwrap(), OrderStatus::Preparing);
}

#[test]
fn canonical_values_pass_through() {
  for status in OrderStatus::ALL {
    assert_eq!(normalize_status(status.as_str()).unwrap(), status);
  }
}

#[test]
fn lookup_is_case_sensitive() {
  assert!(matches!(normalize_status("Confirmado"), Err(AppError::InvalidStatus(_))));
  assert!(matches!(normalize_status("DELIVERED"), Err(AppError::InvalidStatus(_))));
}

#[test]
fn unknown_values_are_rejected() {
  for raw in ["", " ", "voando", "confirmado "] {
    assert!(matches!(normalize_status(raw), Err(AppError::InvalidStatus(_))), "{:?}", raw);
  }
}
