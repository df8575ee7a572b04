// storefront/src/services/phone.rs

const COUNTRY_CODE: &str = "55";

/// Digits-only number with the Brazilian country code, as the gateway expects.
///
/// Eleven digits or fewer is a national number (area code 55 included), so the
/// country code is added. `None` when nothing dial-able is left.
pub fn normalize_phone(raw: &str) -> Option<String> {
  let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
  if digits.is_empty() {
    return None;
  }
  if digits.starts_with(COUNTRY_CODE) && digits.len() >= 12 {
    Some(digits)
  } else {
    Some(format!("{}{}", COUNTRY_CODE, digits))
  }
}
