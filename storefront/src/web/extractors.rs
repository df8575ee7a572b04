// storefront/src/web/extractors.rs

use crate::errors::{AppError, Result};
use crate::state::AppState;
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Claims of access tokens minted by the auth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
  pub sub: Uuid,
  pub exp: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

/// Verifies an `Authorization: Bearer <jwt>` header value (HS256, expiry checked).
pub fn verify_bearer(header_value: Option<&str>, secret: &str) -> Result<AccessClaims> {
  let header_value = header_value.ok_or_else(|| AppError::Unauthenticated("Missing Authorization header".to_string()))?;
  let token = header_value
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| AppError::Unauthenticated("Invalid token format".to_string()))?;

  let mut validation = Validation::new(Algorithm::HS256);
  validation.validate_aud = false;
  let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
    .map_err(|e| AppError::Unauthenticated(format!("Invalid token: {}", e)))?;
  Ok(data.claims)
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
      return ready(Err(AppError::Internal("Application state is not configured".to_string())));
    };
    let header_value = req.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let result = verify_bearer(header_value, &state.config.jwt_secret).map(|claims| AuthenticatedUser { user_id: claims.sub });
    if let Err(e) = &result {
      warn!(error = %e, "Rejected bearer token.");
    }
    ready(result)
  }
}
