// storefront/src/services/web_push.rs

//! Web push delivery signed with VAPID (ES256).

use crate::config::PushConfig;
use crate::errors::{AppError, Result};
use crate::models::PushSubscription;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

const VAPID_TOKEN_LIFETIME_HOURS: i64 = 12;

/// Payload the service worker turns into a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
  pub title: String,
  pub body: String,
  pub url: String,
  pub icon: String,
  /// Replaces an earlier notification with the same tag on the device.
  pub tag: String,
  pub order_id: Uuid,
  pub store_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
  Delivered,
  /// 404/410 from the push service: the browser dropped the subscription.
  Gone,
  Failed(String),
}

#[async_trait]
pub trait PushTransport: Send + Sync {
  async fn send(&self, subscription: &PushSubscription, message: &PushMessage) -> PushOutcome;
}

#[derive(Serialize)]
struct VapidClaims<'a> {
  aud: &'a str,
  exp: i64,
  sub: &'a str,
}

pub struct VapidPushTransport {
  client: Client,
  signing_key: Option<EncodingKey>,
  public_key: String,
  subject: String,
  ttl_secs: u32,
}

impl VapidPushTransport {
  /// An empty private key leaves push disabled; every send then fails without a request.
  pub fn new(client: Client, config: &PushConfig) -> Result<Self> {
    let signing_key = if config.vapid_private_key_pem.trim().is_empty() {
      None
    } else {
      Some(
        EncodingKey::from_ec_pem(config.vapid_private_key_pem.as_bytes())
          .map_err(|e| AppError::Config(format!("Invalid VAPID private key: {}", e)))?,
      )
    };
    Ok(Self {
      client,
      signing_key,
      public_key: config.vapid_public_key.clone(),
      subject: config.vapid_subject.clone(),
      ttl_secs: config.ttl_secs,
    })
  }

  pub fn is_enabled(&self) -> bool {
    self.signing_key.is_some()
  }

  /// `t=<jwt>, k=<public key>` for the endpoint's origin.
  pub fn authorization_header(&self, endpoint: &str, now: DateTime<Utc>) -> Result<String> {
    let key = self
      .signing_key
      .as_ref()
      .ok_or_else(|| AppError::Config("VAPID private key is not configured".to_string()))?;
    let audience = push_audience(endpoint)?;
    let claims = VapidClaims {
      aud: &audience,
      exp: (now + Duration::hours(VAPID_TOKEN_LIFETIME_HOURS)).timestamp(),
      sub: &self.subject,
    };
    let token = encode(&Header::new(Algorithm::ES256), &claims, key)
      .map_err(|e| AppError::Internal(format!("VAPID signing failed: {}", e)))?;
    Ok(format!("vapid t={}, k={}", token, self.public_key))
  }
}

/// Scheme, host and port of the push endpoint.
pub fn push_audience(endpoint: &str) -> Result<String> {
  let url = Url::parse(endpoint).map_err(|e| AppError::Validation(format!("Invalid push endpoint: {}", e)))?;
  let origin = url.origin();
  if !origin.is_tuple() {
    return Err(AppError::Validation(format!("Push endpoint has no origin: {}", endpoint)));
  }
  Ok(origin.ascii_serialization())
}

#[async_trait]
impl PushTransport for VapidPushTransport {
  #[instrument(name = "web_push::send", skip_all, fields(subscription_id = %subscription.id))]
  async fn send(&self, subscription: &PushSubscription, message: &PushMessage) -> PushOutcome {
    let authorization = match self.authorization_header(&subscription.endpoint, Utc::now()) {
      Ok(value) => value,
      Err(e) => return PushOutcome::Failed(e.to_string()),
    };

    let result = self
      .client
      .post(&subscription.endpoint)
      .header("Authorization", authorization)
      .header("TTL", self.ttl_secs.to_string())
      .header("Urgency", "high")
      .json(message)
      .send()
      .await;

    match result {
      Ok(response) => match response.status() {
        status if status.is_success() => {
          debug!(%status, "Push accepted.");
          PushOutcome::Delivered
        }
        StatusCode::NOT_FOUND | StatusCode::GONE => PushOutcome::Gone,
        status => {
          warn!(%status, "Push service refused the notification.");
          PushOutcome::Failed(format!("push service returned {}", status))
        }
      },
      Err(e) => {
        warn!(error = %e, "Push request failed.");
        PushOutcome::Failed(e.to_string())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn audience_is_the_endpoint_origin() {
    assert_eq!(
      push_audience("https://fcm.googleapis.com/fcm/send/abc123").unwrap(),
      "https://fcm.googleapis.com"
    );
    assert_eq!(
      push_audience("https://push.example.com:8443/wpush/v2/x").unwrap(),
      "https://push.example.com:8443"
    );
  }

  #[test]
  fn rejects_unparseable_endpoints() {
    assert!(matches!(push_audience("not a url"), Err(AppError::Validation(_))));
  }

  #[test]
  fn serializes_camel_case_ids() {
    let order_id = Uuid::new_v4();
    let message = PushMessage {
      title: "Pedido #7".to_string(),
      body: "Pronto".to_string(),
      url: "/dashboard".to_string(),
      icon: "/icon.png".to_string(),
      tag: "order-7".to_string(),
      order_id,
      store_id: Uuid::new_v4(),
    };
    let json = serde_json::to_value(&message).unwrap();
    assert_eq!(json["orderId"], order_id.to_string());
    assert!(json.get("storeId").is_some());
  }
}
