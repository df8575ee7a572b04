// storefront/src/services/whatsapp.rs

use crate::config::WhatsappConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Outbound text messages through the store's connected WhatsApp instance.
#[async_trait]
pub trait MessageGateway: Send + Sync {
  async fn send_text(&self, instance_id: &str, number: &str, text: &str) -> Result<()>;
}

#[derive(Serialize)]
struct SendTextBody<'a> {
  number: &'a str,
  text: &'a str,
}

pub struct HttpMessageGateway {
  client: Client,
  api_url: String,
  api_key: String,
}

impl HttpMessageGateway {
  pub fn new(client: Client, config: &WhatsappConfig) -> Self {
    Self {
      client,
      api_url: config.api_url.trim_end_matches('/').to_string(),
      api_key: config.api_key.clone(),
    }
  }
}

#[async_trait]
impl MessageGateway for HttpMessageGateway {
  #[instrument(name = "whatsapp::send_text", skip(self, text), fields(instance_id = %instance_id))]
  async fn send_text(&self, instance_id: &str, number: &str, text: &str) -> Result<()> {
    if self.api_url.is_empty() {
      return Err(AppError::Config("WHATSAPP_API_URL is not set".to_string()));
    }
    let url = format!("{}/message/sendText/{}", self.api_url, instance_id);
    let response = self
      .client
      .post(&url)
      .header("apikey", &self.api_key)
      .json(&SendTextBody { number, text })
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!(%status, body = %body, "WhatsApp gateway rejected the message.");
      return Err(AppError::Gateway(format!("WhatsApp gateway returned {}", status)));
    }
    info!("WhatsApp message accepted by gateway.");
    Ok(())
  }
}
