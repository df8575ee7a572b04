// storefront/src/services/notification_dispatcher.rs

//! Delivers outbox entries written by status changes, with bounded retries.

use crate::config::{AppConfig, DispatcherConfig};
use crate::errors::{AppError, Result};
use crate::models::{NotificationKind, Order, OutboxEntry, Store};
use crate::realtime::RealtimeHub;
use crate::repository::{DeliveryFailure, Repository};
use crate::services::commission::{record_commission, CommissionOutcome};
use crate::services::message_template::{format_brl, MessageTemplate, TemplateContext};
use crate::services::phone::normalize_phone;
use crate::services::web_push::{PushMessage, PushOutcome, PushTransport};
use crate::services::whatsapp::MessageGateway;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info, instrument, warn};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

/// `base * 2^(attempts_made - 1)`, capped at one hour.
pub fn retry_delay(base: Duration, attempts_made: i32) -> Duration {
  let exponent = attempts_made.saturating_sub(1).clamp(0, 16) as u32;
  base.saturating_mul(1u32 << exponent).min(MAX_RETRY_DELAY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
  Sent,
  Skipped(&'static str),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
  pub claimed: usize,
  pub delivered: usize,
  pub skipped: usize,
  pub retried: usize,
  pub failed: usize,
}

pub struct NotificationDispatcher {
  repository: Arc<dyn Repository>,
  messages: Arc<dyn MessageGateway>,
  push: Arc<dyn PushTransport>,
  realtime: RealtimeHub,
  settings: DispatcherConfig,
  app_base_url: String,
  icon_url: String,
  wakeup: Arc<Notify>,
}

impl NotificationDispatcher {
  pub fn new(
    repository: Arc<dyn Repository>,
    messages: Arc<dyn MessageGateway>,
    push: Arc<dyn PushTransport>,
    realtime: RealtimeHub,
    config: &AppConfig,
    wakeup: Arc<Notify>,
  ) -> Self {
    Self {
      repository,
      messages,
      push,
      realtime,
      settings: config.dispatcher.clone(),
      app_base_url: config.app_base_url.trim_end_matches('/').to_string(),
      icon_url: config.push.icon_url.clone(),
      wakeup,
    }
  }

  /// Polls until `shutdown` flips to `true`, waking early when notified.
  pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
    info!(poll_interval = ?self.settings.poll_interval, "Notification dispatcher started.");
    loop {
      match self.run_once(Utc::now()).await {
        Ok(report) if report.claimed > 0 => info!(?report, "Dispatch round finished."),
        Ok(_) => {}
        Err(e) => error!(error = %e, "Dispatch round failed."),
      }
      tokio::select! {
        _ = tokio::time::sleep(self.settings.poll_interval) => {}
        _ = self.wakeup.notified() => debug!("Dispatcher woken."),
        changed = shutdown.changed() => {
          if changed.is_err() || *shutdown.borrow() {
            break;
          }
        }
      }
    }
    info!("Notification dispatcher stopped.");
  }

  /// Claims one batch of due entries and settles each of them.
  #[instrument(name = "dispatcher::run_once", skip(self))]
  pub async fn run_once(&self, now: DateTime<Utc>) -> Result<DispatchReport> {
    let entries = self
      .repository
      .claim_due_notifications(now, self.settings.batch_size, self.settings.claim_lease)
      .await?;
    let mut report = DispatchReport {
      claimed: entries.len(),
      ..DispatchReport::default()
    };

    for entry in entries {
      let outcome = self.deliver(&entry, now).await;
      if let Err(e) = self.settle(&entry, outcome, now, &mut report).await {
        // The lease brings the entry back for another round.
        error!(entry_id = %entry.id, error = %e, "Could not record delivery outcome.");
      }
    }
    Ok(report)
  }

  async fn settle(
    &self,
    entry: &OutboxEntry,
    outcome: Result<Delivery>,
    now: DateTime<Utc>,
    report: &mut DispatchReport,
  ) -> Result<()> {
    match outcome {
      Ok(Delivery::Sent) => {
        self.repository.mark_notification_delivered(entry.id, now).await?;
        report.delivered += 1;
      }
      Ok(Delivery::Skipped(reason)) => {
        debug!(entry_id = %entry.id, kind = entry.kind.as_str(), reason, "Notification skipped.");
        self.repository.mark_notification_delivered(entry.id, now).await?;
        report.skipped += 1;
      }
      Err(err) => {
        let attempts_made = entry.attempts + 1;
        if err.is_retryable() && attempts_made < self.settings.max_attempts {
          let delay = retry_delay(self.settings.retry_base, attempts_made);
          let retry_at = now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::hours(1));
          warn!(entry_id = %entry.id, kind = entry.kind.as_str(), attempts_made, error = %err, %retry_at, "Delivery failed, will retry.");
          self
            .repository
            .record_notification_failure(
              entry.id,
              DeliveryFailure {
                error: err.to_string(),
                retry_at: Some(retry_at),
              },
              now,
            )
            .await?;
          report.retried += 1;
        } else {
          error!(entry_id = %entry.id, kind = entry.kind.as_str(), attempts_made, error = %err, "Delivery failed permanently.");
          self
            .repository
            .record_notification_failure(
              entry.id,
              DeliveryFailure {
                error: err.to_string(),
                retry_at: None,
              },
              now,
            )
            .await?;
          report.failed += 1;
        }
      }
    }
    Ok(())
  }

  #[instrument(skip(self, entry, now), fields(entry_id = %entry.id, kind = entry.kind.as_str(), order_id = %entry.order_id))]
  async fn deliver(&self, entry: &OutboxEntry, now: DateTime<Utc>) -> Result<Delivery> {
    let order = self
      .repository
      .find_order(entry.order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", entry.order_id)))?;
    let store = self
      .repository
      .find_store(entry.store_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Store {} not found", entry.store_id)))?;

    match entry.kind {
      NotificationKind::WhatsappMessage => self.send_whatsapp(entry, &order, &store).await,
      NotificationKind::Push => self.send_push(entry, &order, &store, now).await,
      NotificationKind::AffiliateCommission => {
        match record_commission(self.repository.as_ref(), &self.realtime, &order, now).await? {
          CommissionOutcome::Created(_) => Ok(Delivery::Sent),
          CommissionOutcome::AlreadyRecorded(_) => Ok(Delivery::Skipped("commission already recorded")),
          CommissionOutcome::NotApplicable(reason) => Ok(Delivery::Skipped(reason)),
        }
      }
    }
  }

  async fn send_whatsapp(&self, entry: &OutboxEntry, order: &Order, store: &Store) -> Result<Delivery> {
    let config = self.repository.find_status_config(store.id, entry.status).await?;
    let Some(source) = config
      .filter(|c| c.is_active)
      .and_then(|c| c.message_template)
      .filter(|t| !t.trim().is_empty())
    else {
      return Ok(Delivery::Skipped("no active message template"));
    };
    let Some(instance_id) = store.whatsapp_instance_id.as_deref().filter(|id| !id.trim().is_empty()) else {
      return Ok(Delivery::Skipped("store has no WhatsApp instance"));
    };

    let template = MessageTemplate::parse(&source)?;
    let items = self.repository.list_order_items(order.id).await?;
    let text = template.render(&TemplateContext {
      order,
      store,
      items: &items,
    });
    let number = normalize_phone(&order.customer_phone)
      .ok_or_else(|| AppError::Validation("Customer phone has no digits".to_string()))?;

    self.messages.send_text(instance_id, &number, &text).await?;
    Ok(Delivery::Sent)
  }

  async fn send_push(&self, entry: &OutboxEntry, order: &Order, store: &Store, now: DateTime<Utc>) -> Result<Delivery> {
    let subscriptions = self.repository.list_active_push_subscriptions(store.id).await?;
    if subscriptions.is_empty() {
      return Ok(Delivery::Skipped("no active push subscriptions"));
    }

    let label = self
      .repository
      .find_status_config(store.id, entry.status)
      .await?
      .filter(|c| c.is_active)
      .map(|c| c.label)
      .unwrap_or_else(|| entry.status.default_label().to_string());
    let message = PushMessage {
      title: format!("Pedido #{} - {}", order.order_number, label),
      body: format!("{} - {}", order.customer_name, format_brl(order.total_cents)),
      url: format!("{}/dashboard/orders/{}", self.app_base_url, order.id),
      icon: self.icon_url.clone(),
      tag: format!("order-{}", order.id),
      order_id: order.id,
      store_id: store.id,
    };

    let sends = subscriptions.iter().map(|subscription| {
      let message = &message;
      async move { (subscription, self.push.send(subscription, message).await) }
    });
    let outcomes = join_all(sends).await;

    let (mut delivered, mut gone, mut failed) = (0usize, 0usize, 0usize);
    for (subscription, outcome) in outcomes {
      match outcome {
        PushOutcome::Delivered => delivered += 1,
        PushOutcome::Gone => {
          gone += 1;
          if let Err(e) = self.repository.deactivate_push_subscription(subscription.id, now).await {
            error!(subscription_id = %subscription.id, error = %e, "Could not deactivate expired subscription.");
          }
        }
        PushOutcome::Failed(reason) => {
          failed += 1;
          warn!(subscription_id = %subscription.id, %reason, "Push not delivered.");
        }
      }
    }
    info!(delivered, gone, failed, "Push round finished.");
    Ok(Delivery::Sent)
  }
}
