// storefront/tests/dispatcher_tests.rs

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{subscription, Fixture};
use std::time::Duration;
use tokio::time::Instant;
use storefront::models::{NewNotification, NotificationKind, OrderStatus, OutboxEntry};
use storefront::realtime::{ChangeTable, EventDeduper};
use storefront::repository::{Repository, TransitionRequest};
use storefront::services::notification_dispatcher::DispatchReport;
use storefront::services::web_push::PushOutcome;

/// Commits `target` as the owner would and returns the entries written.
async fn enqueue(fx: &Fixture, target: OrderStatus, kinds: &[NotificationKind]) -> Vec<OutboxEntry> {
  let planned = kinds
    .iter()
    .map(|kind| NewNotification {
      kind: *kind,
      order_id: fx.order.id,
      store_id: fx.store.id,
      status: target,
    })
    .collect();
  fx.repo
    .commit_transition(TransitionRequest {
      order_id: fx.order.id,
      target,
      suppress_notifications: false,
      planned,
    })
    .await
    .unwrap();
  fx.repo.list_notifications(fx.order.id).await.unwrap()
}

#[tokio::test]
async fn gateway_failure_is_retried_with_backoff() {
  let fx = Fixture::new();
  enqueue(&fx, OrderStatus::Confirmed, &[NotificationKind::WhatsappMessage]).await;
  fx.messages.fail_next(1);

  let now = Utc::now();
  let report = fx.dispatcher.run_once(now).await.unwrap();
  assert_eq!(report, DispatchReport { claimed: 1, retried: 1, ..Default::default() });

  let entry = fx.repo.outbox().remove(0);
  assert_eq!(entry.attempts, 1);
  assert!(entry.is_pending());
  assert_eq!(entry.next_attempt_at, now + ChronoDuration::seconds(30));
  assert!(entry.last_error.unwrap().contains("gateway unavailable"));

  let early = fx.dispatcher.run_once(now + ChronoDuration::seconds(10)).await.unwrap();
  assert_eq!(early.claimed, 0);

  let later = fx.dispatcher.run_once(now + ChronoDuration::seconds(31)).await.unwrap();
  assert_eq!(later.delivered, 1);
  assert_eq!(fx.messages.sent().len(), 1);
  let entry = fx.repo.outbox().remove(0);
  assert_eq!(entry.attempts, 2);
  assert!(entry.delivered_at.is_some());
}

#[tokio::test]
async fn entry_fails_permanently_after_max_attempts() {
  let fx = Fixture::new();
  enqueue(&fx, OrderStatus::Confirmed, &[NotificationKind::WhatsappMessage]).await;
  fx.messages.fail_next(10);

  let mut now = Utc::now();
  for _ in 0..3 {
    fx.dispatcher.run_once(now).await.unwrap();
    now += ChronoDuration::hours(2);
  }
  let entry = fx.repo.outbox().remove(0);
  assert_eq!(entry.attempts, 3);
  assert!(entry.failed_at.is_some());

  let after = fx.dispatcher.run_once(now).await.unwrap();
  assert_eq!(after.claimed, 0);
}

#[tokio::test]
async fn unusable_phone_fails_without_retry() {
  let fx = Fixture::new();
  let mut order = fx.repo.order(fx.order.id).unwrap();
  order.customer_phone = "não informado".to_string();
  fx.repo.insert_order(order);
  enqueue(&fx, OrderStatus::Confirmed, &[NotificationKind::WhatsappMessage]).await;

  let report = fx.dispatcher.run_once(Utc::now()).await.unwrap();
  assert_eq!(report.failed, 1);
  assert!(fx.messages.sent().is_empty());
}

#[tokio::test]
async fn status_without_template_is_skipped() {
  let fx = Fixture::new();
  enqueue(&fx, OrderStatus::Ready, &[NotificationKind::WhatsappMessage]).await;

  let report = fx.dispatcher.run_once(Utc::now()).await.unwrap();
  assert_eq!(report.skipped, 1);
  assert!(fx.messages.sent().is_empty());
  assert!(fx.repo.outbox()[0].delivered_at.is_some());
}

#[tokio::test]
async fn inactive_config_is_skipped() {
  let fx = Fixture::new();
  let mut config = common::status_config(fx.store.id, OrderStatus::Ready, 3, Some("Pronto, {{customer_name}}!"));
  config.is_active = false;
  fx.repo.insert_status_config(config);
  enqueue(&fx, OrderStatus::Ready, &[NotificationKind::WhatsappMessage]).await;

  let report = fx.dispatcher.run_once(Utc::now()).await.unwrap();
  assert_eq!(report.skipped, 1);
  assert!(fx.messages.sent().is_empty());
}

#[tokio::test]
async fn broken_template_fails_permanently() {
  let fx = Fixture::new();
  fx.repo.insert_status_config(common::status_config(
    fx.store.id,
    OrderStatus::InDelivery,
    4,
    Some("Oi {{nome_cliente}}"),
  ));
  enqueue(&fx, OrderStatus::InDelivery, &[NotificationKind::WhatsappMessage]).await;

  let report = fx.dispatcher.run_once(Utc::now()).await.unwrap();
  assert_eq!(report.failed, 1);
  let entry = fx.repo.outbox().remove(0);
  assert_eq!(entry.attempts, 1);
  assert!(entry.failed_at.is_some());
  assert!(entry.last_error.unwrap().contains("nome_cliente"));
  assert!(fx.messages.sent().is_empty());
}

#[tokio::test]
async fn store_without_whatsapp_instance_is_skipped() {
  let fx = Fixture::new();
  let mut store = fx.store.clone();
  store.whatsapp_instance_id = None;
  fx.repo.insert_store(store);
  enqueue(&fx, OrderStatus::Confirmed, &[NotificationKind::WhatsappMessage]).await;

  let report = fx.dispatcher.run_once(Utc::now()).await.unwrap();
  assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn gone_subscription_is_deactivated_and_left_out_of_later_rounds() {
  let fx = Fixture::new();
  let alive = subscription(fx.store.id, "https://push.example.com/alive");
  let gone = subscription(fx.store.id, "https://push.example.com/gone");
  let flaky = subscription(fx.store.id, "https://push.example.com/flaky");
  for s in [&alive, &gone, &flaky] {
    fx.repo.insert_push_subscription(s.clone());
  }
  fx.push.respond(&gone.endpoint, PushOutcome::Gone);
  fx.push.respond(&flaky.endpoint, PushOutcome::Failed("push service returned 500".to_string()));

  enqueue(&fx, OrderStatus::Confirmed, &[NotificationKind::Push]).await;
  let report = fx.dispatcher.run_once(Utc::now()).await.unwrap();
  assert_eq!(report.delivered, 1);
  assert_eq!(fx.push.endpoints_sent().len(), 3);
  assert!(!fx.repo.push_subscription(gone.id).unwrap().is_active);
  assert!(fx.repo.push_subscription(flaky.id).unwrap().is_active);
  assert!(fx.repo.push_subscription(alive.id).unwrap().is_active);

  let (_, message) = fx.push.sent.lock()[0].clone();
  assert_eq!(message.title, "Pedido #42 - Confirmado");
  assert_eq!(message.order_id, fx.order.id);
  assert_eq!(message.tag, format!("order-{}", fx.order.id));

  fx.push.sent.lock().clear();
  enqueue(&fx, OrderStatus::Preparing, &[NotificationKind::Push]).await;
  fx.dispatcher.run_once(Utc::now()).await.unwrap();
  assert_eq!(
    fx.push.endpoints_sent(),
    vec![alive.endpoint.clone(), flaky.endpoint.clone()]
  );
}

#[tokio::test]
async fn push_round_without_subscriptions_is_skipped() {
  let fx = Fixture::new();
  enqueue(&fx, OrderStatus::Confirmed, &[NotificationKind::Push]).await;
  let report = fx.dispatcher.run_once(Utc::now()).await.unwrap();
  assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn commission_entry_is_idempotent() {
  let fx = Fixture::new();
  fx.link_affiliate(500);
  enqueue(&fx, OrderStatus::Delivered, &[NotificationKind::AffiliateCommission, NotificationKind::AffiliateCommission]).await;

  let report = fx.dispatcher.run_once(Utc::now()).await.unwrap();
  assert_eq!(report.delivered, 1);
  assert_eq!(report.skipped, 1);
  assert_eq!(fx.repo.earnings().len(), 1);
  assert_eq!(fx.repo.earnings()[0].amount_cents, 290);
}

#[tokio::test]
async fn rerun_commission_republishes_the_same_version() {
  let fx = Fixture::new();
  fx.link_affiliate(500);
  let mut listener = fx.state.realtime.subscribe();
  enqueue(&fx, OrderStatus::Delivered, &[NotificationKind::AffiliateCommission, NotificationKind::AffiliateCommission]).await;

  fx.dispatcher.run_once(Utc::now()).await.unwrap();
  let first = listener.try_recv().unwrap();
  let replay = listener.try_recv().unwrap();
  assert!(listener.try_recv().is_err());

  let earning = &fx.repo.earnings()[0];
  assert_eq!(first.table, ChangeTable::AffiliateEarnings);
  assert_eq!(first.row_id, earning.id);
  assert_eq!(first.version, earning.updated_at);
  assert_eq!(first.key(), replay.key());

  let mut deduper = EventDeduper::new(16, Duration::from_secs(60));
  let now = Instant::now();
  assert!(deduper.first_sighting(first.key(), now));
  assert!(!deduper.first_sighting(replay.key(), now));
}

#[tokio::test]
async fn claimed_entries_are_leased_away_from_other_dispatchers() {
  let fx = Fixture::new();
  enqueue(&fx, OrderStatus::Confirmed, &[NotificationKind::WhatsappMessage]).await;
  let now = Utc::now();

  let first = fx.repo.claim_due_notifications(now, 10, std::time::Duration::from_secs(120)).await.unwrap();
  assert_eq!(first.len(), 1);
  let second = fx.repo.claim_due_notifications(now, 10, std::time::Duration::from_secs(120)).await.unwrap();
  assert!(second.is_empty());
  let after_lease = fx
    .repo
    .claim_due_notifications(now + ChronoDuration::seconds(121), 10, std::time::Duration::from_secs(120))
    .await
    .unwrap();
  assert_eq!(after_lease.len(), 1);
}
