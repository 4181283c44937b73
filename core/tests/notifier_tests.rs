// tests/notifier_tests.rs
mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use storefront::{
  catalog, EmailKind, LowStockCheck, LowStockNotifier, LowStockOutcome, Mailer, NotifierQueue, NotifierSettings,
  StoreError,
};

fn settings() -> NotifierSettings {
  NotifierSettings {
    admin_email: "ops@example.com".to_string(),
    retry_backoff: Duration::ZERO,
    ..Default::default()
  }
}

fn notifier(pool: &sqlx::SqlitePool, mailer: Arc<RecordingMailer>) -> LowStockNotifier {
  LowStockNotifier::new(pool.clone(), mailer as Arc<dyn Mailer>, settings())
}

#[tokio::test]
async fn alert_is_sent_when_stock_is_at_or_below_threshold() {
  let pool = test_pool().await;
  let camera = product(&pool, "Compact Camera", 45_000, 5).await;
  let mailer = RecordingMailer::new();

  let outcome = notifier(&pool, mailer.clone())
    .check_low_stock(LowStockCheck::new(camera.id, 5))
    .await
    .unwrap();

  assert!(matches!(outcome, LowStockOutcome::AlertSent { stock_quantity: 5, .. }));
  let sent = mailer.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].kind, EmailKind::LowStockAlert);
  assert_eq!(sent[0].to, "ops@example.com");
  assert!(sent[0].subject.contains("Compact Camera"));
  assert!(sent[0].html_body.contains("$450.00"));
}

#[tokio::test]
async fn restocked_product_is_not_alerted() {
  let pool = test_pool().await;
  let camera = product(&pool, "Compact Camera", 45_000, 2).await;
  catalog::restock(&pool, camera.id, 10).await.unwrap();
  let mailer = RecordingMailer::new();

  let outcome = notifier(&pool, mailer.clone())
    .run(LowStockCheck::with_default_threshold(camera.id))
    .await
    .unwrap();

  assert_eq!(outcome, LowStockOutcome::AboveThreshold { stock_quantity: 12 });
  assert!(mailer.sent().is_empty());
  assert_eq!(mailer.attempts(), 0);
}

#[tokio::test]
async fn missing_product_is_skipped() {
  let pool = test_pool().await;
  let mailer = RecordingMailer::new();

  let outcome = notifier(&pool, mailer.clone())
    .run(LowStockCheck::new(404, 5))
    .await
    .unwrap();

  assert_eq!(outcome, LowStockOutcome::ProductMissing);
  assert_eq!(mailer.attempts(), 0);
}

#[tokio::test]
async fn transient_failures_are_retried() {
  let pool = test_pool().await;
  let speaker = product(&pool, "Speaker", 5_999, 1).await;
  let mailer = RecordingMailer::failing_first(2);

  let outcome = notifier(&pool, mailer.clone())
    .run(LowStockCheck::new(speaker.id, 5))
    .await
    .unwrap();

  assert!(matches!(outcome, LowStockOutcome::AlertSent { .. }));
  assert_eq!(mailer.attempts(), 3);
  assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn gives_up_after_three_attempts() {
  let pool = test_pool().await;
  let speaker = product(&pool, "Speaker", 5_999, 1).await;
  let mailer = RecordingMailer::always_failing();

  let err = notifier(&pool, mailer.clone())
    .run(LowStockCheck::new(speaker.id, 5))
    .await
    .unwrap_err();

  assert!(matches!(err, StoreError::Delivery(_)));
  assert_eq!(mailer.attempts(), 3);
  assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn queue_worker_processes_checks_from_a_checkout() {
  let store = test_storefront().await;
  let pool = store.pool().clone();
  let mug = product(&pool, "Mug", 1_200, 6).await;
  let shopper = user();
  store.add_to_cart(shopper, Some(mug.id), Some(2)).await.unwrap();
  let outcome = store.checkout(shopper).await.unwrap();
  let mailer = RecordingMailer::new();

  let (queue, worker) = NotifierQueue::spawn(notifier(&pool, mailer.clone()));
  assert_eq!(queue.enqueue_all(outcome.low_stock_checks), 1);
  drop(queue);
  worker.await.unwrap();

  let sent = mailer.sent();
  assert_eq!(sent.len(), 1);
  assert!(sent[0].html_body.contains("4 units"));
}
