// tests/reporting_tests.rs
mod common;

use chrono::{NaiveDate, TimeZone, Utc};
use common::*;
use std::sync::Arc;
use storefront::{DailyReporter, EmailKind, Mailer, StoreError};

fn reporter(pool: &sqlx::SqlitePool, mailer: Arc<RecordingMailer>) -> DailyReporter {
  DailyReporter::new(pool.clone(), mailer as Arc<dyn Mailer>, "admin@example.com")
}

fn march(day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

#[tokio::test]
async fn summarizes_a_day_and_mails_the_admin() {
  let pool = test_pool().await;
  let cable = product(&pool, "Cable", 5_000, 100).await;
  let headset = product(&pool, "Headset", 5_000, 100).await;
  insert_sale(&pool, &cable, 2, Utc.with_ymd_and_hms(2025, 3, 14, 9, 15, 0).unwrap()).await;
  insert_sale(&pool, &headset, 3, Utc.with_ymd_and_hms(2025, 3, 14, 17, 40, 0).unwrap()).await;
  let mailer = RecordingMailer::new();

  let summary = reporter(&pool, mailer.clone()).generate(Some(march(14))).await.unwrap();

  assert!(summary.email_sent);
  assert_eq!(summary.total_quantity, 5);
  assert_eq!(summary.total_revenue_cents, 25_000);
  assert_eq!(summary.product_count, 2);
  assert_eq!(summary.products[0].product_name, "Headset");
  assert_eq!(summary.products[0].revenue_cents, 15_000);
  assert_eq!(summary.products[1].revenue_cents, 10_000);

  let sent = mailer.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].kind, EmailKind::DailySalesReport);
  assert_eq!(sent[0].to, "admin@example.com");
  assert_eq!(sent[0].subject, "Daily Sales Report - 2025-03-14");
  assert!(sent[0].html_body.contains("$250.00"));
}

#[tokio::test]
async fn only_sales_inside_the_utc_day_are_counted() {
  let pool = test_pool().await;
  let cable = product(&pool, "Cable", 1_000, 100).await;
  insert_sale(&pool, &cable, 1, Utc.with_ymd_and_hms(2025, 3, 13, 23, 59, 59).unwrap()).await;
  insert_sale(&pool, &cable, 2, Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap()).await;
  insert_sale(&pool, &cable, 4, Utc.with_ymd_and_hms(2025, 3, 14, 23, 59, 59).unwrap()).await;
  insert_sale(&pool, &cable, 8, Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap()).await;

  let summary = reporter(&pool, RecordingMailer::new()).summarize(march(14)).await.unwrap();

  assert_eq!(summary.total_quantity, 6);
  assert_eq!(summary.product_count, 1);
}

#[tokio::test]
async fn no_sales_means_no_email() {
  let pool = test_pool().await;
  let mailer = RecordingMailer::new();

  let summary = reporter(&pool, mailer.clone()).generate(Some(march(14))).await.unwrap();

  assert!(!summary.email_sent);
  assert!(!summary.has_sales());
  assert_eq!(mailer.attempts(), 0);
}

#[tokio::test]
async fn defaults_to_yesterday() {
  let pool = test_pool().await;
  let cable = product(&pool, "Cable", 1_000, 100).await;
  insert_sale(&pool, &cable, 1, Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()).await;
  let now = Utc.with_ymd_and_hms(2025, 3, 15, 9, 0, 0).unwrap();

  let summary = reporter(&pool, RecordingMailer::new())
    .generate_at(None, now)
    .await
    .unwrap();

  assert_eq!(summary.date, march(14));
  assert_eq!(summary.total_quantity, 1);
}

#[tokio::test]
async fn mail_failure_is_reported_without_retry() {
  let pool = test_pool().await;
  let cable = product(&pool, "Cable", 1_000, 100).await;
  insert_sale(&pool, &cable, 1, Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()).await;
  let mailer = RecordingMailer::always_failing();

  let err = reporter(&pool, mailer.clone()).generate(Some(march(14))).await.unwrap_err();

  assert!(matches!(err, StoreError::Delivery(_)));
  assert_eq!(mailer.attempts(), 1);
}

#[tokio::test]
async fn checkout_sales_appear_in_that_days_report() {
  let store = test_storefront().await;
  let pool = store.pool().clone();
  let lamp = product(&pool, "Lamp", 1_999, 10).await;
  let shopper = user();
  store.add_to_cart(shopper, Some(lamp.id), Some(2)).await.unwrap();
  let outcome = store.checkout(shopper).await.unwrap();

  let summary = reporter(&pool, RecordingMailer::new())
    .summarize(outcome.summary.completed_at.date_naive())
    .await
    .unwrap();

  assert_eq!(summary.total_quantity, 2);
  assert_eq!(summary.total_revenue_cents, 3_998);
}
