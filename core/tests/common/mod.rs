// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storefront::models::Product;
use storefront::{catalog, db, DeliveryReceipt, Mailer, OutgoingEmail, StoreError, Storefront};
use tracing::Level;
use uuid::Uuid;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub async fn test_pool() -> SqlitePool {
  setup_tracing();
  db::in_memory().await.expect("in-memory database")
}

pub async fn test_storefront() -> Storefront {
  Storefront::with_default_threshold(test_pool().await).expect("pipelines register")
}

pub async fn product(pool: &SqlitePool, name: &str, price_cents: i64, stock: i64) -> Product {
  catalog::create_product(pool, name, price_cents, stock)
    .await
    .expect("product created")
}

pub async fn stock_of(pool: &SqlitePool, product_id: i64) -> i64 {
  catalog::find_product(pool, product_id)
    .await
    .expect("query")
    .expect("product exists")
    .stock_quantity
}

pub async fn sale_count(pool: &SqlitePool) -> i64 {
  sqlx::query_scalar("SELECT COUNT(*) FROM sales")
    .fetch_one(pool)
    .await
    .expect("count sales")
}

/// Writes a sale row directly, bypassing checkout, for report fixtures.
pub async fn insert_sale(pool: &SqlitePool, product: &Product, quantity: i64, created_at: DateTime<Utc>) -> i64 {
  sqlx::query_scalar(
    "INSERT INTO sales (user_id, product_id, quantity, price_cents, total_cents, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id",
  )
  .bind(Uuid::new_v4())
  .bind(product.id)
  .bind(quantity)
  .bind(product.price_cents)
  .bind(product.price_cents * quantity)
  .bind(created_at)
  .fetch_one(pool)
  .await
  .expect("sale inserted")
}

pub fn user() -> Uuid {
  Uuid::new_v4()
}

/// Mailer that keeps every accepted message and can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
  sent: Mutex<Vec<OutgoingEmail>>,
  attempts: AtomicUsize,
  failures_remaining: AtomicUsize,
}

impl RecordingMailer {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Fails the first `n` sends with a delivery error.
  pub fn failing_first(n: usize) -> Arc<Self> {
    let mailer = Self::default();
    mailer.failures_remaining.store(n, Ordering::SeqCst);
    Arc::new(mailer)
  }

  pub fn always_failing() -> Arc<Self> {
    Self::failing_first(usize::MAX)
  }

  pub fn sent(&self) -> Vec<OutgoingEmail> {
    self.sent.lock().clone()
  }

  pub fn attempts(&self) -> usize {
    self.attempts.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, StoreError> {
    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
    let failing = self
      .failures_remaining
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
      .is_ok();
    if failing {
      return Err(StoreError::Delivery(format!("SMTP connection refused (attempt {attempt})")));
    }
    self.sent.lock().push(email.clone());
    Ok(DeliveryReceipt {
      message_id: format!("test_{attempt}"),
    })
  }
}
