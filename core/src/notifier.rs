// core/src/notifier.rs

//! Low-stock alerting.
//!
//! Checkout hands over a `LowStockCheck` per product that ended at or below the
//! threshold. The notifier re-reads the product (stock may have been restocked
//! in the meantime) and mails the administrator only if it is still low.
//! Checks run on a background worker so a slow or failing mail transport never
//! affects the checkout that triggered them.

use crate::catalog;
use crate::checkout::DEFAULT_LOW_STOCK_THRESHOLD;
use crate::error::{Result, StoreError};
use crate::mail::{Mailer, OutgoingEmail};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A deferred "is this product still low?" question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LowStockCheck {
  pub product_id: i64,
  pub threshold: i64,
}

impl LowStockCheck {
  pub fn new(product_id: i64, threshold: i64) -> Self {
    Self { product_id, threshold }
  }

  pub fn with_default_threshold(product_id: i64) -> Self {
    Self::new(product_id, DEFAULT_LOW_STOCK_THRESHOLD)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowStockOutcome {
  AlertSent { stock_quantity: i64, message_id: String },
  AboveThreshold { stock_quantity: i64 },
  ProductMissing,
}

#[derive(Debug, Clone)]
pub struct NotifierSettings {
  pub admin_email: String,
  pub max_attempts: u32,
  pub send_timeout: Duration,
  /// Delay before retry `n` is `retry_backoff * n`.
  pub retry_backoff: Duration,
}

impl Default for NotifierSettings {
  fn default() -> Self {
    Self {
      admin_email: "admin@example.com".to_string(),
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      send_timeout: Duration::from_secs(10),
      retry_backoff: Duration::from_millis(500),
    }
  }
}

#[derive(Clone)]
pub struct LowStockNotifier {
  pool: SqlitePool,
  mailer: Arc<dyn Mailer>,
  settings: NotifierSettings,
}

impl LowStockNotifier {
  pub fn new(pool: SqlitePool, mailer: Arc<dyn Mailer>, settings: NotifierSettings) -> Self {
    Self { pool, mailer, settings }
  }

  /// One attempt: reload the product and send the alert if stock is still at
  /// or below `check.threshold`.
  #[instrument(name = "notifier::check_low_stock", skip(self), fields(product_id = check.product_id), err(Display))]
  pub async fn check_low_stock(&self, check: LowStockCheck) -> Result<LowStockOutcome> {
    let Some(product) = catalog::find_product(&self.pool, check.product_id).await? else {
      warn!("Low-stock check for a product that no longer exists.");
      return Ok(LowStockOutcome::ProductMissing);
    };

    if product.stock_quantity > check.threshold {
      debug!(
        stock_quantity = product.stock_quantity,
        threshold = check.threshold,
        "Stock recovered above threshold; no alert."
      );
      return Ok(LowStockOutcome::AboveThreshold {
        stock_quantity: product.stock_quantity,
      });
    }

    let email = OutgoingEmail::low_stock_alert(&self.settings.admin_email, &product, check.threshold);
    let receipt = tokio::time::timeout(self.settings.send_timeout, self.mailer.send(&email))
      .await
      .map_err(|_| {
        StoreError::Delivery(format!(
          "Mail transport timed out after {:?}.",
          self.settings.send_timeout
        ))
      })??;

    info!(
      stock_quantity = product.stock_quantity,
      message_id = %receipt.message_id,
      "Low stock alert sent for '{}'.",
      product.name
    );
    Ok(LowStockOutcome::AlertSent {
      stock_quantity: product.stock_quantity,
      message_id: receipt.message_id,
    })
  }

  /// Runs a check with retries on transient failures. The final error is
  /// logged and returned; callers on the background worker drop it.
  pub async fn run(&self, check: LowStockCheck) -> Result<LowStockOutcome> {
    let max_attempts = self.settings.max_attempts.max(1);
    let mut attempt = 1;
    loop {
      match self.check_low_stock(check).await {
        Ok(outcome) => return Ok(outcome),
        Err(e) if e.is_transient() && attempt < max_attempts => {
          warn!(
            product_id = check.product_id,
            attempt, max_attempts, "Low-stock notification failed, retrying: {}", e
          );
          let delay = self.settings.retry_backoff * attempt;
          if !delay.is_zero() {
            tokio::time::sleep(delay).await;
          }
          attempt += 1;
        }
        Err(e) => {
          error!(
            product_id = check.product_id,
            attempt, "Low-stock notification abandoned: {}", e
          );
          return Err(e);
        }
      }
    }
  }
}

/// Sender half of the background notifier. Cloning is cheap; the worker exits
/// once every clone is dropped.
#[derive(Clone)]
pub struct NotifierQueue {
  sender: mpsc::UnboundedSender<LowStockCheck>,
}

impl NotifierQueue {
  /// Spawns the worker on the current tokio runtime.
  pub fn spawn(notifier: LowStockNotifier) -> (Self, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::unbounded_channel::<LowStockCheck>();
    let handle = tokio::spawn(async move {
      info!("Low-stock notifier worker started.");
      while let Some(check) = receiver.recv().await {
        // Failures are already logged by `run`.
        let _ = notifier.run(check).await;
      }
      info!("Low-stock notifier worker stopped.");
    });
    (Self { sender }, handle)
  }

  /// Queues a check. Returns `false` if the worker is gone.
  pub fn enqueue(&self, check: LowStockCheck) -> bool {
    match self.sender.send(check) {
      Ok(()) => true,
      Err(_) => {
        error!(product_id = check.product_id, "Notifier worker is not running; low-stock check dropped.");
        false
      }
    }
  }

  pub fn enqueue_all(&self, checks: impl IntoIterator<Item = LowStockCheck>) -> usize {
    checks.into_iter().filter(|check| self.enqueue(*check)).count()
  }
}
