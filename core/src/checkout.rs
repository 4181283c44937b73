// core/src/checkout.rs

//! Checkout: turns a user's cart into sale records in one transaction.
//!
//! Steps: `load_cart_lines` → `verify_stock_levels` → `commit_sale_transaction`.
//! Stock is decremented with a conditional `UPDATE ... WHERE stock_quantity >= qty`,
//! so two checkouts racing for the same units can never drive stock negative;
//! the loser's whole transaction rolls back with `InsufficientStock`.
//!
//! Low-stock notifications are not sent from here. The outcome carries the
//! list of products that ended at or below the threshold and the caller
//! enqueues them after the commit.

use crate::cart;
use crate::error::{Result, StoreError};
use crate::flow::{ContextData, FlowError, Flows, Pipeline, PipelineControl, PipelineResult};
use crate::models::{CartLine, Sale};
use crate::notifier::LowStockCheck;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// What a successful checkout persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SaleSummary {
  pub sale_ids: Vec<i64>,
  pub line_count: usize,
  pub total_quantity: i64,
  pub total_cents: i64,
  pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
  pub summary: SaleSummary,
  /// Post-commit work: one check per product that ended at or below the threshold.
  pub low_stock_checks: Vec<LowStockCheck>,
}

pub struct CheckoutCtxData {
  pub db_pool: SqlitePool,
  pub user_id: Uuid,
  pub low_stock_threshold: i64,
  pub cart_id: Option<i64>,
  pub lines: Vec<CartLine>,
  pub summary: Option<SaleSummary>,
  pub low_stock_checks: Vec<LowStockCheck>,
}

impl CheckoutCtxData {
  pub fn new(db_pool: SqlitePool, user_id: Uuid, low_stock_threshold: i64) -> Self {
    Self {
      db_pool,
      user_id,
      low_stock_threshold,
      cart_id: None,
      lines: Vec::new(),
      summary: None,
      low_stock_checks: Vec::new(),
    }
  }
}

pub fn register_checkout_pipeline(flows: &Flows<StoreError>) -> Result<(), FlowError> {
  let mut p = Pipeline::<CheckoutCtxData, StoreError>::new(&[
    ("load_cart_lines", false),
    ("verify_stock_levels", false),
    ("commit_sale_transaction", false),
  ]);

  p.on_step("load_cart_lines", load_cart_lines)?
    .on_step("verify_stock_levels", verify_stock_levels)?
    .on_step("commit_sale_transaction", commit_sale_transaction)?;

  flows.register(p);
  info!("Checkout pipeline registered.");
  Ok(())
}

async fn load_cart_lines(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl> {
  let (db_pool, user_id) = {
    let guard = ctx_data.read();
    (guard.db_pool.clone(), guard.user_id)
  };

  let mut conn = db_pool.acquire().await?;
  let Some(found) = cart::find_cart(&mut conn, user_id).await? else {
    info!("Checkout: user {} has no cart.", user_id);
    return Err(StoreError::EmptyCart);
  };
  let lines = cart::cart_lines(&mut conn, found.id).await?;
  if lines.is_empty() {
    info!("Checkout: cart {} is empty.", found.id);
    return Err(StoreError::EmptyCart);
  }

  info!("Checkout: loaded {} cart lines for cart {}.", lines.len(), found.id);
  {
    let mut guard = ctx_data.write();
    guard.cart_id = Some(found.id);
    guard.lines = lines;
  }
  Ok(PipelineControl::Continue)
}

/// Rejects the checkout before any write if a line asks for more than is in stock.
async fn verify_stock_levels(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl> {
  let shortages: Vec<String> = {
    let guard = ctx_data.read();
    guard
      .lines
      .iter()
      .filter(|line| line.quantity > line.stock_quantity)
      .map(|line| {
        format!(
          "Insufficient stock for {}. Only {} available, but {} requested.",
          line.product_name, line.stock_quantity, line.quantity
        )
      })
      .collect()
  };

  if !shortages.is_empty() {
    warn!(count = shortages.len(), "Checkout rejected: insufficient stock.");
    return Err(StoreError::insufficient_stock("stock", shortages.join(" ")));
  }
  Ok(PipelineControl::Continue)
}

async fn commit_sale_transaction(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl> {
  let (db_pool, user_id, cart_id, lines, threshold) = {
    let guard = ctx_data.read();
    (
      guard.db_pool.clone(),
      guard.user_id,
      guard.cart_id,
      guard.lines.clone(),
      guard.low_stock_threshold,
    )
  };
  let cart_id = cart_id.ok_or_else(|| StoreError::Internal("Cart was not loaded before commit.".to_string()))?;
  let completed_at = Utc::now();

  // Dropping `tx` on any early return rolls everything back.
  let mut tx = db_pool.begin().await?;
  let mut sale_ids = Vec::with_capacity(lines.len());
  let mut low_stock_checks: Vec<LowStockCheck> = Vec::new();
  let mut total_quantity = 0;
  let mut total_cents = 0;

  for line in &lines {
    let decremented: Option<(i64, i64)> = sqlx::query_as(
      "UPDATE products SET stock_quantity = stock_quantity - ?1, updated_at = ?2 \
       WHERE id = ?3 AND stock_quantity >= ?1 \
       RETURNING stock_quantity, price_cents",
    )
    .bind(line.quantity)
    .bind(completed_at)
    .bind(line.product_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((remaining_stock, price_cents)) = decremented else {
      warn!(
        product_id = line.product_id,
        "Checkout: stock for {} changed before commit, rolling back.", line.product_name
      );
      return Err(StoreError::insufficient_stock(
        "stock",
        format!(
          "Insufficient stock for {}. {} requested but it is no longer available.",
          line.product_name, line.quantity
        ),
      ));
    };

    if remaining_stock <= threshold && !low_stock_checks.iter().any(|c| c.product_id == line.product_id) {
      low_stock_checks.push(LowStockCheck::new(line.product_id, threshold));
    }

    let line_total = price_cents * line.quantity;
    let sale_id: i64 = sqlx::query_scalar(
      "INSERT INTO sales (user_id, product_id, quantity, price_cents, total_cents, created_at) \
       VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id",
    )
    .bind(user_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(price_cents)
    .bind(line_total)
    .bind(completed_at)
    .fetch_one(&mut *tx)
    .await?;

    sale_ids.push(sale_id);
    total_quantity += line.quantity;
    total_cents += line_total;
  }

  sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
    .bind(cart_id)
    .execute(&mut *tx)
    .await?;

  tx.commit().await.map_err(|e| {
    error!("Checkout: commit failed for cart {}: {}", cart_id, e);
    StoreError::Database(e)
  })?;

  info!(
    "Checkout committed for user {}: {} sales, {} items, total {} cents.",
    user_id,
    sale_ids.len(),
    total_quantity,
    total_cents
  );
  {
    let mut guard = ctx_data.write();
    guard.summary = Some(SaleSummary {
      line_count: sale_ids.len(),
      sale_ids,
      total_quantity,
      total_cents,
      completed_at,
    });
    guard.low_stock_checks = low_stock_checks;
  }
  Ok(PipelineControl::Continue)
}

/// Runs the checkout pipeline for `user_id`.
#[instrument(name = "checkout::checkout", skip(flows, pool), fields(user_id = %user_id), err(Display))]
pub async fn checkout(
  flows: &Flows<StoreError>,
  pool: &SqlitePool,
  user_id: Uuid,
  low_stock_threshold: i64,
) -> Result<CheckoutOutcome> {
  let ctx_data = ContextData::new(CheckoutCtxData::new(pool.clone(), user_id, low_stock_threshold));

  match flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let mut guard = ctx_data.write();
      let summary = guard.summary.take().ok_or_else(|| {
        StoreError::Internal("Checkout completed, but no sale summary was recorded.".to_string())
      })?;
      Ok(CheckoutOutcome {
        summary,
        low_stock_checks: std::mem::take(&mut guard.low_stock_checks),
      })
    }
    PipelineResult::Stopped => Err(StoreError::Internal("Checkout process was halted.".to_string())),
  }
}

/// A user's past sales, most recent first.
pub async fn sales_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Sale>> {
  let sales = sqlx::query_as(
    "SELECT id, user_id, product_id, quantity, price_cents, total_cents, created_at \
     FROM sales WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;
  Ok(sales)
}
