// core/src/models/sale.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// An append-only sale record. `price_cents` is the unit price at checkout
/// time, not a reference to the product's current price.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sale {
  pub id: i64,
  pub user_id: Uuid,
  pub product_id: i64,
  pub quantity: i64,
  pub price_cents: i64,
  pub total_cents: i64,
  pub created_at: DateTime<Utc>,
}
