// core/src/models/cart.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// One cart per user, created on first interaction.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Cart {
  pub id: i64,
  pub user_id: Uuid,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartItem {
  pub id: i64,
  pub cart_id: i64,
  pub product_id: i64,
  pub quantity: i64,
  pub added_at: DateTime<Utc>,
}

/// A cart item joined with the product it refers to.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
  pub item_id: i64,
  pub product_id: i64,
  pub product_name: String,
  pub price_cents: i64,
  pub quantity: i64,
  pub stock_quantity: i64,
}

impl CartLine {
  pub fn subtotal_cents(&self) -> i64 {
    self.price_cents * self.quantity
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
  pub cart_id: i64,
  pub lines: Vec<CartLine>,
  pub total_cents: i64,
}

impl CartView {
  pub fn new(cart_id: i64, lines: Vec<CartLine>) -> Self {
    let total_cents = lines.iter().map(CartLine::subtotal_cents).sum();
    Self {
      cart_id,
      lines,
      total_cents,
    }
  }
}
