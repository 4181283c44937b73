// core/src/storefront.rs

use crate::cart::{self, AddToCartOutcome};
use crate::catalog;
use crate::checkout::{self, CheckoutOutcome, DEFAULT_LOW_STOCK_THRESHOLD};
use crate::error::{Result, StoreError};
use crate::flow::Flows;
use crate::models::{CartItem, CartView, Product};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Entry point for request-driven operations: the pool plus the registered
/// cart and checkout pipelines.
#[derive(Clone)]
pub struct Storefront {
  pool: SqlitePool,
  flows: Arc<Flows<StoreError>>,
  low_stock_threshold: i64,
}

impl Storefront {
  pub fn new(pool: SqlitePool, low_stock_threshold: i64) -> Result<Self> {
    let flows = Flows::new();
    cart::register_add_to_cart_pipeline(&flows)?;
    checkout::register_checkout_pipeline(&flows)?;
    Ok(Self {
      pool,
      flows: Arc::new(flows),
      low_stock_threshold,
    })
  }

  pub fn with_default_threshold(pool: SqlitePool) -> Result<Self> {
    Self::new(pool, DEFAULT_LOW_STOCK_THRESHOLD)
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }

  pub async fn list_products(&self) -> Result<Vec<Product>> {
    catalog::list_products(&self.pool).await
  }

  pub async fn view_cart(&self, user_id: Uuid) -> Result<CartView> {
    cart::view_cart(&self.pool, user_id).await
  }

  pub async fn add_to_cart(
    &self,
    user_id: Uuid,
    product_id: Option<i64>,
    quantity: Option<i64>,
  ) -> Result<AddToCartOutcome> {
    cart::add_to_cart(&self.flows, &self.pool, user_id, product_id, quantity).await
  }

  pub async fn update_cart_item(&self, user_id: Uuid, item_id: i64, quantity: Option<i64>) -> Result<CartItem> {
    cart::update_cart_item(&self.pool, user_id, item_id, quantity).await
  }

  pub async fn ensure_cart_item_owner(&self, user_id: Uuid, item_id: i64) -> Result<CartItem> {
    cart::ensure_item_owner(&self.pool, user_id, item_id).await
  }

  pub async fn remove_cart_item(&self, user_id: Uuid, item_id: i64) -> Result<()> {
    cart::remove_cart_item(&self.pool, user_id, item_id).await
  }

  pub async fn checkout(&self, user_id: Uuid) -> Result<CheckoutOutcome> {
    checkout::checkout(&self.flows, &self.pool, user_id, self.low_stock_threshold).await
  }
}
