// core/src/cart.rs

//! The cart store: one lazily created cart per user and its line items.
//!
//! Adding to the cart runs as the `AddToCartCtxData` pipeline; the other
//! mutations are single guarded statements.

use crate::catalog;
use crate::error::{Result, StoreError};
use crate::flow::{ContextData, FlowError, Flows, Pipeline, PipelineControl, PipelineResult};
use crate::models::{Cart, CartItem, CartLine, CartView, Product};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, added_at";

/// Returns the user's cart, creating it on first use.
pub(crate) async fn cart_for_user(conn: &mut SqliteConnection, user_id: Uuid) -> Result<Cart> {
  sqlx::query("INSERT INTO carts (user_id, created_at) VALUES (?1, ?2) ON CONFLICT (user_id) DO NOTHING")
    .bind(user_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

  let cart = sqlx::query_as("SELECT id, user_id, created_at FROM carts WHERE user_id = ?1")
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
  Ok(cart)
}

/// The user's cart, if one was ever created.
pub(crate) async fn find_cart(conn: &mut SqliteConnection, user_id: Uuid) -> Result<Option<Cart>> {
  let cart = sqlx::query_as("SELECT id, user_id, created_at FROM carts WHERE user_id = ?1")
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
  Ok(cart)
}

/// Cart lines joined with their products, in insertion order.
pub(crate) async fn cart_lines(conn: &mut SqliteConnection, cart_id: i64) -> Result<Vec<CartLine>> {
  let lines = sqlx::query_as(
    "SELECT ci.id AS item_id, ci.product_id, p.name AS product_name, p.price_cents, ci.quantity, p.stock_quantity \
     FROM cart_items ci JOIN products p ON p.id = ci.product_id \
     WHERE ci.cart_id = ?1 ORDER BY ci.id ASC",
  )
  .bind(cart_id)
  .fetch_all(&mut *conn)
  .await?;
  Ok(lines)
}

#[instrument(name = "cart::view_cart", skip(pool), fields(user_id = %user_id))]
pub async fn view_cart(pool: &SqlitePool, user_id: Uuid) -> Result<CartView> {
  let mut conn = pool.acquire().await?;
  let cart = cart_for_user(&mut conn, user_id).await?;
  let lines = cart_lines(&mut conn, cart.id).await?;
  Ok(CartView::new(cart.id, lines))
}

/// Loads a cart item and checks it belongs to `user_id`'s cart.
async fn owned_item(conn: &mut SqliteConnection, user_id: Uuid, item_id: i64) -> Result<CartItem> {
  let item: CartItem = sqlx::query_as(&format!("SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = ?1"))
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("Cart item {} not found.", item_id)))?;

  let owner: Uuid = sqlx::query_scalar("SELECT user_id FROM carts WHERE id = ?1")
    .bind(item.cart_id)
    .fetch_one(&mut *conn)
    .await?;

  if owner != user_id {
    warn!(item_id, "Cart item access denied for user {}.", user_id);
    return Err(StoreError::Forbidden);
  }
  Ok(item)
}

/// Fails with `NotFound` or `Forbidden` unless `item_id` is in `user_id`'s cart.
pub async fn ensure_item_owner(pool: &SqlitePool, user_id: Uuid, item_id: i64) -> Result<CartItem> {
  let mut conn = pool.acquire().await?;
  owned_item(&mut conn, user_id, item_id).await
}

#[instrument(name = "cart::update_cart_item", skip(pool), fields(user_id = %user_id), err(Display))]
pub async fn update_cart_item(
  pool: &SqlitePool,
  user_id: Uuid,
  item_id: i64,
  quantity: Option<i64>,
) -> Result<CartItem> {
  let mut conn = pool.acquire().await?;
  let item = owned_item(&mut conn, user_id, item_id).await?;

  let quantity = quantity.ok_or_else(|| StoreError::validation("quantity", "The quantity field is required."))?;
  if quantity < 1 {
    return Err(StoreError::validation("quantity", "The quantity field must be at least 1."));
  }

  let stock: i64 = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
    .bind(item.product_id)
    .fetch_one(&mut *conn)
    .await?;
  if quantity > stock {
    return Err(StoreError::insufficient_stock(
      "quantity",
      format!("Cannot set quantity to {}. Only {} available in stock.", quantity, stock),
    ));
  }

  let updated = sqlx::query_as(&format!(
    "UPDATE cart_items SET quantity = ?1 WHERE id = ?2 RETURNING {CART_ITEM_COLUMNS}"
  ))
  .bind(quantity)
  .bind(item.id)
  .fetch_one(&mut *conn)
  .await?;
  info!(item_id, quantity, "Cart item quantity updated.");
  Ok(updated)
}

#[instrument(name = "cart::remove_cart_item", skip(pool), fields(user_id = %user_id), err(Display))]
pub async fn remove_cart_item(pool: &SqlitePool, user_id: Uuid, item_id: i64) -> Result<()> {
  let mut conn = pool.acquire().await?;
  let item = owned_item(&mut conn, user_id, item_id).await?;

  sqlx::query("DELETE FROM cart_items WHERE id = ?1")
    .bind(item.id)
    .execute(&mut *conn)
    .await?;
  info!(item_id, "Item removed from cart.");
  Ok(())
}

// --- Add-to-cart pipeline ---

pub struct AddToCartCtxData {
  pub db_pool: SqlitePool,
  pub user_id: Uuid,
  pub product_id: Option<i64>,
  pub quantity: Option<i64>,
  pub product: Option<Product>,
  pub updated_cart_item: Option<CartItem>,
  pub merged_into_existing: bool,
}

impl AddToCartCtxData {
  pub fn new(db_pool: SqlitePool, user_id: Uuid, product_id: Option<i64>, quantity: Option<i64>) -> Self {
    Self {
      db_pool,
      user_id,
      product_id,
      quantity,
      product: None,
      updated_cart_item: None,
      merged_into_existing: false,
    }
  }

  fn requested_quantity(&self) -> i64 {
    self.quantity.unwrap_or(1)
  }
}

#[derive(Debug, Clone)]
pub struct AddToCartOutcome {
  pub item: CartItem,
  /// True when the quantity was added to an existing line for the product.
  pub merged_into_existing: bool,
}

pub fn register_add_to_cart_pipeline(flows: &Flows<StoreError>) -> Result<(), FlowError> {
  let mut p = Pipeline::<AddToCartCtxData, StoreError>::new(&[
    ("validate_cart_input", false),
    ("fetch_product_for_cart", false),
    ("check_product_stock_for_cart", false),
    ("add_or_update_cart_item", false),
  ]);

  p.on_step("validate_cart_input", validate_cart_input)?
    .on_step("fetch_product_for_cart", fetch_product_for_cart)?
    .on_step("check_product_stock_for_cart", check_product_stock_for_cart)?
    .on_step("add_or_update_cart_item", add_or_update_cart_item)?;

  flows.register(p);
  info!("Add to Cart pipeline registered.");
  Ok(())
}

async fn validate_cart_input(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl> {
  let (product_id, quantity) = {
    let guard = ctx_data.read();
    (guard.product_id, guard.requested_quantity())
  };

  if product_id.is_none() {
    return Err(StoreError::validation("product_id", "The product id field is required."));
  }
  if quantity < 1 {
    warn!(quantity, "Add to Cart: invalid quantity.");
    return Err(StoreError::validation("quantity", "The quantity field must be at least 1."));
  }
  Ok(PipelineControl::Continue)
}

async fn fetch_product_for_cart(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl> {
  let (product_id, db_pool) = {
    let guard = ctx_data.read();
    (guard.product_id, guard.db_pool.clone())
  };
  let product_id = product_id.ok_or_else(|| StoreError::validation("product_id", "The product id field is required."))?;

  match catalog::find_product(&db_pool, product_id).await? {
    Some(product) => {
      ctx_data.write().product = Some(product);
      Ok(PipelineControl::Continue)
    }
    None => {
      warn!(product_id, "Add to Cart: product not found.");
      Err(StoreError::validation("product_id", "The selected product id is invalid."))
    }
  }
}

async fn check_product_stock_for_cart(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl> {
  let (stock, requested) = {
    let guard = ctx_data.read();
    let stock = guard.product.as_ref().map(|p| p.stock_quantity);
    (stock, guard.requested_quantity())
  };
  let stock = stock.ok_or_else(|| StoreError::Internal("Product was not loaded before the stock check.".to_string()))?;

  if stock == 0 {
    return Err(StoreError::insufficient_stock("product_id", "This product is out of stock."));
  }
  if requested > stock {
    return Err(StoreError::insufficient_stock(
      "product_id",
      format!("Cannot add {} items. Only {} available in stock.", requested, stock),
    ));
  }
  Ok(PipelineControl::Continue)
}

async fn add_or_update_cart_item(ctx_data: ContextData<AddToCartCtxData>) -> Result<PipelineControl> {
  let (db_pool, user_id, product, quantity) = {
    let guard = ctx_data.read();
    (
      guard.db_pool.clone(),
      guard.user_id,
      guard.product.clone(),
      guard.requested_quantity(),
    )
  };
  let product = product.ok_or_else(|| StoreError::Internal("Product was not loaded before the cart update.".to_string()))?;

  let mut tx = db_pool.begin().await?;
  let cart = cart_for_user(&mut tx, user_id).await?;

  let existing: Option<CartItem> = sqlx::query_as(&format!(
    "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = ?1 AND product_id = ?2"
  ))
  .bind(cart.id)
  .bind(product.id)
  .fetch_optional(&mut *tx)
  .await?;

  // Stock as of this transaction; the pipeline's earlier read may be stale.
  let stock: i64 = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
    .bind(product.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| StoreError::validation("product_id", "The selected product id is invalid."))?;

  let (item, merged): (CartItem, bool) = match existing {
    Some(existing) => {
      let new_quantity = existing.quantity + quantity;
      if new_quantity > stock {
        return Err(StoreError::insufficient_stock(
          "product_id",
          format!("Cannot add more items. Only {} available in stock.", stock),
        ));
      }
      let item = sqlx::query_as(&format!(
        "UPDATE cart_items SET quantity = ?1 WHERE id = ?2 RETURNING {CART_ITEM_COLUMNS}"
      ))
      .bind(new_quantity)
      .bind(existing.id)
      .fetch_one(&mut *tx)
      .await?;
      (item, true)
    }
    None => {
      if quantity > stock {
        return Err(StoreError::insufficient_stock(
          "product_id",
          format!("Cannot add {} items. Only {} available in stock.", quantity, stock),
        ));
      }
      let item = sqlx::query_as(&format!(
        "INSERT INTO cart_items (cart_id, product_id, quantity, added_at) VALUES (?1, ?2, ?3, ?4) \
         RETURNING {CART_ITEM_COLUMNS}"
      ))
      .bind(cart.id)
      .bind(product.id)
      .bind(quantity)
      .bind(Utc::now())
      .fetch_one(&mut *tx)
      .await?;
      (item, false)
    }
  };
  tx.commit().await?;

  info!(
    "Add to Cart: user {} now has {} x product {} (merged: {}).",
    user_id, item.quantity, item.product_id, merged
  );
  {
    let mut guard = ctx_data.write();
    guard.updated_cart_item = Some(item);
    guard.merged_into_existing = merged;
  }
  Ok(PipelineControl::Continue)
}

/// Runs the add-to-cart pipeline. `quantity` defaults to 1.
#[instrument(name = "cart::add_to_cart", skip(flows, pool), fields(user_id = %user_id), err(Display))]
pub async fn add_to_cart(
  flows: &Flows<StoreError>,
  pool: &SqlitePool,
  user_id: Uuid,
  product_id: Option<i64>,
  quantity: Option<i64>,
) -> Result<AddToCartOutcome> {
  let ctx_data = ContextData::new(AddToCartCtxData::new(pool.clone(), user_id, product_id, quantity));

  match flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx_data.read();
      let item = guard
        .updated_cart_item
        .clone()
        .ok_or_else(|| StoreError::Internal("Cart update completed, but item details are unavailable.".to_string()))?;
      Ok(AddToCartOutcome {
        item,
        merged_into_existing: guard.merged_into_existing,
      })
    }
    PipelineResult::Stopped => Err(StoreError::Internal(
      "Process to add item to cart was halted.".to_string(),
    )),
  }
}
