// core/src/catalog.rs

//! The inventory ledger: products and their stock counts.

use crate::error::{Result, StoreError};
use crate::models::Product;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

const PRODUCT_COLUMNS: &str = "id, name, price_cents, stock_quantity, created_at, updated_at";

#[instrument(name = "catalog::list_products", skip(pool))]
pub async fn list_products(pool: &SqlitePool) -> Result<Vec<Product>> {
  let products: Vec<Product> =
    sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name ASC, id ASC"))
      .fetch_all(pool)
      .await?;
  info!("Fetched {} products.", products.len());
  Ok(products)
}

pub async fn find_product(pool: &SqlitePool, product_id: i64) -> Result<Option<Product>> {
  let product = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
  Ok(product)
}

#[instrument(name = "catalog::create_product", skip(pool), err(Display))]
pub async fn create_product(pool: &SqlitePool, name: &str, price_cents: i64, stock_quantity: i64) -> Result<Product> {
  if price_cents < 0 {
    return Err(StoreError::validation("price", "The price must not be negative."));
  }
  if stock_quantity < 0 {
    return Err(StoreError::validation("stock_quantity", "The stock quantity must not be negative."));
  }

  let now = Utc::now();
  let product = sqlx::query_as(&format!(
    "INSERT INTO products (name, price_cents, stock_quantity, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?4) RETURNING {PRODUCT_COLUMNS}"
  ))
  .bind(name)
  .bind(price_cents)
  .bind(stock_quantity)
  .bind(now)
  .fetch_one(pool)
  .await?;
  Ok(product)
}

/// Adds `quantity` units to a product's stock.
#[instrument(name = "catalog::restock", skip(pool), err(Display))]
pub async fn restock(pool: &SqlitePool, product_id: i64, quantity: i64) -> Result<Product> {
  if quantity < 1 {
    return Err(StoreError::validation("quantity", "The quantity field must be at least 1."));
  }

  let product: Option<Product> = sqlx::query_as(&format!(
    "UPDATE products SET stock_quantity = stock_quantity + ?1, updated_at = ?2 WHERE id = ?3 RETURNING {PRODUCT_COLUMNS}"
  ))
  .bind(quantity)
  .bind(Utc::now())
  .bind(product_id)
  .fetch_optional(pool)
  .await?;

  product.ok_or_else(|| {
    warn!(product_id, "Restock requested for unknown product.");
    StoreError::NotFound(format!("Product with ID {} not found.", product_id))
  })
}

/// Updates a product's unit price. Past sales keep the price they were sold at.
#[instrument(name = "catalog::set_price", skip(pool), err(Display))]
pub async fn set_price(pool: &SqlitePool, product_id: i64, price_cents: i64) -> Result<Product> {
  if price_cents < 0 {
    return Err(StoreError::validation("price", "The price must not be negative."));
  }

  let product: Option<Product> = sqlx::query_as(&format!(
    "UPDATE products SET price_cents = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {PRODUCT_COLUMNS}"
  ))
  .bind(price_cents)
  .bind(Utc::now())
  .bind(product_id)
  .fetch_optional(pool)
  .await?;

  product.ok_or_else(|| StoreError::NotFound(format!("Product with ID {} not found.", product_id)))
}

/// Inserts a small demo catalog when the products table is empty.
/// Returns the number of products inserted.
#[instrument(name = "catalog::seed_demo_catalog", skip(pool), err(Display))]
pub async fn seed_demo_catalog(pool: &SqlitePool) -> Result<usize> {
  let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(pool).await?;
  if existing > 0 {
    info!(existing, "Catalog already populated, skipping seed.");
    return Ok(0);
  }

  let demo = [
    ("Wireless Headphones 2", 12_999, 40),
    ("Ergonomic Keyboard 1", 8_950, 25),
    ("USB-C Charger 3", 2_499, 120),
    ("Portable Speaker 1", 5_999, 8),
    ("Compact Camera 4", 45_000, 3),
    ("Premium Monitor 2", 32_900, 12),
  ];
  for (name, price_cents, stock) in demo {
    create_product(pool, name, price_cents, stock).await?;
  }
  info!(count = demo.len(), "Seeded demo catalog.");
  Ok(demo.len())
}
