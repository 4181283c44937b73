// server/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;
use storefront::models::Product;
use storefront::money::format_cents;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProductResponse {
  pub id: i64,
  pub name: String,
  /// Two-decimal display price, e.g. "99.99".
  pub price: String,
  pub price_cents: i64,
  pub stock_quantity: i64,
  pub in_stock: bool,
}

impl From<Product> for ProductResponse {
  fn from(product: Product) -> Self {
    Self {
      in_stock: !product.is_out_of_stock(),
      price: format_cents(product.price_cents),
      id: product.id,
      name: product.name,
      price_cents: product.price_cents,
      stock_quantity: product.stock_quantity,
    }
  }
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products: Vec<ProductResponse> = app_state
    .storefront
    .list_products()
    .await?
    .into_iter()
    .map(ProductResponse::from)
    .collect();

  info!("Successfully fetched {} products.", products.len());
  Ok(HttpResponse::Ok().json(json!({
      "message": "Products fetched successfully.",
      "products": products
  })))
}
