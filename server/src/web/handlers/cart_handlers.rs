// server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storefront::models::CartView;
use storefront::money::format_cents;
use storefront::StoreError;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Serialize)]
pub struct CartLineResponse {
  pub id: i64,
  pub product_id: i64,
  pub product_name: String,
  pub product_price: String,
  pub quantity: i64,
  pub subtotal: String,
  pub stock_quantity: i64,
}

#[derive(Serialize)]
pub struct CartResponse {
  pub id: i64,
  pub items: Vec<CartLineResponse>,
  pub total: String,
  pub total_cents: i64,
}

impl From<CartView> for CartResponse {
  fn from(view: CartView) -> Self {
    let items = view
      .lines
      .into_iter()
      .map(|line| CartLineResponse {
        id: line.item_id,
        subtotal: format_cents(line.subtotal_cents()),
        product_price: format_cents(line.price_cents),
        product_id: line.product_id,
        product_name: line.product_name,
        quantity: line.quantity,
        stock_quantity: line.stock_quantity,
      })
      .collect();
    Self {
      id: view.cart_id,
      items,
      total: format_cents(view.total_cents),
      total_cents: view.total_cents,
    }
  }
}

// --- Request DTOs ---
// Fields stay untyped so a wrong-typed value is reported under its own key.
#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  #[serde(default)]
  pub product_id: Option<Value>,
  #[serde(default)]
  pub quantity: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateCartItemPayload {
  #[serde(default)]
  pub quantity: Option<Value>,
}

/// `null` or absent is `None`; integers and integer strings are accepted.
fn integer_field(field: &'static str, label: &str, value: Option<Value>) -> Result<Option<i64>, StoreError> {
  let parsed = match value {
    None | Some(Value::Null) => return Ok(None),
    Some(Value::Number(n)) => n.as_i64(),
    Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
    Some(_) => None,
  };
  parsed
    .map(Some)
    .ok_or_else(|| StoreError::validation(field, format!("The {} field must be an integer.", label)))
}

#[instrument(name = "handler::view_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let view = app_state.storefront.view_cart(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "cart": CartResponse::from(view) })))
}

#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, product_id = ?req_payload.product_id, quantity = ?req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let product_id = integer_field("product_id", "product id", payload.product_id)?;
  let quantity = integer_field("quantity", "quantity", payload.quantity)?;
  let outcome = app_state
    .storefront
    .add_to_cart(auth_user.user_id, product_id, quantity)
    .await?;

  info!(
    "Add to cart successful for user: {}. Item ID: {}, Product ID: {}, New Quantity: {}",
    auth_user.user_id, outcome.item.id, outcome.item.product_id, outcome.item.quantity
  );

  let message = if outcome.merged_into_existing {
    "Product quantity updated in cart."
  } else {
    "Product added to cart successfully."
  };
  Ok(HttpResponse::Ok().json(json!({
      "message": message,
      "cartItem": outcome.item
  })))
}

#[instrument(
    name = "handler::update_cart_item",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, item_id = %path.as_ref())
)]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  req_payload: web::Json<UpdateCartItemPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  let quantity = integer_field("quantity", "quantity", req_payload.into_inner().quantity);
  // Ownership is checked before a malformed quantity is reported.
  let quantity = match quantity {
    Ok(quantity) => quantity,
    Err(e) => {
      app_state.storefront.ensure_cart_item_owner(auth_user.user_id, item_id).await?;
      return Err(e.into());
    }
  };

  let item = app_state
    .storefront
    .update_cart_item(auth_user.user_id, item_id, quantity)
    .await?;

  Ok(HttpResponse::Ok().json(json!({
      "message": "Cart item quantity updated.",
      "cartItem": item
  })))
}

#[instrument(
    name = "handler::remove_cart_item",
    skip(app_state, auth_user),
    fields(user_id = %auth_user.user_id, item_id = %path.as_ref())
)]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  app_state.storefront.remove_cart_item(auth_user.user_id, item_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Item removed from cart." })))
}
