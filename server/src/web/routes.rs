// server/src/web/routes.rs

use actix_web::{web, HttpResponse};
use storefront::StoreError;

use crate::errors::AppError;
use crate::web::handlers::{cart_handlers, checkout_handlers, product_handlers};

/// Malformed JSON bodies become field-keyed 422s like any other validation error.
pub fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req| {
    AppError::from(StoreError::validation("body", format!("The request body is invalid: {}", err))).into()
  })
}

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(json_config()).service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(web::scope("/products").route("", web::get().to(product_handlers::list_products_handler)))
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::view_cart_handler))
          .route("", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
          .route("/items/{item_id}", web::put().to(cart_handlers::update_cart_item_handler))
          .route("/items/{item_id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
      ),
  );
}
