// server/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use storefront::money::format_cents;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::checkout", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let outcome = app_state.storefront.checkout(auth_user.user_id).await?;

  // The sale is committed; alert delivery happens off the request path.
  let expected = outcome.low_stock_checks.len();
  let queued = app_state.notifier_queue.enqueue_all(outcome.low_stock_checks);
  if queued < expected {
    warn!(expected, queued, "Some low-stock checks could not be queued.");
  }

  let summary = outcome.summary;
  info!(
    "Checkout completed for user: {}. {} sales, total {}.",
    auth_user.user_id,
    summary.line_count,
    format_cents(summary.total_cents)
  );

  Ok(HttpResponse::Ok().json(json!({
      "message": "Checkout completed successfully! Thank you for your purchase.",
      "sale": {
          "saleIds": summary.sale_ids,
          "lineCount": summary.line_count,
          "totalQuantity": summary.total_quantity,
          "total": format_cents(summary.total_cents),
          "totalCents": summary.total_cents,
          "completedAt": summary.completed_at,
      },
      "lowStockChecksQueued": queued
  })))
}
