// core/src/reporting.rs

//! Daily sales report: aggregates one UTC calendar day of sales per product
//! and mails the summary to the administrator.

use crate::error::{Result, StoreError};
use crate::mail::{Mailer, OutgoingEmail};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
  pub product_id: i64,
  pub product_name: String,
  pub quantity_sold: i64,
  pub revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
  pub date: NaiveDate,
  /// Sorted by revenue, highest first. Ties keep first-sale order.
  pub products: Vec<ProductSales>,
  pub total_revenue_cents: i64,
  pub total_quantity: i64,
  pub product_count: usize,
  pub email_sent: bool,
}

impl ReportSummary {
  pub fn has_sales(&self) -> bool {
    !self.products.is_empty()
  }
}

#[derive(Debug, FromRow)]
struct SaleRow {
  product_id: i64,
  product_name: String,
  quantity: i64,
  total_cents: i64,
}

/// The day a report covers when none is given: yesterday, in UTC.
pub fn default_report_date(now: DateTime<Utc>) -> Result<NaiveDate> {
  now
    .date_naive()
    .pred_opt()
    .ok_or_else(|| StoreError::Internal(format!("No calendar day precedes {}.", now.date_naive())))
}

/// `[start, end)` of `date` in UTC.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
  let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
  (start, start + Duration::days(1))
}

/// First instant strictly after `now` whose UTC time of day is `at`.
pub fn next_daily_run(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
  let today = Utc.from_utc_datetime(&now.date_naive().and_time(at));
  if today > now {
    today
  } else {
    today + Duration::days(1)
  }
}

fn aggregate(date: NaiveDate, rows: Vec<SaleRow>) -> ReportSummary {
  let mut products: Vec<ProductSales> = Vec::new();
  let mut index: HashMap<i64, usize> = HashMap::new();

  for row in rows {
    match index.get(&row.product_id) {
      Some(&idx) => {
        products[idx].quantity_sold += row.quantity;
        products[idx].revenue_cents += row.total_cents;
      }
      None => {
        index.insert(row.product_id, products.len());
        products.push(ProductSales {
          product_id: row.product_id,
          product_name: row.product_name,
          quantity_sold: row.quantity,
          revenue_cents: row.total_cents,
        });
      }
    }
  }

  // `sort_by` is stable.
  products.sort_by(|a, b| b.revenue_cents.cmp(&a.revenue_cents));

  ReportSummary {
    date,
    total_revenue_cents: products.iter().map(|p| p.revenue_cents).sum(),
    total_quantity: products.iter().map(|p| p.quantity_sold).sum(),
    product_count: products.len(),
    products,
    email_sent: false,
  }
}

pub struct DailyReporter {
  pool: SqlitePool,
  mailer: Arc<dyn Mailer>,
  admin_email: String,
}

impl DailyReporter {
  pub fn new(pool: SqlitePool, mailer: Arc<dyn Mailer>, admin_email: impl Into<String>) -> Self {
    Self {
      pool,
      mailer,
      admin_email: admin_email.into(),
    }
  }

  /// Aggregates the sales of `date` without sending anything.
  #[instrument(name = "reporting::summarize", skip(self), err(Display))]
  pub async fn summarize(&self, date: NaiveDate) -> Result<ReportSummary> {
    let (start, end) = day_bounds(date);
    let rows: Vec<SaleRow> = sqlx::query_as(
      "SELECT s.product_id, p.name AS product_name, s.quantity, s.total_cents \
       FROM sales s JOIN products p ON p.id = s.product_id \
       WHERE s.created_at >= ?1 AND s.created_at < ?2 \
       ORDER BY s.created_at ASC, s.id ASC",
    )
    .bind(start)
    .bind(end)
    .fetch_all(&self.pool)
    .await?;

    Ok(aggregate(date, rows))
  }

  /// Reports on `date`, or on yesterday (UTC) when `date` is `None`.
  pub async fn generate(&self, date: Option<NaiveDate>) -> Result<ReportSummary> {
    self.generate_at(date, Utc::now()).await
  }

  /// Same as `generate`, with "yesterday" computed relative to `now`.
  #[instrument(name = "reporting::generate", skip(self, now), err(Display))]
  pub async fn generate_at(&self, date: Option<NaiveDate>, now: DateTime<Utc>) -> Result<ReportSummary> {
    let date = match date {
      Some(date) => date,
      None => default_report_date(now)?,
    };

    info!("Generating daily sales report for {}.", date);
    let mut summary = self.summarize(date).await?;

    if !summary.has_sales() {
      info!("No sales found for {}. Report email not sent.", date);
      return Ok(summary);
    }

    let email = OutgoingEmail::daily_sales_report(&self.admin_email, &summary);
    let receipt = self.mailer.send(&email).await?;
    summary.email_sent = true;

    info!(
      message_id = %receipt.message_id,
      "Daily sales report sent for {}: {} products, {} items, {} cents revenue.",
      date,
      summary.product_count,
      summary.total_quantity,
      summary.total_revenue_cents
    );
    Ok(summary)
  }
}
