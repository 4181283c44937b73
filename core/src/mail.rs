// core/src/mail.rs

//! Outbound email: the `Mailer` transport seam and the two message kinds the
//! storefront sends (low-stock alert, daily sales report).

use crate::error::{Result, StoreError};
use crate::models::Product;
use crate::money::{format_cents, format_count};
use crate::reporting::ReportSummary;
use async_trait::async_trait;
use std::fmt::Write as _;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
  LowStockAlert,
  DailySalesReport,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
  pub kind: EmailKind,
  pub to: String,
  pub subject: String,
  pub html_body: String,
}

#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
  pub message_id: String,
}

/// A mail transport. Implementations report transport failures as
/// `StoreError::Delivery`.
#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt>;
}

/// Transport that records each message in the log instead of delivering it.
#[derive(Debug, Clone)]
pub struct LogMailer {
  from: String,
}

impl LogMailer {
  pub fn new(from: impl Into<String>) -> Self {
    Self { from: from.into() }
  }
}

#[async_trait]
impl Mailer for LogMailer {
  #[instrument(name = "LogMailer::send", skip_all, fields(to = %email.to, kind = ?email.kind))]
  async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt> {
    if email.to.trim().is_empty() {
      warn!("Refusing to send email without a recipient.");
      return Err(StoreError::Delivery("Recipient address is empty.".to_string()));
    }

    let message_id = format!("log_{}", uuid::Uuid::new_v4());
    let body_preview: String = email.html_body.chars().take(80).collect();
    info!(
      from = %self.from,
      subject = %email.subject,
      %message_id,
      "Email accepted by log transport: {}...",
      body_preview
    );
    Ok(DeliveryReceipt { message_id })
  }
}

fn escape_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for ch in raw.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(ch),
    }
  }
  out
}

impl OutgoingEmail {
  pub fn low_stock_alert(to: &str, product: &Product, threshold: i64) -> Self {
    let name = escape_html(&product.name);
    let html_body = format!(
      "<h1>Low Stock Alert</h1>\
       <p>Hello Admin,</p>\
       <p>A product in your inventory has fallen below the stock threshold.</p>\
       <h2>{name}</h2>\
       <p><strong>Current Stock:</strong> {stock} units</p>\
       <p><strong>Stock Threshold:</strong> {threshold} units</p>\
       <p><strong>Product Price:</strong> ${price}</p>\
       <p>Please consider restocking this product to avoid running out of inventory.</p>",
      stock = product.stock_quantity,
      price = format_cents(product.price_cents),
    );

    Self {
      kind: EmailKind::LowStockAlert,
      to: to.to_string(),
      subject: format!("Low Stock Alert: {}", product.name),
      html_body,
    }
  }

  pub fn daily_sales_report(to: &str, report: &ReportSummary) -> Self {
    let date = report.date.format("%Y-%m-%d");
    let mut html_body = format!(
      "<h1>Daily Sales Report</h1><p>{date}</p>\
       <h2>Summary</h2>\
       <p>Total Revenue: ${revenue}</p>\
       <p>Total Items Sold: {items}</p>\
       <p>Products Sold: {count}</p>\
       <h2>Product Sales Breakdown</h2>\
       <table><thead><tr><th>Product</th><th>Quantity Sold</th><th>Revenue</th></tr></thead><tbody>",
      revenue = format_cents(report.total_revenue_cents),
      items = format_count(report.total_quantity),
      count = report.product_count,
    );
    for line in &report.products {
      // Writing into a String cannot fail.
      let _ = write!(
        html_body,
        "<tr><td>{}</td><td>{}</td><td>${}</td></tr>",
        escape_html(&line.product_name),
        format_count(line.quantity_sold),
        format_cents(line.revenue_cents)
      );
    }
    let _ = write!(
      html_body,
      "</tbody><tfoot><tr><td>Total</td><td>{}</td><td>${}</td></tr></tfoot></table>",
      format_count(report.total_quantity),
      format_cents(report.total_revenue_cents)
    );

    Self {
      kind: EmailKind::DailySalesReport,
      to: to.to_string(),
      subject: format!("Daily Sales Report - {date}"),
      html_body,
    }
  }
}
