// core/src/lib.rs

//! Storefront core: product inventory, per-user carts, transactional checkout,
//! low-stock alerting and the daily sales report.
//!
//! Multi-step operations (adding to a cart, checking out) run as named-step
//! pipelines from [`flow`]; the [`Storefront`] facade owns the registered
//! pipelines together with the database pool.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod db;
pub mod error;
pub mod flow;
pub mod mail;
pub mod models;
pub mod money;
pub mod notifier;
pub mod reporting;
pub mod storefront;

pub use crate::cart::AddToCartOutcome;
pub use crate::checkout::{CheckoutOutcome, SaleSummary, DEFAULT_LOW_STOCK_THRESHOLD};
pub use crate::error::{Result, StoreError};
pub use crate::mail::{DeliveryReceipt, EmailKind, LogMailer, Mailer, OutgoingEmail};
pub use crate::notifier::{LowStockCheck, LowStockNotifier, LowStockOutcome, NotifierQueue, NotifierSettings};
pub use crate::reporting::{DailyReporter, ProductSales, ReportSummary};
pub use crate::storefront::Storefront;
