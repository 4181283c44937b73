// server/src/config.rs

use crate::errors::{AppError, Result};
use chrono::NaiveTime;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use storefront::NotifierSettings;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,

  /// Recipient of low-stock alerts and daily reports.
  pub admin_email: String,
  pub mail_from: String,
  pub mail_timeout: Duration,

  pub low_stock_threshold: i64,
  pub notify_max_attempts: u32,

  pub report_schedule_enabled: bool,
  /// UTC time of day for the in-process report trigger.
  pub report_schedule_at: NaiveTime,

  pub seed_db: bool,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: "sqlite://storefront.db".to_string(),
      database_max_connections: 5,
      admin_email: "admin@example.com".to_string(),
      mail_from: "noreply@example.com".to_string(),
      mail_timeout: Duration::from_secs(10),
      low_stock_threshold: storefront::DEFAULT_LOW_STOCK_THRESHOLD,
      notify_max_attempts: storefront::notifier::DEFAULT_MAX_ATTEMPTS,
      report_schedule_enabled: false,
      report_schedule_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
      seed_db: false,
    }
  }
}

fn var_or(var_name: &str, default: &str) -> String {
  env::var(var_name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(var_name: &str, default: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  var_or(var_name, default)
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value: {}", var_name, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let report_schedule_at = NaiveTime::parse_from_str(var_or("REPORT_SCHEDULE_AT", "09:00").trim(), "%H:%M")
      .map_err(|e| AppError::Config(format!("Invalid REPORT_SCHEDULE_AT value (expected HH:MM): {}", e)))?;

    let config = Self {
      server_host: var_or("SERVER_HOST", "127.0.0.1"),
      server_port: parse_var("SERVER_PORT", "8080")?,
      database_url: var_or("DATABASE_URL", "sqlite://storefront.db"),
      database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "5")?,
      admin_email: var_or("ADMIN_EMAIL", "admin@example.com"),
      mail_from: var_or("MAIL_FROM", "noreply@example.com"),
      mail_timeout: Duration::from_secs(parse_var("MAIL_TIMEOUT_SECS", "10")?),
      low_stock_threshold: parse_var("LOW_STOCK_THRESHOLD", "5")?,
      notify_max_attempts: parse_var("NOTIFY_MAX_ATTEMPTS", "3")?,
      report_schedule_enabled: parse_var("REPORT_SCHEDULE_ENABLED", "false")?,
      report_schedule_at,
      seed_db: parse_var("SEED_DB", "false")?,
    };

    if config.low_stock_threshold < 0 {
      return Err(AppError::Config("LOW_STOCK_THRESHOLD must not be negative.".to_string()));
    }

    tracing::info!("Application configuration loaded successfully.");
    Ok(config)
  }

  pub fn server_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }

  pub fn notifier_settings(&self) -> NotifierSettings {
    NotifierSettings {
      admin_email: self.admin_email.clone(),
      max_attempts: self.notify_max_attempts,
      send_timeout: self.mail_timeout,
      ..Default::default()
    }
  }
}
