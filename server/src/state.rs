// server/src/state.rs
use crate::config::AppConfig;
use crate::errors::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use storefront::{LowStockNotifier, Mailer, NotifierQueue, Storefront};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct AppState {
  pub storefront: Storefront,
  /// Post-commit low-stock checks are handed to this queue's worker.
  pub notifier_queue: NotifierQueue,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Builds the shared state and starts the low-stock notifier worker on the
  /// current runtime.
  pub fn new(config: Arc<AppConfig>, pool: SqlitePool, mailer: Arc<dyn Mailer>) -> Result<(Self, JoinHandle<()>)> {
    let storefront = Storefront::new(pool.clone(), config.low_stock_threshold)?;
    let notifier = LowStockNotifier::new(pool, mailer, config.notifier_settings());
    let (notifier_queue, worker) = NotifierQueue::spawn(notifier);

    Ok((
      Self {
        storefront,
        notifier_queue,
        config,
      },
      worker,
    ))
  }
}
