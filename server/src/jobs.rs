// server/src/jobs.rs

//! The daily sales report, run once from the CLI or on an in-process timer.

use chrono::{NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use storefront::reporting::next_daily_run;
use storefront::{DailyReporter, ReportSummary};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::errors::Result;

#[instrument(name = "jobs::run_daily_report", skip(reporter), err(Display))]
pub async fn run_daily_report(reporter: &DailyReporter, date: Option<NaiveDate>) -> Result<ReportSummary> {
  let summary = reporter.generate(date).await?;
  if summary.email_sent {
    info!(
      "Daily sales report for {} sent: {} products, {} items.",
      summary.date, summary.product_count, summary.total_quantity
    );
  } else {
    info!("No sales on {}; nothing to report.", summary.date);
  }
  Ok(summary)
}

/// Runs the report for the previous UTC day every day at `at` (UTC).
/// Failures are logged and the loop waits for the next day.
pub fn spawn_report_scheduler(reporter: Arc<DailyReporter>, at: NaiveTime) -> JoinHandle<()> {
  tokio::spawn(async move {
    loop {
      let now = Utc::now();
      let next = next_daily_run(now, at);
      let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
      info!(next_run = %next, "Daily report scheduled.");
      tokio::time::sleep(wait).await;

      if let Err(e) = run_daily_report(&reporter, None).await {
        error!("Scheduled daily report failed: {}", e);
      }
    }
  })
}

/// Waits for the low-stock worker to finish the checks still queued. Every
/// `NotifierQueue` clone must be dropped first or this waits out `grace`.
/// Returns `false` if the worker did not stop in time.
pub async fn drain_notifier(worker: JoinHandle<()>, grace: Duration) -> bool {
  match tokio::time::timeout(grace, worker).await {
    Ok(Ok(())) => {
      info!("Low-stock notifier drained.");
      true
    }
    Ok(Err(e)) => {
      error!("Low-stock notifier worker failed: {}", e);
      false
    }
    Err(_) => {
      warn!(?grace, "Low-stock notifier still busy at shutdown; pending checks dropped.");
      false
    }
  }
}
