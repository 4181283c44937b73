// server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use storefront::{catalog, db, DailyReporter, LogMailer, Mailer};
use storefront_server::config::AppConfig;
use storefront_server::jobs;
use storefront_server::state::AppState;
use storefront_server::web::configure_app_routes;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "storefront-server", version, about = "Storefront HTTP API and daily sales report")]
struct Cli {
  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Run the HTTP API (default).
  Serve,
  /// Send the daily sales report and exit.
  Report {
    /// Day to report on (YYYY-MM-DD, UTC). Defaults to yesterday.
    #[arg(long)]
    date: Option<NaiveDate>,
  },
}

/// `RUST_LOG` overrides the level; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
  let builder = tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_span_events(FmtSpan::CLOSE);

  if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
    builder.json().init();
  } else {
    builder.init();
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  init_tracing();
  let cli = Cli::parse();

  let config = Arc::new(AppConfig::from_env().context("Failed to load application configuration")?);
  let pool = db::connect(&config.database_url, config.database_max_connections)
    .await
    .context("Failed to open the database")?;
  let mailer: Arc<dyn Mailer> = Arc::new(LogMailer::new(config.mail_from.clone()));

  match cli.command.unwrap_or(Command::Serve) {
    Command::Report { date } => {
      let reporter = DailyReporter::new(pool, mailer, config.admin_email.clone());
      jobs::run_daily_report(&reporter, date)
        .await
        .context("Daily sales report failed")?;
      Ok(())
    }
    Command::Serve => serve(config, pool, mailer).await,
  }
}

async fn serve(config: Arc<AppConfig>, pool: sqlx::SqlitePool, mailer: Arc<dyn Mailer>) -> anyhow::Result<()> {
  tracing::info!("Starting storefront server...");

  if config.seed_db {
    let inserted = catalog::seed_demo_catalog(&pool).await.context("Failed to seed database")?;
    tracing::info!(inserted, "Database seeding finished.");
  }

  if config.report_schedule_enabled {
    let reporter = Arc::new(DailyReporter::new(pool.clone(), mailer.clone(), config.admin_email.clone()));
    jobs::spawn_report_scheduler(reporter, config.report_schedule_at);
    tracing::info!(at = %config.report_schedule_at, "In-process daily report enabled.");
  }

  let (app_state, notifier_worker) = AppState::new(config.clone(), pool, mailer)?;

  let server_address = config.server_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await?;

  // The server's app factories held the last queue senders.
  let settings = config.notifier_settings();
  let grace = (settings.send_timeout + settings.retry_backoff) * settings.max_attempts.max(1);
  jobs::drain_notifier(notifier_worker, grace).await;

  Ok(())
}
