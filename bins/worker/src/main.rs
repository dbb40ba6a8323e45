//! Splitledger recurring-expense worker.
//!
//! Fires every due recurring template once a day at the configured local
//! hour, optionally once at startup, until Ctrl-C.

mod schedule;

use std::sync::Arc;

use anyhow::{Context, anyhow, ensure};
use chrono::Utc;
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splitledger_core::activity::ActivitySink;
use splitledger_core::directory::Directory;
use splitledger_core::ledger::ExpenseService;
use splitledger_core::recurring::RecurringService;
use splitledger_db::{
    ActivityRepository, DirectoryRepository, ExpenseRepository, RecurringRepository, connect_with,
};
use splitledger_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(config.logging.json);

    let tz: Tz = config
        .worker
        .timezone
        .parse()
        .map_err(|err| anyhow!("invalid worker.timezone '{}': {err}", config.worker.timezone))?;
    let run_at_hour = config.worker.run_at_hour;
    ensure!(run_at_hour < 24, "worker.run_at_hour must be 0-23, got {run_at_hour}");

    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let directory: Arc<dyn Directory> = Arc::new(DirectoryRepository::new(db.clone()));
    let activity: Arc<dyn ActivitySink> = Arc::new(ActivityRepository::new(db.clone()));
    let expenses = Arc::new(ExpenseService::new(
        Arc::new(ExpenseRepository::new(db.clone())),
        Arc::clone(&directory),
        activity,
        config.ledger.clone(),
    ));
    let recurring = RecurringService::new(Arc::new(RecurringRepository::new(db)), expenses, directory);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                cancel.cancel();
            }
        }
    });

    info!(timezone = %tz, run_at_hour, "recurring worker started");

    if config.worker.run_on_start {
        run_batch(&recurring, tz, &cancel).await;
    }

    loop {
        let now = Utc::now();
        let next = schedule::next_run(now, tz, run_at_hour);
        info!(next_run = %next, "waiting for next recurring batch");

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(schedule::delay_until(now, next)) => {}
        }
        run_batch(&recurring, tz, &cancel).await;
    }

    info!("recurring worker stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "splitledger=debug,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_batch(recurring: &RecurringService, tz: Tz, cancel: &CancellationToken) {
    let today = schedule::local_today(Utc::now(), tz);
    match recurring.process_due(today, cancel).await {
        Ok(report) => info!(
            %today,
            generated = report.generated(),
            failed = report.failed(),
            skipped = report.skipped(),
            "recurring batch complete"
        ),
        Err(err) => error!(%today, error = %err, "recurring batch could not start"),
    }
}
