use wienergame_bot::bot::{self, AppState};
use wienergame_bot::config::{AppConfig, DatabaseConfig};
use wienergame_bot::{report, storage};
mod cli;

use std::time::Duration;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    use clap::Parser;
    let args = cli::Cli::parse();

    // Console-only logging with env-driven level
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(true)
        .init();

    match args.command {
        None => run_bot().await,
        Some(cmd) => {
            let db = match DatabaseConfig::load() {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(error=%e, "Failed to load config");
                    std::process::exit(2);
                }
            };
            let store = connect(&db).await;
            if let Err(e) = run_command(cmd, &store).await {
                tracing::error!(error=%e, "Command failed");
                std::process::exit(4);
            }
        }
    }
}

async fn run_command(cmd: cli::Command, store: &storage::Store) -> Result<(), bot::BotError> {
    match cmd {
        // connecting already applied pending migrations
        cli::Command::Migrate => tracing::info!("database schema is up to date"),
        cli::Command::ImportCsv { path } => {
            let rows = store.import_tasks_from_file(&path).await?;
            tracing::info!(rows, path=%path.display(), "task definitions imported");
        }
        cli::Command::Scores { json } => {
            let rows = store.get_all_user_scores().await?;
            if json {
                match serde_json::to_string_pretty(&rows) {
                    Ok(out) => println!("{out}"),
                    Err(e) => tracing::error!(error=%e, "Failed to encode scores"),
                }
            } else {
                for row in &rows {
                    println!("{}", wienergame_shared::report::score_line(row));
                }
            }
        }
        cli::Command::Report => {
            let config = load_config();
            let bot = Bot::new(&config.bot_token);
            let outcome = report::send_weekly_report(store, &bot).await?;
            store
                .mark_job_run(report::WEEKLY_REPORT_JOB, chrono::Utc::now())
                .await?;
            tracing::info!(?outcome, "report sent");
        }
    }
    Ok(())
}

fn load_config() -> AppConfig {
    match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error=%e, "Failed to load config");
            std::process::exit(2);
        }
    }
}

async fn connect(db: &DatabaseConfig) -> storage::Store {
    match storage::Store::connect(&db.connection_url(), db.pool_size).await {
        Ok(s) => {
            tracing::info!(target_db=%db.display_target(), "database ready");
            s
        }
        Err(e) => {
            tracing::error!(error=%e, target_db=%db.display_target(), "Failed to connect DB");
            std::process::exit(3);
        }
    }
}

async fn run_bot() {
    let config = load_config();
    let store = connect(&config.database).await;

    let bot = Bot::new(&config.bot_token);
    match bot.get_me().await {
        Ok(me) => tracing::info!(username=%me.username(), "Starting bot"),
        Err(e) => {
            tracing::error!(error=%e, "Failed to reach Telegram");
            std::process::exit(4);
        }
    }

    let shutdown_token = CancellationToken::new();
    let scheduler = report::ReportScheduler::new(
        store.clone(),
        bot.clone(),
        config.report.schedule,
        config.report.catch_up,
    );
    let mut scheduler_task = tokio::spawn(scheduler.run(shutdown_token.clone()));

    let state = AppState::new(store);
    let mut dispatcher = Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .build();

    // Wait for OS signal; then stop polling and the scheduler.
    let dispatcher_stop = dispatcher.shutdown_token();
    let token_for_signal = shutdown_token.clone();
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown: initiating graceful stop");
        token_for_signal.cancel();
        match dispatcher_stop.shutdown() {
            Ok(done) => done.await,
            Err(_) => tracing::warn!("shutdown: dispatcher was not running"),
        }
    });

    dispatcher.dispatch().await;
    signal_task.abort();
    shutdown_token.cancel();

    match tokio::time::timeout(Duration::from_secs(3), &mut scheduler_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error=%e, "scheduler task join error"),
        Err(_) => {
            tracing::warn!("shutdown: forcing scheduler abort due to timeout");
            scheduler_task.abort();
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(i), Ok(t)) => (i, t),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(error=%e, "cannot listen for shutdown signals");
                    return std::future::pending().await;
                }
            };
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("shutdown: received SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::info!("shutdown: received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown: received Ctrl+C");
    }
}
