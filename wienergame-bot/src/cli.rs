use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_EPILOG: &str = r#"Configuration is read from the environment (and a .env file):
  BOT_TOKEN              Telegram bot token (required to run the bot or send a report)
  DATABASE_URL           full PostgreSQL URL; overrides the DB_* parts below
  DB_HOST / DB_PORT      (default: localhost / 5432)
  DB_NAME                (default: bot_database)
  DB_USER / DB_PASSWORD  (default: bot_user / bot_password)
  DB_POOL_SIZE           (default: 8)
  REPORT_SCHEDULE        weekly slot, e.g. "thu 13:00" (default)
  REPORT_TIMEZONE        IANA timezone (default: Europe/Kyiv)
  REPORT_CATCH_UP_HOURS  send a missed report this late after startup (default: 6)
  RUST_LOG               log filter (default: info)
"#;

#[derive(Debug, Parser)]
#[command(
    name = "wienergame-bot",
    version,
    about = "WienerGame Telegram score bot",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Optional subcommand. Without one, runs the bot.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply database migrations and exit
    Migrate,
    /// Import task definitions from a CSV file (columns: task_description, points)
    ImportCsv {
        /// Path to the CSV file
        path: PathBuf,
    },
    /// Print the current leaderboard
    Scores {
        /// Print as a JSON array instead of `username - score` lines
        #[arg(long)]
        json: bool,
    },
    /// Send the weekly report right now
    Report,
}
