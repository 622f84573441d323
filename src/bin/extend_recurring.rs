use std::error::Error;

use clap::Parser;
use rusqlite::Connection;

use budget_cycle::{
    UserID, get_user_by_id, initialize_db, logging::setup_logging,
    recurring::extend_recurring_transactions, timezone::today_in,
};

/// Generate recurring transactions up to a year ahead of today for a user.
///
/// Safe to run repeatedly, e.g. from a daily cron job. Prints a JSON report of
/// what was generated.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The user whose recurring transactions are extended.
    #[arg(long)]
    user_id: i64,

    /// Override the user's timezone when working out today's date.
    #[arg(long, env = "BUDGET_TIMEZONE")]
    timezone: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();

    let conn = Connection::open(&args.db_path)?;
    initialize_db(&conn)?;

    let user = get_user_by_id(UserID::new(args.user_id), &conn)?;
    let config = user.billing_config()?;
    let timezone = args.timezone.as_deref().unwrap_or(&user.timezone);
    let today = today_in(timezone)?;

    tracing::info!("Extending recurring transactions of user {} as of {today}", user.id);

    let report = extend_recurring_transactions(user.id, &config, today, &conn)?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
