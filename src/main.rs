//! simple_bank command line
//!
//! ```text
//! simple_bank [-e <env>] transfer <from_account_id> <to_account_id> <amount>
//! simple_bank [-e <env>] account <account_id>
//! ```
//!
//! Results are printed to stdout as JSON.

use anyhow::{Context, bail};

use simple_bank::config::AppConfig;
use simple_bank::db::Database;
use simple_bank::logging::init_logging;
use simple_bank::store::{Store, TransferTxParams};

fn get_env(args: &[String]) -> String {
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Positional arguments with the `--env` pair removed
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args.iter().skip(1) {
        if skip {
            skip = false;
            continue;
        }
        if arg == "--env" || arg == "-e" {
            skip = true;
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn parse_id(value: &str, name: &str) -> anyhow::Result<i64> {
    value
        .parse()
        .with_context(|| format!("{} must be an integer, got '{}'", name, value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let env = get_env(&args);

    let config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&config);

    tracing::info!("Starting simple_bank in {} mode", env);

    let db = Database::connect(&config.database)
        .await
        .context("cannot connect to db")?;
    db.health_check().await.context("database health check failed")?;
    let store = db.store();

    match positional(&args).as_slice() {
        ["transfer", from, to, amount] => {
            let arg = TransferTxParams {
                from_account_id: parse_id(from, "from_account_id")?,
                to_account_id: parse_id(to, "to_account_id")?,
                amount: parse_id(amount, "amount")?,
            };
            match store.transfer_tx(arg).await {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(e) => {
                    tracing::error!(code = e.code(), status = e.http_status(), error = %e, "Transfer failed");
                    return Err(e.into());
                }
            }
        }
        ["account", id] => {
            let account = store.get_account(parse_id(id, "account_id")?).await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        _ => bail!(
            "usage: simple_bank [-e <env>] transfer <from> <to> <amount> | account <id>"
        ),
    }

    Ok(())
}
