//! # Command Execution
//!
//! Runs each subcommand against the shared operations layer and renders
//! the result, either as aligned text tables or as JSON when `--json`
//! is set. Rendering is split into pure `render_*` functions so the
//! table layouts can be tested without a terminal.

use anyhow::Result;

use educoin_ledger::config::DASHBOARD_LEDGER_LIMIT;
use educoin_ledger::model::Wallet;
use educoin_ledger::ops::{BalanceRow, LedgerRow, LedgerService};

use crate::Commands;

/// Executes the parsed subcommand and prints its output.
pub fn dispatch(service: &LedgerService, json: bool, command: Commands) -> Result<()> {
    match command {
        Commands::CreateWallet { name } => {
            let wallet = service.create_wallet(&name)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&wallet)?);
            } else {
                print!("{}", render_new_wallet(&wallet));
            }
        }
        Commands::Mint {
            to,
            amount,
            note,
            teacher_secret,
        } => {
            let receipt = service.mint(&teacher_secret, &to, amount, note)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&receipt)?);
            } else {
                println!(
                    "Minted {} coin(s) into {} (balance now {})",
                    receipt.amount, receipt.to, receipt.new_balance
                );
            }
        }
        Commands::Transfer {
            from,
            to,
            amount,
            pin,
            note,
        } => {
            let receipt = service.transfer(&from, &to, &pin, amount, note)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&receipt)?);
            } else {
                println!(
                    "Transferred {} coin(s) from {} to {}",
                    receipt.amount, receipt.from, receipt.to
                );
            }
        }
        Commands::Balances => {
            let rows = service.balances()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", render_balance_table(&rows));
            }
        }
        Commands::Leaderboard => {
            let rows = service.leaderboard()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", render_balance_table(&rows));
            }
        }
        Commands::Ledger { limit } => {
            let rows = service.ledger(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print!("{}", render_ledger_table(&rows));
            }
        }
        Commands::Dashboard => {
            // The dashboard lists students alphabetically; the ranked view
            // is what `balances` and `leaderboard` are for.
            let mut balances = service.balances()?;
            balances.sort_by(|a, b| a.name.cmp(&b.name));
            let recent = service.ledger(Some(DASHBOARD_LEDGER_LIMIT))?;
            if json {
                let dashboard = serde_json::json!({
                    "balances": balances,
                    "recent": recent,
                });
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                println!("Balances");
                println!("--------");
                print!("{}", render_balance_table(&balances));
                println!();
                println!("Recent activity");
                println!("---------------");
                print!("{}", render_ledger_table(&recent));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Renders the full record of a freshly created wallet. The PIN is only
/// ever shown here.
fn render_new_wallet(wallet: &Wallet) -> String {
    let mut out = String::from("Wallet created.\n");
    out.push_str(&format!("  Name    : {}\n", wallet.name));
    out.push_str(&format!("  Address : {}\n", wallet.address));
    out.push_str(&format!(
        "  PIN     : {}   (write it down, it is not shown again)\n",
        wallet.pin
    ));
    out
}

/// Renders balances as an aligned table, ranked from the top.
fn render_balance_table(rows: &[BalanceRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>3}  {:<20} {:<14} {:>10}\n",
        "#", "NAME", "ADDRESS", "BALANCE"
    ));
    for (i, row) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}  {:<20} {:<14} {:>10}\n",
            i + 1,
            row.name,
            row.address,
            row.balance
        ));
    }
    if rows.is_empty() {
        out.push_str("(no wallets yet)\n");
    }
    out
}

/// Renders ledger rows newest-first. Mints show `MINT` in the FROM column.
fn render_ledger_table(rows: &[LedgerRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<20} {:<14} {:<14} {:>8}  {}\n",
        "WHEN (UTC)", "FROM", "TO", "AMOUNT", "NOTE"
    ));
    for row in rows {
        out.push_str(&format!(
            "{:<20} {:<14} {:<14} {:>8}  {}\n",
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.from.as_deref().unwrap_or("MINT"),
            row.to,
            row.amount,
            row.note.as_deref().unwrap_or("")
        ));
    }
    if rows.is_empty() {
        out.push_str("(no activity yet)\n");
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use educoin_ledger::config::LedgerConfig;
    use educoin_ledger::store::LedgerDb;

    const SECRET: &str = "cli-test-secret";

    fn test_service() -> LedgerService {
        let db = Arc::new(LedgerDb::open_temporary().expect("temp db"));
        LedgerService::new(db, LedgerConfig::new(SECRET))
    }

    #[test]
    fn balance_table_ranks_from_one() {
        let service = test_service();
        let alice = service.create_wallet("Alice").unwrap();
        let bob = service.create_wallet("Bob").unwrap();
        service.mint(SECRET, &bob.address, 30, None).unwrap();
        service.mint(SECRET, &alice.address, 10, None).unwrap();

        let table = render_balance_table(&service.balances().unwrap());
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].contains("BALANCE"));
        assert!(lines[1].trim_start().starts_with("1"));
        assert!(lines[1].contains("Bob"));
        assert!(lines[2].contains("Alice"));
    }

    #[test]
    fn empty_tables_say_so() {
        assert!(render_balance_table(&[]).contains("(no wallets yet)"));
        assert!(render_ledger_table(&[]).contains("(no activity yet)"));
    }

    #[test]
    fn ledger_table_marks_mints() {
        let service = test_service();
        let alice = service.create_wallet("Alice").unwrap();
        service
            .mint(SECRET, &alice.address, 5, Some("quiz prize".into()))
            .unwrap();

        let table = render_ledger_table(&service.ledger(None).unwrap());
        assert!(table.contains("MINT"));
        assert!(table.contains(&alice.address));
        assert!(table.contains("quiz prize"));
    }

    #[test]
    fn new_wallet_rendering_reveals_the_pin() {
        let service = test_service();
        let wallet = service.create_wallet("Alice").unwrap();
        let text = render_new_wallet(&wallet);
        assert!(text.contains(&wallet.address));
        assert!(text.contains(&wallet.pin));
    }

    #[test]
    fn dispatch_runs_every_read_command() {
        let service = test_service();
        let alice = service.create_wallet("Alice").unwrap();
        service.mint(SECRET, &alice.address, 5, None).unwrap();

        for command in [
            Commands::Balances,
            Commands::Leaderboard,
            Commands::Ledger { limit: Some(10) },
            Commands::Dashboard,
        ] {
            dispatch(&service, true, command).expect("command should succeed");
        }
    }
}
