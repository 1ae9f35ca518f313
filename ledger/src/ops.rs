//! # Ledger Operations
//!
//! The one business-operations layer both front-ends consume. Every
//! operation validates its inputs, checks authorization where required,
//! and delegates the actual state change to the store's atomic
//! transitions. Checks run in a fixed order:
//!
//! - **mint**: teacher secret, then input validation, then recipient lookup.
//! - **transfer**: input validation, then wallet lookups, then the PIN,
//!   then funds (checked again inside the storage transaction).
//!
//! Failures are precondition violations surfaced synchronously as
//! [`LedgerError`]; a rejected operation leaves no trace in storage.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{LedgerConfig, LEADERBOARD_SIZE, LEDGER_DEFAULT_LIMIT, LEDGER_MAX_LIMIT};
use crate::error::{LedgerError, LedgerResult};
use crate::model::{LedgerEntry, Wallet};
use crate::store::LedgerDb;

/// Attempts before giving up on deriving a non-colliding address.
const CREATE_RETRIES: usize = 3;

// ---------------------------------------------------------------------------
// Receipts & Views
// ---------------------------------------------------------------------------

/// Receipt returned by a successful mint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MintReceipt {
    /// Id of the appended ledger entry.
    pub tx_id: String,
    /// Recipient address.
    pub to: String,
    /// Coins minted.
    pub amount: u64,
    /// Recipient balance after the credit.
    pub new_balance: u64,
}

/// Receipt returned by a successful transfer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Id of the appended ledger entry.
    pub tx_id: String,
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Coins moved.
    pub amount: u64,
}

/// One row of the balances / leaderboard views.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceRow {
    /// Wallet display name.
    pub name: String,
    /// Public address.
    pub address: String,
    /// Current balance.
    pub balance: u64,
}

/// One row of the ledger view — the public projection of a
/// [`LedgerEntry`], without the internal entry id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerRow {
    /// When the operation committed (UTC).
    pub timestamp: DateTime<Utc>,
    /// Sender address, or `None` for a mint.
    pub from: Option<String>,
    /// Recipient address.
    pub to: String,
    /// Coins moved.
    pub amount: u64,
    /// Free-text note, if any.
    pub note: Option<String>,
}

impl From<LedgerEntry> for LedgerRow {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            from: entry.from,
            to: entry.to,
            amount: entry.amount,
            note: entry.note,
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerService
// ---------------------------------------------------------------------------

/// The shared operations layer.
///
/// Construct once with the store and the resolved configuration, then
/// share freely — it's `Send + Sync` and every method takes `&self`.
#[derive(Clone)]
pub struct LedgerService {
    db: Arc<LedgerDb>,
    config: LedgerConfig,
}

impl LedgerService {
    /// Creates the service over an opened store with an explicit
    /// configuration object.
    pub fn new(db: Arc<LedgerDb>, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Returns the underlying store.
    pub fn db(&self) -> &Arc<LedgerDb> {
        &self.db
    }

    // -- Wallet creation ------------------------------------------------------

    /// Creates a wallet for the given display name.
    ///
    /// Returns the full record — including the PIN, the only time it is
    /// ever revealed in plaintext.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] if the name is empty after trimming.
    pub fn create_wallet(&self, name: &str) -> LedgerResult<Wallet> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("name required"));
        }

        let mut last_address = String::new();
        for _ in 0..CREATE_RETRIES {
            let wallet = Wallet::create(name);
            match self.db.create_wallet(&wallet) {
                Ok(()) => {
                    tracing::info!(
                        address = %wallet.address,
                        name = %wallet.name,
                        "wallet created"
                    );
                    return Ok(wallet);
                }
                // Truncated-UUID collision. Roll a new identity and retry.
                Err(LedgerError::AddressTaken { address }) => last_address = address,
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::AddressTaken {
            address: last_address,
        })
    }

    // -- Mint -----------------------------------------------------------------

    /// Mints `amount` coins into the wallet at `to`.
    ///
    /// # Errors
    ///
    /// In order: [`LedgerError::Unauthorized`] if `secret` does not match
    /// the configured teacher secret, [`LedgerError::Validation`] if the
    /// address is empty or the amount is zero, [`LedgerError::NotFound`]
    /// if no wallet has that address.
    pub fn mint(
        &self,
        secret: &str,
        to: &str,
        amount: u64,
        note: Option<String>,
    ) -> LedgerResult<MintReceipt> {
        if !secrets_match(secret, &self.config.teacher_secret) {
            return Err(LedgerError::Unauthorized("invalid teacher secret".into()));
        }

        let to = to.trim();
        if to.is_empty() {
            return Err(LedgerError::validation("to address required"));
        }
        if amount == 0 {
            return Err(LedgerError::validation("amount must be positive"));
        }

        let wallet_id = self
            .db
            .resolve_address(to)?
            .ok_or_else(|| LedgerError::unknown_address(to))?;

        let entry = LedgerEntry::mint(to, amount, note);
        let new_balance = self.db.apply_mint(&wallet_id, amount, &entry)?;

        tracing::info!(to = %to, amount, new_balance, tx_id = %entry.id, "coins minted");
        Ok(MintReceipt {
            tx_id: entry.id,
            to: to.to_string(),
            amount,
            new_balance,
        })
    }

    // -- Transfer -------------------------------------------------------------

    /// Moves `amount` coins from `from` to `to`, authorized by the
    /// sender's PIN.
    ///
    /// # Errors
    ///
    /// In order: [`LedgerError::Validation`] for an empty address, a zero
    /// amount, or a self-transfer; [`LedgerError::NotFound`] if either
    /// wallet does not exist; [`LedgerError::Unauthorized`] on a PIN
    /// mismatch; [`LedgerError::InsufficientFunds`] if the sender's
    /// balance is too small. Rejections are all-or-nothing — no balance
    /// moves and no ledger row is appended.
    pub fn transfer(
        &self,
        from: &str,
        to: &str,
        pin: &str,
        amount: u64,
        note: Option<String>,
    ) -> LedgerResult<TransferReceipt> {
        let from = from.trim();
        let to = to.trim();
        if from.is_empty() || to.is_empty() {
            return Err(LedgerError::validation("from and to addresses required"));
        }
        if amount == 0 {
            return Err(LedgerError::validation("amount must be positive"));
        }
        if from == to {
            return Err(LedgerError::validation("cannot transfer to the sending wallet"));
        }

        let sender = self
            .db
            .wallet_by_address(from)?
            .ok_or_else(|| LedgerError::unknown_address(from))?;
        let recipient_id = self
            .db
            .resolve_address(to)?
            .ok_or_else(|| LedgerError::unknown_address(to))?;

        if !secrets_match(pin, &sender.pin) {
            return Err(LedgerError::Unauthorized("invalid PIN".into()));
        }

        let entry = LedgerEntry::transfer(from, to, amount, note);
        let (sender_balance, _) =
            self.db
                .apply_transfer(&sender.id, &recipient_id, amount, &entry)?;

        tracing::info!(
            from = %from,
            to = %to,
            amount,
            sender_balance,
            tx_id = %entry.id,
            "coins transferred"
        );
        Ok(TransferReceipt {
            tx_id: entry.id,
            from: from.to_string(),
            to: to.to_string(),
            amount,
        })
    }

    // -- Queries --------------------------------------------------------------

    /// All wallets, descending by balance (name breaks ties).
    pub fn balances(&self) -> LedgerResult<Vec<BalanceRow>> {
        let mut rows: Vec<BalanceRow> = self
            .db
            .wallets()?
            .into_iter()
            .map(|w| BalanceRow {
                name: w.name,
                address: w.address,
                balance: w.balance,
            })
            .collect();
        rows.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }

    /// The top [`LEADERBOARD_SIZE`] wallets by balance.
    pub fn leaderboard(&self) -> LedgerResult<Vec<BalanceRow>> {
        let mut rows = self.balances()?;
        rows.truncate(LEADERBOARD_SIZE);
        Ok(rows)
    }

    /// The most recent ledger rows, newest first.
    ///
    /// `limit` defaults to [`LEDGER_DEFAULT_LIMIT`] and is clamped to
    /// [`LEDGER_MAX_LIMIT`].
    pub fn ledger(&self, limit: Option<usize>) -> LedgerResult<Vec<LedgerRow>> {
        let limit = limit.unwrap_or(LEDGER_DEFAULT_LIMIT).min(LEDGER_MAX_LIMIT);
        let entries = self.db.entries(limit)?;
        Ok(entries.into_iter().map(LedgerRow::from).collect())
    }
}

/// Compares two shared secrets without leaking timing information.
///
/// Hashing both sides first makes the comparison length-independent, and
/// `blake3::Hash` equality is constant-time.
fn secrets_match(supplied: &str, expected: &str) -> bool {
    blake3::hash(supplied.as_bytes()) == blake3::hash(expected.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
