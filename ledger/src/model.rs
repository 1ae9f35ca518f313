//! # Ledger Records
//!
//! The two record types everything else revolves around: [`Wallet`] (a
//! student or teacher account) and [`LedgerEntry`] (one row of the
//! append-only coin history).
//!
//! ## Addresses
//!
//! A wallet's public address is derived from its id: the `EDU-` prefix
//! plus the first eight hex characters of the UUID. Deterministic, short
//! enough to copy off a projector, and practically unique for any
//! classroom-sized population.
//!
//! ## PINs
//!
//! The PIN is a short random decimal secret generated once at wallet
//! creation and revealed to the caller exactly once. It is stored in
//! plaintext — the trust model here is "classroom", not "bank".
//!
//! ## Persistence
//!
//! Both records derive `Serialize`/`Deserialize` and are stored in sled
//! as single bincode-encoded key-value pairs.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ADDRESS_ID_CHARS, ADDRESS_PREFIX, PIN_DIGITS};

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// A single classroom wallet.
///
/// Created once via [`Wallet::create`]; only the balance ever changes
/// afterwards, and only through the store's atomic mint/transfer
/// transitions. Wallets are never deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wallet {
    /// Opaque unique identifier (hyphenated UUID v4). Primary key.
    pub id: String,

    /// Display name as supplied at creation, trimmed.
    pub name: String,

    /// Public address derived from the id. Unique secondary key.
    pub address: String,

    /// Shared-secret PIN authorizing outgoing transfers. Plaintext.
    pub pin: String,

    /// Current coin balance. Unsigned by construction — no wallet can
    /// ever go below zero.
    pub balance: u64,

    /// When this wallet was created (UTC).
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Creates a fresh wallet for the given (already validated) name.
    ///
    /// Generates the id, derives the address from it, rolls a random PIN,
    /// and starts the balance at zero. This is the only place a PIN is
    /// ever minted.
    pub fn create(name: &str) -> Self {
        let id = Uuid::new_v4();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            address: derive_address(&id),
            pin: generate_pin(),
            balance: 0,
            created_at: Utc::now(),
        }
    }
}

/// Derives the public address for a wallet id: the fixed prefix plus the
/// first [`ADDRESS_ID_CHARS`] hex characters of the UUID's simple form.
pub fn derive_address(id: &Uuid) -> String {
    let hex = id.simple().to_string();
    format!("{}{}", ADDRESS_PREFIX, &hex[..ADDRESS_ID_CHARS])
}

/// Generates a random PIN of [`PIN_DIGITS`] decimal digits.
fn generate_pin() -> String {
    let mut rng = rand::thread_rng();
    (0..PIN_DIGITS)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

// ---------------------------------------------------------------------------
// LedgerEntry
// ---------------------------------------------------------------------------

/// One row of the append-only coin history.
///
/// A `from` of `None` marks a mint — coins entering circulation from the
/// teacher rather than another wallet. Entries are created by the mint
/// and transfer operations and never mutated or deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Opaque unique identifier (hyphenated UUID v4).
    pub id: String,

    /// When the operation committed (UTC).
    pub timestamp: DateTime<Utc>,

    /// Sender address, or `None` for a mint.
    pub from: Option<String>,

    /// Recipient address.
    pub to: String,

    /// Coins moved. Always positive.
    pub amount: u64,

    /// Optional free-text note attached by the caller.
    pub note: Option<String>,
}

impl LedgerEntry {
    /// Builds a mint entry (no sender) for the given recipient.
    pub fn mint(to: &str, amount: u64, note: Option<String>) -> Self {
        Self::record(None, to, amount, note)
    }

    /// Builds a transfer entry between two wallets.
    pub fn transfer(from: &str, to: &str, amount: u64, note: Option<String>) -> Self {
        Self::record(Some(from.to_string()), to, amount, note)
    }

    fn record(from: Option<String>, to: &str, amount: u64, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            from,
            to: to.to_string(),
            amount,
            note,
        }
    }

    /// Returns `true` if this entry records a mint.
    pub fn is_mint(&self) -> bool {
        self.from.is_none()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
