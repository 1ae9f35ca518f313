//! # LedgerDb — Persistent Storage Engine
//!
//! The persistence layer for the classroom ledger, built on sled's
//! embedded key-value store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees" (analogous to tables in SQL).
//! Each tree is an independent B+ tree with its own keyspace:
//!
//! | Tree        | Key                                | Value                  |
//! |-------------|------------------------------------|------------------------|
//! | `wallets`   | wallet id (UTF-8)                  | `bincode(Wallet)`      |
//! | `addresses` | address (UTF-8)                    | wallet id (UTF-8)      |
//! | `entries`   | timestamp millis (8B BE) ++ entry id | `bincode(LedgerEntry)` |
//!
//! Entry keys start with the big-endian millisecond timestamp so that
//! sled's lexicographic ordering matches chronological ordering — a
//! reverse scan yields the ledger newest-first, and the entry id suffix
//! breaks same-millisecond ties.
//!
//! ## Atomicity
//!
//! Mint and transfer are read-modify-write sequences: read a balance,
//! compute the new one, write it back, append the ledger row. Running
//! those as separate round trips is how balances get silently lost under
//! concurrent requests, so [`apply_mint`](LedgerDb::apply_mint) and
//! [`apply_transfer`](LedgerDb::apply_transfer) execute the whole sequence
//! inside one serializable sled transaction spanning the `wallets` and
//! `entries` trees. Either every write lands — both balance legs and the
//! ledger row — or none do.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::{Db, Tree};
use std::path::Path;

use crate::error::{LedgerError, LedgerResult};
use crate::model::{LedgerEntry, Wallet};

// ---------------------------------------------------------------------------
// Serialization Helpers
// ---------------------------------------------------------------------------

fn encode<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> LedgerResult<T> {
    bincode::deserialize(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// Composite key for a ledger entry: timestamp millis (BE) ++ entry id.
fn entry_key(entry: &LedgerEntry) -> Vec<u8> {
    let ts = entry.timestamp.timestamp_millis().max(0) as u64;
    let mut key = Vec::with_capacity(8 + entry.id.len());
    key.extend_from_slice(&ts.to_be_bytes());
    key.extend_from_slice(entry.id.as_bytes());
    key
}

/// Collapses a sled transaction result into a plain [`LedgerResult`].
fn unwrap_txn<T>(result: Result<T, TransactionError<LedgerError>>) -> LedgerResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(TransactionError::Abort(e)) => Err(e),
        Err(TransactionError::Storage(e)) => Err(LedgerError::Storage(e)),
    }
}

fn abort<T>(err: LedgerError) -> Result<T, ConflictableTransactionError<LedgerError>> {
    Err(ConflictableTransactionError::Abort(err))
}

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Persistent storage engine for the classroom ledger.
///
/// Wraps a sled `Db` instance and exposes typed accessors for wallets and
/// ledger entries plus the two atomic state transitions (mint, transfer).
/// All serialization uses bincode.
///
/// # Thread Safety
///
/// sled is inherently thread-safe, and the mutating operations here run
/// as serializable transactions, so `LedgerDb` can be shared across
/// threads via `Arc<LedgerDb>` without external synchronization.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    /// The underlying sled database handle.
    db: Db,
    /// Wallets indexed by opaque wallet id.
    wallets: Tree,
    /// Unique secondary index: address -> wallet id.
    addresses: Tree,
    /// Append-only ledger entries in chronological key order.
    entries: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that lives in memory and is cleaned
    /// up automatically when the `LedgerDb` is dropped.
    ///
    /// Ideal for unit tests — no filesystem side effects, no cleanup needed.
    pub fn open_temporary() -> LedgerResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    /// Internal constructor: opens named trees from an existing sled `Db`.
    fn from_db(db: Db) -> LedgerResult<Self> {
        let wallets = db.open_tree("wallets")?;
        let addresses = db.open_tree("addresses")?;
        let entries = db.open_tree("entries")?;

        Ok(Self {
            db,
            wallets,
            addresses,
            entries,
        })
    }

    // -- Wallet operations ----------------------------------------------------

    /// Persist a freshly created wallet, enforcing address uniqueness.
    ///
    /// The wallet row and its address index entry commit in one
    /// transaction; a concurrent creation racing on the same address
    /// loses with [`LedgerError::AddressTaken`].
    pub fn create_wallet(&self, wallet: &Wallet) -> LedgerResult<()> {
        let wallet_bytes = encode(wallet)?;

        let result = (&self.wallets, &self.addresses).transaction(|(wallets, addresses)| {
            if addresses.get(wallet.address.as_bytes())?.is_some() {
                return abort(LedgerError::AddressTaken {
                    address: wallet.address.clone(),
                });
            }
            addresses.insert(wallet.address.as_bytes(), wallet.id.as_bytes())?;
            wallets.insert(wallet.id.as_bytes(), wallet_bytes.clone())?;
            Ok(())
        });
        unwrap_txn(result)?;

        self.db.flush()?;
        Ok(())
    }

    /// Retrieve a wallet by its opaque id.
    pub fn wallet(&self, id: &str) -> LedgerResult<Option<Wallet>> {
        match self.wallets.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Resolve an address to its wallet id via the secondary index.
    ///
    /// Returns `None` if no wallet has ever been created with that address.
    pub fn resolve_address(&self, address: &str) -> LedgerResult<Option<String>> {
        match self.addresses.get(address.as_bytes())? {
            Some(bytes) => {
                let id = String::from_utf8(bytes.to_vec())
                    .map_err(|_| LedgerError::Serialization("invalid id bytes".to_string()))?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Retrieve a wallet by its public address.
    ///
    /// Performs a two-step lookup: address -> id (from `addresses`), then
    /// id -> wallet (from `wallets`).
    pub fn wallet_by_address(&self, address: &str) -> LedgerResult<Option<Wallet>> {
        match self.resolve_address(address)? {
            Some(id) => self.wallet(&id),
            None => Ok(None),
        }
    }

    /// Return all wallets, in no particular order.
    pub fn wallets(&self) -> LedgerResult<Vec<Wallet>> {
        let mut out = Vec::with_capacity(self.wallets.len());
        for item in self.wallets.iter() {
            let (_key, value) = item?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    // -- State transitions ----------------------------------------------------

    /// Credit a wallet and append the mint's ledger entry, atomically.
    ///
    /// The balance read, the balance write, and the ledger append run in
    /// one serializable transaction, so a concurrent mint or transfer
    /// touching the same wallet can never lose an update.
    ///
    /// Returns the recipient's new balance.
    pub fn apply_mint(
        &self,
        wallet_id: &str,
        amount: u64,
        entry: &LedgerEntry,
    ) -> LedgerResult<u64> {
        let entry_bytes = encode(entry)?;
        let key = entry_key(entry);

        let result = (&self.wallets, &self.entries).transaction(|(wallets, entries)| {
            let raw = match wallets.get(wallet_id.as_bytes())? {
                Some(raw) => raw,
                None => return abort(LedgerError::unknown_address(&entry.to)),
            };
            let mut wallet: Wallet = match decode(&raw) {
                Ok(w) => w,
                Err(e) => return abort(e),
            };

            wallet.balance = match wallet.balance.checked_add(amount) {
                Some(b) => b,
                None => {
                    return abort(LedgerError::BalanceOverflow {
                        address: wallet.address.clone(),
                    })
                }
            };

            let wallet_bytes = match encode(&wallet) {
                Ok(b) => b,
                Err(e) => return abort(e),
            };
            wallets.insert(wallet.id.as_bytes(), wallet_bytes)?;
            entries.insert(key.as_slice(), entry_bytes.clone())?;
            Ok(wallet.balance)
        });
        let new_balance = unwrap_txn(result)?;

        self.db.flush()?;
        Ok(new_balance)
    }

    /// Debit the sender, credit the recipient, and append the transfer's
    /// ledger entry — all in one transaction.
    ///
    /// Both legs commit or neither does; a rejected transfer (insufficient
    /// balance) leaves no trace in either tree.
    ///
    /// Returns `(sender_balance, recipient_balance)` after the transfer.
    pub fn apply_transfer(
        &self,
        from_id: &str,
        to_id: &str,
        amount: u64,
        entry: &LedgerEntry,
    ) -> LedgerResult<(u64, u64)> {
        let entry_bytes = encode(entry)?;
        let key = entry_key(entry);
        let from_addr = entry.from.clone().unwrap_or_default();

        let result = (&self.wallets, &self.entries).transaction(|(wallets, entries)| {
            let raw_from = match wallets.get(from_id.as_bytes())? {
                Some(raw) => raw,
                None => return abort(LedgerError::unknown_address(&from_addr)),
            };
            let raw_to = match wallets.get(to_id.as_bytes())? {
                Some(raw) => raw,
                None => return abort(LedgerError::unknown_address(&entry.to)),
            };

            let mut sender: Wallet = match decode(&raw_from) {
                Ok(w) => w,
                Err(e) => return abort(e),
            };
            let mut recipient: Wallet = match decode(&raw_to) {
                Ok(w) => w,
                Err(e) => return abort(e),
            };

            if sender.balance < amount {
                return abort(LedgerError::InsufficientFunds {
                    balance: sender.balance,
                    requested: amount,
                });
            }
            sender.balance -= amount;
            recipient.balance = match recipient.balance.checked_add(amount) {
                Some(b) => b,
                None => {
                    return abort(LedgerError::BalanceOverflow {
                        address: recipient.address.clone(),
                    })
                }
            };

            let sender_bytes = match encode(&sender) {
                Ok(b) => b,
                Err(e) => return abort(e),
            };
            let recipient_bytes = match encode(&recipient) {
                Ok(b) => b,
                Err(e) => return abort(e),
            };
            wallets.insert(sender.id.as_bytes(), sender_bytes)?;
            wallets.insert(recipient.id.as_bytes(), recipient_bytes)?;
            entries.insert(key.as_slice(), entry_bytes.clone())?;
            Ok((sender.balance, recipient.balance))
        });
        let balances = unwrap_txn(result)?;

        self.db.flush()?;
        Ok(balances)
    }

    // -- Ledger queries -------------------------------------------------------

    /// Return the most recent `limit` ledger entries, newest first.
    ///
    /// A reverse scan over the `entries` tree — the big-endian timestamp
    /// key prefix makes lexicographic order chronological.
    pub fn entries(&self, limit: usize) -> LedgerResult<Vec<LedgerEntry>> {
        let mut out = Vec::with_capacity(limit.min(self.entries.len()));
        for item in self.entries.iter().rev().take(limit) {
            let (_key, value) = item?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    // -- Utility operations ---------------------------------------------------

    /// Return the number of wallets stored.
    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    /// Return the number of ledger entries stored.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> LedgerResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LedgerEntry, Wallet};

    // -- Helpers ------------------------------------------------------------

    fn wallet_with_balance(name: &str, balance: u64) -> Wallet {
        let mut w = Wallet::create(name);
        w.balance = balance;
        w
    }

    fn seeded_db(wallets: &[&Wallet]) -> LedgerDb {
        let db = LedgerDb::open_temporary().expect("temp db");
        for w in wallets {
            db.create_wallet(w).expect("create wallet");
        }
        db
    }

    // -- Tests --------------------------------------------------------------

    #[test]
    fn open_temporary_database() {
        let db = LedgerDb::open_temporary().expect("should create temp db");
        assert_eq!(db.wallet_count(), 0);
        assert_eq!(db.entry_count(), 0);
    }

    #[test]
    fn open_persistent_database_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let alice = wallet_with_balance("Alice", 0);
        {
            let db = LedgerDb::open(dir.path()).expect("should open db");
            db.create_wallet(&alice).unwrap();
        }

        let db = LedgerDb::open(dir.path()).expect("should reopen db");
        let found = db
            .wallet_by_address(&alice.address)
            .unwrap()
            .expect("alice should persist");
        assert_eq!(found.id, alice.id);
        assert_eq!(found.name, "Alice");
    }

    #[test]
    fn create_and_fetch_wallet_by_id_and_address() {
        let alice = Wallet::create("Alice");
        let db = seeded_db(&[&alice]);

        let by_id = db.wallet(&alice.id).unwrap().expect("by id");
        assert_eq!(by_id.address, alice.address);

        let by_addr = db
            .wallet_by_address(&alice.address)
            .unwrap()
            .expect("by address");
        assert_eq!(by_addr.id, alice.id);

        assert_eq!(
            db.resolve_address(&alice.address).unwrap().as_deref(),
            Some(alice.id.as_str())
        );
    }

    #[test]
    fn unknown_address_resolves_to_none() {
        let db = LedgerDb::open_temporary().unwrap();
        assert!(db.wallet_by_address("EDU-00000000").unwrap().is_none());
        assert!(db.resolve_address("EDU-00000000").unwrap().is_none());
    }

    #[test]
    fn duplicate_address_rejected() {
        let alice = Wallet::create("Alice");
        let db = seeded_db(&[&alice]);

        // A second wallet forged onto the same address must be rejected
        // and must not clobber the index.
        let mut impostor = Wallet::create("Impostor");
        impostor.address = alice.address.clone();

        let result = db.create_wallet(&impostor);
        assert!(matches!(result, Err(LedgerError::AddressTaken { .. })));
        assert_eq!(db.wallet_count(), 1);
        assert_eq!(
            db.resolve_address(&alice.address).unwrap().as_deref(),
            Some(alice.id.as_str())
        );
    }

    #[test]
    fn apply_mint_credits_and_appends() {
        let alice = Wallet::create("Alice");
        let db = seeded_db(&[&alice]);

        let entry = LedgerEntry::mint(&alice.address, 100, None);
        let new_balance = db.apply_mint(&alice.id, 100, &entry).unwrap();

        assert_eq!(new_balance, 100);
        assert_eq!(db.wallet(&alice.id).unwrap().unwrap().balance, 100);
        assert_eq!(db.entry_count(), 1);

        let entries = db.entries(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_mint());
        assert_eq!(entries[0].to, alice.address);
    }

    #[test]
    fn apply_mint_to_missing_wallet_leaves_no_trace() {
        let db = LedgerDb::open_temporary().unwrap();
        let entry = LedgerEntry::mint("EDU-00000000", 100, None);

        let result = db.apply_mint("no-such-id", 100, &entry);
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
        assert_eq!(db.entry_count(), 0);
    }

    #[test]
    fn apply_mint_overflow_aborts() {
        let alice = wallet_with_balance("Alice", u64::MAX - 5);
        let db = seeded_db(&[&alice]);

        let entry = LedgerEntry::mint(&alice.address, 10, None);
        let result = db.apply_mint(&alice.id, 10, &entry);

        assert!(matches!(result, Err(LedgerError::BalanceOverflow { .. })));
        // Neither the balance nor the ledger changed.
        assert_eq!(db.wallet(&alice.id).unwrap().unwrap().balance, u64::MAX - 5);
        assert_eq!(db.entry_count(), 0);
    }

    #[test]
    fn apply_transfer_moves_exactly_the_amount() {
        let alice = wallet_with_balance("Alice", 100);
        let bob = Wallet::create("Bob");
        let db = seeded_db(&[&alice, &bob]);

        let entry = LedgerEntry::transfer(&alice.address, &bob.address, 40, None);
        let (from_balance, to_balance) =
            db.apply_transfer(&alice.id, &bob.id, 40, &entry).unwrap();

        assert_eq!(from_balance, 60);
        assert_eq!(to_balance, 40);
        assert_eq!(db.wallet(&alice.id).unwrap().unwrap().balance, 60);
        assert_eq!(db.wallet(&bob.id).unwrap().unwrap().balance, 40);
        assert_eq!(db.entry_count(), 1);
    }

    #[test]
    fn apply_transfer_insufficient_funds_is_all_or_nothing() {
        let alice = wallet_with_balance("Alice", 60);
        let bob = Wallet::create("Bob");
        let db = seeded_db(&[&alice, &bob]);

        let entry = LedgerEntry::transfer(&alice.address, &bob.address, 1000, None);
        let result = db.apply_transfer(&alice.id, &bob.id, 1000, &entry);

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds {
                balance: 60,
                requested: 1000,
            })
        ));
        // No balance moved, no ledger row appended.
        assert_eq!(db.wallet(&alice.id).unwrap().unwrap().balance, 60);
        assert_eq!(db.wallet(&bob.id).unwrap().unwrap().balance, 0);
        assert_eq!(db.entry_count(), 0);
    }

    #[test]
    fn entries_come_back_newest_first() {
        let alice = Wallet::create("Alice");
        let db = seeded_db(&[&alice]);

        // Three mints with strictly increasing timestamps.
        for amount in [1u64, 2, 3] {
            let mut entry = LedgerEntry::mint(&alice.address, amount, None);
            entry.timestamp = chrono::Utc::now() + chrono::Duration::milliseconds(amount as i64);
            db.apply_mint(&alice.id, amount, &entry).unwrap();
        }

        let entries = db.entries(10).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].amount, 3);
        assert_eq!(entries[1].amount, 2);
        assert_eq!(entries[2].amount, 1);
    }

    #[test]
    fn entries_respects_the_limit() {
        let alice = Wallet::create("Alice");
        let db = seeded_db(&[&alice]);

        for i in 1..=5u64 {
            let mut entry = LedgerEntry::mint(&alice.address, i, None);
            entry.timestamp = chrono::Utc::now() + chrono::Duration::milliseconds(i as i64);
            db.apply_mint(&alice.id, i, &entry).unwrap();
        }

        let entries = db.entries(2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, 5);
        assert_eq!(entries[1].amount, 4);
    }

    #[test]
    fn concurrent_transfers_never_lose_an_update() {
        use std::sync::Arc;
        use std::thread;

        let alice = wallet_with_balance("Alice", 10_000);
        let bob = Wallet::create("Bob");
        let db = Arc::new(seeded_db(&[&alice, &bob]));

        // Eight threads each move 10 coins a hundred times. With the old
        // two-round-trip scheme most of these debits would vanish.
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                let alice = alice.clone();
                let bob = bob.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        let entry =
                            LedgerEntry::transfer(&alice.address, &bob.address, 10, None);
                        db.apply_transfer(&alice.id, &bob.id, 10, &entry)
                            .expect("transfer");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("transfer thread should not panic");
        }

        let sender = db.wallet(&alice.id).unwrap().unwrap();
        let recipient = db.wallet(&bob.id).unwrap().unwrap();
        assert_eq!(sender.balance, 10_000 - 8 * 100 * 10);
        assert_eq!(recipient.balance, 8 * 100 * 10);
        assert_eq!(db.entry_count(), 800);
    }

    #[test]
    fn wallets_lists_everyone() {
        let alice = Wallet::create("Alice");
        let bob = Wallet::create("Bob");
        let carol = Wallet::create("Carol");
        let db = seeded_db(&[&alice, &bob, &carol]);

        let all = db.wallets().unwrap();
        assert_eq!(all.len(), 3);
        let mut names: Vec<_> = all.iter().map(|w| w.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn flush_does_not_error() {
        let db = LedgerDb::open_temporary().unwrap();
        db.create_wallet(&Wallet::create("Alice")).unwrap();
        db.flush().expect("flush should succeed");
    }
}
