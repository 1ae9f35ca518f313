// Copyright (c) 2026 EduCoin Contributors. MIT License.
// See LICENSE for details.

//! # EduCoin Ledger — Core Library
//!
//! The business core of EduCoin: a classroom coin ledger where a teacher
//! mints coins into student wallets and students pass them around with an
//! address + PIN pair. No blockchain, no gas fees, no whitepaper — just a
//! durable little economy for one classroom.
//!
//! ## Architecture
//!
//! The library is split into modules that mirror the actual concerns of
//! the ledger:
//!
//! - **config** — Constants and the runtime configuration object.
//! - **error** — The `LedgerError` taxonomy every operation speaks.
//! - **model** — Wallet and ledger-entry records.
//! - **store** — Persistent storage over sled, with atomic state transitions.
//! - **ops** — The operations layer both front-ends consume.
//!
//! ## Design Philosophy
//!
//! 1. One operations library, many thin presentation adapters.
//! 2. Every balance change commits atomically with its ledger entry.
//! 3. If it touches coins, it has tests. Plural.

pub mod config;
pub mod error;
pub mod model;
pub mod ops;
pub mod store;
