//! # Ledger Configuration & Constants
//!
//! Every magic number in EduCoin lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong and you owe the class
//! a round of coins.
//!
//! The runtime configuration is an explicit [`LedgerConfig`] object that
//! the binaries build once at startup and hand to the operations layer.
//! Nothing in the library reads the process environment mid-operation.

// ---------------------------------------------------------------------------
// Addresses & PINs
// ---------------------------------------------------------------------------

/// Prefix for every public wallet address. Short enough to type on a
/// classroom whiteboard, distinctive enough to grep in a log file.
pub const ADDRESS_PREFIX: &str = "EDU-";

/// Number of hex characters of the wallet id carried in the address.
/// Eight gives 2^32 values — not globally collision-free, but practically
/// unique for any classroom that fits inside a building.
pub const ADDRESS_ID_CHARS: usize = 8;

/// Number of decimal digits in a freshly generated wallet PIN.
pub const PIN_DIGITS: usize = 6;

// ---------------------------------------------------------------------------
// Operation Limits
// ---------------------------------------------------------------------------

/// Amount credited by a mint when the caller doesn't specify one.
pub const MINT_DEFAULT_AMOUNT: u64 = 1;

/// Number of wallets returned by the leaderboard query.
pub const LEADERBOARD_SIZE: usize = 10;

/// Ledger rows returned when the caller doesn't specify a limit.
pub const LEDGER_DEFAULT_LIMIT: usize = 50;

/// Hard cap on ledger rows returned by a single query.
pub const LEDGER_MAX_LIMIT: usize = 200;

/// Ledger rows shown on the dashboard view.
pub const DASHBOARD_LEDGER_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// Fallback teacher secret used when none is configured.
///
/// A known operational weakness carried over deliberately: a classroom
/// deployment that never sets `EDUCOIN_TEACHER_SECRET` runs with this
/// value, and the binaries warn loudly about it at startup.
pub const DEFAULT_TEACHER_SECRET: &str = "teacherpass";

/// Runtime configuration for the operations layer.
///
/// Built once at process startup from CLI flags / environment variables
/// and passed into [`LedgerService`](crate::ops::LedgerService) at
/// construction time. Operations never consult global state.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// The process-wide teacher secret that authorizes mint operations.
    pub teacher_secret: String,
}

impl LedgerConfig {
    /// Creates a configuration with the given teacher secret.
    pub fn new(teacher_secret: impl Into<String>) -> Self {
        Self {
            teacher_secret: teacher_secret.into(),
        }
    }

    /// Returns `true` if the configured secret is the well-known fallback.
    pub fn uses_default_secret(&self) -> bool {
        self.teacher_secret == DEFAULT_TEACHER_SECRET
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TEACHER_SECRET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_fallback_secret() {
        let config = LedgerConfig::default();
        assert!(config.uses_default_secret());
        assert_eq!(config.teacher_secret, DEFAULT_TEACHER_SECRET);
    }

    #[test]
    fn custom_secret_is_not_flagged_as_default() {
        let config = LedgerConfig::new("s3cret-from-env");
        assert!(!config.uses_default_secret());
    }

    #[test]
    fn limits_are_sane() {
        assert!(LEDGER_DEFAULT_LIMIT <= LEDGER_MAX_LIMIT);
        assert!(DASHBOARD_LEDGER_LIMIT <= LEDGER_MAX_LIMIT);
        assert!(LEADERBOARD_SIZE > 0);
    }
}
