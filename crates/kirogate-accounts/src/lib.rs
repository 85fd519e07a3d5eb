//! Upstream credential roster: account records, the selection pool with its
//! status machine, JSON persistence, and the token/usage collaborators.

pub mod account;
pub mod pool;
pub mod roster;
pub mod token;
pub mod usage;

pub use account::{Account, AccountStatus};
pub use pool::{AccountPool, COOLDOWN_SECS};
pub use roster::RosterError;
pub use token::{BearerToken, KiroTokenProvider, TokenError, TokenProvider};
pub use usage::{KiroUsageProbe, UsageError, UsageProbe, UsageSnapshot};
