//! The account pool: shared mutable roster state with atomic selection and
//! error-driven status transitions.
//!
//! Selection is short and CPU-bound, so the whole critical section sits
//! behind a std `Mutex`; no I/O happens while the lock is held. Roster
//! persistence goes through a `watch` channel to a background writer, so a
//! mutation never blocks on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::watch;
use tracing::{info, warn};

use kirogate_core::config::SelectionStrategy;

use crate::account::{Account, AccountStatus};
use crate::roster::{self, RosterError};
use crate::usage::UsageSnapshot;

/// How long a rate-limited account sits out before re-activation.
pub const COOLDOWN_SECS: u64 = 300;

pub struct AccountPool {
    state: Mutex<PoolState>,
    roster_tx: watch::Sender<Vec<Account>>,
    strategy: SelectionStrategy,
}

struct PoolState {
    accounts: Vec<Account>,
    round_robin: usize,
    /// Bumped every time an account enters cooldown; a timer only fires its
    /// transition when its generation is still current.
    cooldown_generation: HashMap<String, u64>,
}

impl AccountPool {
    /// Load the roster from disk and start the background writer.
    pub fn load(
        path: impl AsRef<Path>,
        strategy: SelectionStrategy,
    ) -> Result<Arc<Self>, RosterError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let accounts = roster::load_roster(&path)?;
        info!(count = accounts.len(), path = %path.display(), "loaded account roster");
        let pool = Self::with_accounts(accounts, strategy);
        tokio::spawn(roster::run_writer(path, pool.roster_tx.subscribe()));
        Ok(pool)
    }

    /// Build a pool without a disk writer. Used by tests and embedders that
    /// manage persistence themselves.
    pub fn with_accounts(accounts: Vec<Account>, strategy: SelectionStrategy) -> Arc<Self> {
        let (roster_tx, _) = watch::channel(accounts.clone());
        Arc::new(Self {
            state: Mutex::new(PoolState {
                accounts,
                round_robin: 0,
                cooldown_generation: HashMap::new(),
            }),
            roster_tx,
            strategy,
        })
    }

    /// Pick an account from the active set, bumping its request counter and
    /// last-used timestamp in the same critical section. Returns `None` when
    /// no account is active.
    pub fn select_account(&self) -> Option<Account> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        let active: Vec<usize> = state
            .accounts
            .iter()
            .enumerate()
            .filter(|(_, a)| a.status == AccountStatus::Active)
            .map(|(i, _)| i)
            .collect();
        if active.is_empty() {
            return None;
        }

        let idx = match self.strategy {
            SelectionStrategy::RoundRobin => {
                let i = active[state.round_robin % active.len()];
                state.round_robin += 1;
                i
            }
            SelectionStrategy::Random => active[rand::rng().random_range(0..active.len())],
            SelectionStrategy::LeastUsed => active
                .iter()
                .copied()
                .min_by_key(|&i| state.accounts[i].request_count)
                .unwrap_or(active[0]),
        };

        let account = &mut state.accounts[idx];
        account.request_count += 1;
        account.last_used_at = Some(Utc::now());
        let selected = account.clone();
        self.persist(state);
        Some(selected)
    }

    /// Record a failed upstream call. A rate-limit error moves an active
    /// account into cooldown and arms the one-shot re-activation timer;
    /// anything else only bumps the error counter.
    pub fn record_error(self: &Arc<Self>, account_id: &str, rate_limited: bool) {
        let mut timer = None;
        {
            let mut state = self.state.lock().unwrap();
            let state = &mut *state;
            let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) else {
                return;
            };
            account.error_count += 1;
            if rate_limited && account.status == AccountStatus::Active {
                account.status = AccountStatus::Cooldown;
                warn!(account = %account.name, "rate limited, entering cooldown");
                let generation = state
                    .cooldown_generation
                    .entry(account_id.to_string())
                    .or_insert(0);
                *generation += 1;
                timer = Some((account_id.to_string(), *generation));
            }
            self.persist(state);
        }
        if let Some((id, generation)) = timer {
            let pool = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(COOLDOWN_SECS)).await;
                pool.end_cooldown(&id, generation);
            });
        }
    }

    /// Deferred cooldown → active transition. Suppressed when the status
    /// changed in the meantime or a newer cooldown superseded this timer.
    fn end_cooldown(&self, account_id: &str, generation: u64) {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        let current = state
            .cooldown_generation
            .get(account_id)
            .copied()
            .unwrap_or(0);
        if current != generation {
            return;
        }
        let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) else {
            return;
        };
        if account.status == AccountStatus::Cooldown {
            account.status = AccountStatus::Active;
            info!(account = %account.name, "cooldown elapsed, active again");
            self.persist(state);
        }
    }

    /// Admin action; also taken by the dispatcher on persistent auth failure.
    pub fn mark_invalid(&self, account_id: &str) {
        self.set_status(account_id, AccountStatus::Invalid);
    }

    /// Admin toggle between disabled and active.
    pub fn set_disabled(&self, account_id: &str, disabled: bool) {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) else {
            return;
        };
        if disabled {
            account.status = AccountStatus::Disabled;
        } else if account.status == AccountStatus::Disabled {
            account.status = AccountStatus::Active;
        }
        self.persist(state);
    }

    /// Store a refreshed credential blob. The pool is the sole roster
    /// writer, so the token provider hands updates back through here.
    pub fn store_credentials(&self, account_id: &str, credentials: serde_json::Value) {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) {
            account.credentials = credentials;
            self.persist(state);
        }
    }

    pub fn update_usage(&self, account_id: &str, usage: UsageSnapshot) {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) {
            account.usage = Some(usage);
            self.persist(state);
        }
    }

    pub fn snapshot(&self) -> Vec<Account> {
        self.state.lock().unwrap().accounts.clone()
    }

    /// (active, total) account counts.
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap();
        let active = state
            .accounts
            .iter()
            .filter(|a| a.status == AccountStatus::Active)
            .count();
        (active, state.accounts.len())
    }

    fn set_status(&self, account_id: &str, status: AccountStatus) {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) {
            account.status = status;
            self.persist(state);
        }
    }

    fn persist(&self, state: &PoolState) {
        // fire-and-forget: the writer task coalesces and always sees the
        // latest snapshot
        self.roster_tx.send_replace(state.accounts.clone());
    }
}
