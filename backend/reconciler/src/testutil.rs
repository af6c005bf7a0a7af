//! Shared test fixtures: an in-memory database and a scriptable chain mock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::chain::{ChainClient, ChainError, ContractCall};
use crate::config::Config;
use crate::events::{ChainEvent, EventKind};
use crate::models::Role;

/// Fresh in-memory database with migrations applied. A single connection,
/// because each SQLite `:memory:` connection is its own database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    role: Role,
    eth_address: Option<&str>,
) -> i64 {
    sqlx::query("INSERT INTO users (username, role, eth_address) VALUES (?1, ?2, ?3)")
        .bind(username)
        .bind(role)
        .bind(eth_address)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub fn test_config() -> Config {
    Config {
        rpc_url: "http://127.0.0.1:8545".to_string(),
        contract_address: "0x00000000000000000000000000000000000000ff".to_string(),
        database_url: "sqlite::memory:".to_string(),
        api_port: 0,
        poll_interval_secs: 1,
        max_blocks_per_pass: 1000,
        start_block: 0,
        tx_timeout_secs: 5,
        lease_secs: 60,
    }
}

/// Scriptable [`ChainClient`]: serves canned events (regardless of the
/// queried range), records submitted calls, and can be told to fail.
pub struct MockChain {
    height: u64,
    events: Vec<(EventKind, ChainEvent)>,
    calls: Mutex<Vec<(String, ContractCall, Option<u128>)>>,
    next_tx: AtomicU64,
    fail_next_submit: AtomicBool,
    fail_logs: AtomicBool,
}

impl MockChain {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            events: Vec::new(),
            calls: Mutex::new(Vec::new()),
            next_tx: AtomicU64::new(1),
            fail_next_submit: AtomicBool::new(false),
            fail_logs: AtomicBool::new(false),
        }
    }

    pub fn with_event(mut self, kind: EventKind, event: ChainEvent) -> Self {
        self.events.push((kind, event));
        self
    }

    /// All `query_logs` calls fail with an RPC error.
    pub fn failing_logs(self) -> Self {
        self.fail_logs.store(true, Ordering::SeqCst);
        self
    }

    /// The next `submit_call` fails with a contract revert.
    pub fn fail_next_submit(&self) {
        self.fail_next_submit.store(true, Ordering::SeqCst);
    }

    /// Number of calls submitted so far.
    pub fn submitted_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ChainClient for MockChain {
    async fn current_height(&self) -> Result<u64, ChainError> {
        Ok(self.height)
    }

    async fn query_logs(
        &self,
        kind: EventKind,
        _from_block: u64,
        _to_block: u64,
    ) -> Result<Vec<ChainEvent>, ChainError> {
        if self.fail_logs.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("mock log failure".to_string()));
        }
        Ok(self
            .events
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, ev)| ev.clone())
            .collect())
    }

    async fn submit_call(
        &self,
        from: &str,
        call: &ContractCall,
        value_wei: Option<u128>,
    ) -> Result<String, ChainError> {
        if self.fail_next_submit.swap(false, Ordering::SeqCst) {
            return Err(ChainError::ContractLogic("mock revert".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push((from.to_string(), call.clone(), value_wei));
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        Ok(format!("0xmocktx{n}"))
    }
}
