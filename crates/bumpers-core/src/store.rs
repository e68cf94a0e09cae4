//! SQLite cache and state store
//!
//! One database per project under the XDG state directory holds two tables:
//! `cache` for generated message bytes keyed by fingerprint, and `state` for
//! session flags. Two hook processes can race on the same file, so the store
//! opens in WAL mode with a 5 second busy timeout and wraps every mutation
//! in a transaction; `consume_skip_next` takes an immediate transaction so
//! two concurrent PreToolUse hooks can never both observe the flag as set.

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::path::Path;
use std::time::Duration;

use crate::constants::STORE_BUSY_TIMEOUT_MS;
use crate::error::{StoreError, StoreResult};

/// State key: rule evaluation switch, default on.
pub const STATE_RULES_ENABLED: &str = "rules_enabled";
/// State key: consume-once flag suppressing the next rule evaluation.
pub const STATE_SKIP_NEXT: &str = "skip_next_rule_hook";

/// Latest schema version; bump together with a new arm in `migrate`.
const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed store scoped to one project.
pub struct Store {
    conn: Mutex<Connection>,
    project_id: String,
}

impl Store {
    /// Open or create the database at `path`, apply pragmas and migrations.
    pub fn open(path: &Path, project_id: &str) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;

        // journal_mode returns a row; the remaining pragmas do not.
        conn.query_row("PRAGMA journal_mode=WAL", [], |row| {
            row.get::<_, String>(0)
        })?;
        conn.busy_timeout(Duration::from_millis(STORE_BUSY_TIMEOUT_MS))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;

        let store = Self {
            conn: Mutex::new(conn),
            project_id: project_id.to_string(),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Apply pending migrations, one transaction per schema version.
    fn migrate(&self) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        loop {
            let version: i32 =
                conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
            if version >= SCHEMA_VERSION {
                return Ok(());
            }

            let next = version + 1;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            match next {
                1 => {
                    tx.execute_batch(
                        r#"
                        CREATE TABLE IF NOT EXISTS cache (
                            key TEXT NOT NULL,
                            project_id TEXT NOT NULL,
                            value BLOB NOT NULL,
                            expires_at INTEGER,
                            created_at INTEGER NOT NULL,
                            PRIMARY KEY (key, project_id)
                        );

                        CREATE TABLE IF NOT EXISTS state (
                            key TEXT NOT NULL,
                            project_id TEXT NOT NULL,
                            value BLOB NOT NULL,
                            updated_at INTEGER NOT NULL,
                            PRIMARY KEY (key, project_id)
                        );
                        "#,
                    )?;
                }
                other => {
                    return Err(StoreError::Migration {
                        version: other,
                        reason: "no migration registered".to_string(),
                    });
                }
            }
            tx.pragma_update(None, "user_version", next)?;
            tx.commit()?;
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Cached value for `key`, honoring expiry. Expired rows are removed
    /// lazily on read.
    pub fn cache_get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.conn.lock();
        let row: Option<(Vec<u8>, Option<i64>)> = conn
            .query_row(
                "SELECT value, expires_at FROM cache WHERE key = ?1 AND project_id = ?2",
                params![key, self.project_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((_, Some(expires_at))) if expires_at <= Self::now() => {
                conn.execute(
                    "DELETE FROM cache WHERE key = ?1 AND project_id = ?2",
                    params![key, self.project_id],
                )?;
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value)),
            None => Ok(None),
        }
    }

    /// Insert or replace a cache row.
    pub fn cache_put(
        &self,
        key: &str,
        value: &[u8],
        expires_at: Option<i64>,
    ) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT OR REPLACE INTO cache (key, project_id, value, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![key, self.project_id, value, expires_at, Self::now()],
        )?;
        Ok(())
    }

    /// Raw state value for `key`.
    pub fn state_get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM state WHERE key = ?1 AND project_id = ?2",
                params![key, self.project_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or replace a state value.
    pub fn state_set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT OR REPLACE INTO state (key, project_id, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![key, self.project_id, value, Self::now()],
        )?;
        Ok(())
    }

    /// Whether rule evaluation is enabled for this project. Missing or
    /// unreadable state defaults to enabled.
    pub fn rules_enabled(&self) -> bool {
        match self.state_get(STATE_RULES_ENABLED) {
            Ok(Some(value)) => value != b"false",
            Ok(None) => true,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read rules_enabled; defaulting to on");
                true
            }
        }
    }

    pub fn set_rules_enabled(&self, enabled: bool) -> StoreResult<()> {
        let value: &[u8] = if enabled { b"true" } else { b"false" };
        self.state_set(STATE_RULES_ENABLED, value)
    }

    /// Arm the consume-once skip flag.
    pub fn set_skip_next(&self, on: bool) -> StoreResult<()> {
        let value: &[u8] = if on { b"true" } else { b"false" };
        self.state_set(STATE_SKIP_NEXT, value)
    }

    /// Atomically read the skip flag and, when set, reset it.
    ///
    /// The read and the reset share one immediate transaction, so of two
    /// racing hook processes exactly one observes `true`.
    pub fn consume_skip_next(&self) -> StoreResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value: Option<Vec<u8>> = tx
            .query_row(
                "SELECT value FROM state WHERE key = ?1 AND project_id = ?2",
                params![STATE_SKIP_NEXT, self.project_id],
                |row| row.get(0),
            )
            .optional()?;

        let set = value.as_deref() == Some(b"true".as_slice());
        if set {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO state (key, project_id, value, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![STATE_SKIP_NEXT, self.project_id, b"false".as_slice(), Self::now()],
            )?;
        }
        tx.commit()?;
        Ok(set)
    }

    /// Project this store is scoped to.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}
