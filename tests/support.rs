// tests/support.rs
//! Test utilities: in-memory vault world and temporary SQL databases

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::{params, Connection};
use tempfile::TempDir;
use vault_rekey::model::KeyVersion;
use vault_rekey::{
    Batch, BatchOutcome, Clock, IdRange, KeyAuthority, KeyKind, KeyStatus, KeyStatusSet,
    RecordStore, RekeyError, Result,
};

/// Plays KeyAPI, record store and clock at once. Pass `&world` for each.
#[allow(dead_code)]
pub struct World {
    pub target: Cell<Option<KeyVersion>>,
    pub pending: Cell<Option<IdRange>>,
    pub status: RefCell<KeyStatusSet>,
    /// Scripted outcomes; when exhausted a batch converts every id it covers
    pub outcomes: RefCell<VecDeque<BatchOutcome>>,
    /// After this many batches, the target changes to the given version
    pub drift_after: Cell<Option<(usize, Option<KeyVersion>)>>,
    /// The n-th batch call (1-based) fails with a transport error
    pub fail_on_batch: Cell<Option<usize>>,
    /// Simulated wall-clock cost of each batch
    pub batch_cost: Cell<Duration>,
    pub batches: RefCell<Vec<Batch>>,
    pub status_calls: Cell<usize>,
    pub range_queries: Cell<usize>,
    base: Instant,
    elapsed: Cell<Duration>,
}

#[allow(dead_code)]
impl World {
    pub fn new() -> Self {
        Self {
            target: Cell::new(None),
            pending: Cell::new(None),
            status: RefCell::new(KeyStatusSet::new()),
            outcomes: RefCell::new(VecDeque::new()),
            drift_after: Cell::new(None),
            fail_on_batch: Cell::new(None),
            batch_cost: Cell::new(Duration::ZERO),
            batches: RefCell::new(Vec::new()),
            status_calls: Cell::new(0),
            range_queries: Cell::new(0),
            base: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
        }
    }

    /// Target `version` of `kind`, ready, with ids `[min, max]` pending
    pub fn ready(kind: KeyKind, version: KeyVersion, min: i64, max: i64) -> Self {
        let world = Self::new();
        world.target.set(Some(version));
        world.pending.set(IdRange::new(min, max));
        world.set_key(kind, version, true, true);
        world
    }

    pub fn set_key(&self, kind: KeyKind, version: KeyVersion, valid: bool, checked: bool) {
        self.status.borrow_mut().insert(
            kind,
            version,
            KeyStatus {
                valid,
                checked,
                count: None,
            },
        );
    }

    pub fn script(&self, outcomes: &[(u64, u64)]) {
        self.outcomes.borrow_mut().extend(
            outcomes
                .iter()
                .map(|&(converted, failed)| BatchOutcome { converted, failed }),
        );
    }

    pub fn batch_calls(&self) -> usize {
        self.batches.borrow().len()
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }
}

impl KeyAuthority for World {
    fn status(&self) -> Result<KeyStatusSet> {
        self.status_calls.set(self.status_calls.get() + 1);
        Ok(self.status.borrow().clone())
    }

    fn migrate_batch(&self, _kind: KeyKind, batch: Batch) -> Result<BatchOutcome> {
        self.batches.borrow_mut().push(batch);
        let n = self.batch_calls();

        if self.fail_on_batch.get() == Some(n) {
            return Err(RekeyError::Protocol("KeyAPI status: internal_error".into()));
        }

        let outcome = self
            .outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or(BatchOutcome {
                converted: batch.id_count(),
                failed: 0,
            });

        self.advance(self.batch_cost.get());
        if let Some((after, version)) = self.drift_after.get() {
            if n >= after {
                self.target.set(version);
            }
        }
        Ok(outcome)
    }
}

impl RecordStore for World {
    fn current_target_version(&self, _kind: KeyKind) -> Result<Option<KeyVersion>> {
        Ok(self.target.get())
    }

    fn id_range_not_on_version(
        &self,
        _kind: KeyKind,
        _version: KeyVersion,
    ) -> Result<Option<IdRange>> {
        self.range_queries.set(self.range_queries.get() + 1);
        Ok(self.pending.get())
    }
}

impl Clock for World {
    fn now(&self) -> Instant {
        self.base + self.elapsed.get()
    }
}

/// Vault schema subset the jobs read
#[allow(dead_code)]
pub const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS t_config (
        ckey   TEXT PRIMARY KEY,
        cvalue
    );

    CREATE TABLE IF NOT EXISTS t_dek (
        id          INTEGER PRIMARY KEY,
        kek_version INTEGER NOT NULL,
        dek_crypted TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS t_data_token (
        id           INTEGER PRIMARY KEY,
        hmac_version INTEGER NOT NULL,
        finish_ts    TEXT
    );
"#;

/// Temporary vault database on disk
#[allow(dead_code)]
pub struct TestDb {
    _dir: TempDir,
    path: PathBuf,
    pub conn: Connection,
}

#[allow(dead_code)]
impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("vault.db");
        let conn = Connection::open(&path).expect("open test db");
        conn.execute_batch(SCHEMA).expect("create schema");
        Self {
            _dir: dir,
            path,
            conn,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_config(&self, ckey: &str, cvalue: impl rusqlite::ToSql) {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO t_config (ckey, cvalue) VALUES (?1, ?2)",
                params![ckey, cvalue],
            )
            .expect("insert config");
    }

    /// DEKs with ids `ids`, all on `kek_version`
    pub fn insert_deks(&self, ids: std::ops::RangeInclusive<i64>, kek_version: KeyVersion) {
        for id in ids {
            self.conn
                .execute(
                    "INSERT INTO t_dek (id, kek_version) VALUES (?1, ?2)",
                    params![id, kek_version],
                )
                .expect("insert dek");
        }
    }

    pub fn insert_token(&self, id: i64, hmac_version: KeyVersion, finish_ts: Option<&str>) {
        self.conn
            .execute(
                "INSERT INTO t_data_token (id, hmac_version, finish_ts) VALUES (?1, ?2, ?3)",
                params![id, hmac_version, finish_ts],
            )
            .expect("insert token");
    }

    pub fn count(&self, sql: &str) -> i64 {
        self.conn
            .query_row(sql, [], |row| row.get(0))
            .expect("count query")
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}

/// KeyAPI stand-in that re-keys rows directly in a test database, the way
/// the vault does behind `reencrypt_deks` / `rehash_tokens`
#[allow(dead_code)]
pub struct SqlKeyApi {
    pub conn: Connection,
    pub status: KeyStatusSet,
}

#[allow(dead_code)]
impl SqlKeyApi {
    pub fn open(path: &Path, status: KeyStatusSet) -> Self {
        Self {
            conn: Connection::open(path).expect("open key api connection"),
            status,
        }
    }
}

impl KeyAuthority for SqlKeyApi {
    fn status(&self) -> Result<KeyStatusSet> {
        Ok(self.status.clone())
    }

    fn migrate_batch(&self, kind: KeyKind, batch: Batch) -> Result<BatchOutcome> {
        let (table, column) = kind.record_table();
        let target: i64 = self.conn.query_row(
            "SELECT cvalue FROM t_config WHERE ckey = ?1",
            [kind.target_config_key()],
            |row| row.get(0),
        )?;
        let converted = self.conn.execute(
            &format!(
                "UPDATE {table} SET {column} = ?1 WHERE {column} <> ?1 AND id >= ?2 AND id <= ?3"
            ),
            params![target, batch.min_id, batch.max_id],
        )?;
        Ok(BatchOutcome {
            converted: converted as u64,
            failed: 0,
        })
    }
}
