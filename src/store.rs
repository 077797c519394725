// src/store.rs
//! Record store: the vault's relational database, read directly
//!
//! The migrator only reads from it (target version + pending id range). Key
//! material never passes through here; re-encryption happens inside the
//! KeyAPI. The cleaner is the only writer.

use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info};

use crate::enums::KeyKind;
use crate::error::{RekeyError, Result};
use crate::model::{IdRange, KeyVersion};

/// `finish_ts` column format
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Queries the migrator consumes
pub trait RecordStore {
    /// Version records of `kind` should converge to, if one is configured
    fn current_target_version(&self, kind: KeyKind) -> Result<Option<KeyVersion>>;

    /// Smallest and largest id of records of `kind` not on `version`
    fn id_range_not_on_version(
        &self,
        kind: KeyKind,
        version: KeyVersion,
    ) -> Result<Option<IdRange>>;
}

impl<T: RecordStore + ?Sized> RecordStore for &T {
    fn current_target_version(&self, kind: KeyKind) -> Result<Option<KeyVersion>> {
        (**self).current_target_version(kind)
    }

    fn id_range_not_on_version(
        &self,
        kind: KeyKind,
        version: KeyVersion,
    ) -> Result<Option<IdRange>> {
        (**self).id_range_not_on_version(kind, version)
    }
}

/// [`RecordStore`] over the vault's SQL schema (`t_config`, `t_dek`,
/// `t_data_token`)
pub struct SqlRecordStore {
    conn: Connection,
}

impl SqlRecordStore {
    /// Open an existing database; the schema is owned by the vault, so a
    /// missing file is an error rather than a fresh empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        info!("Connected to record store: {}", path.display());
        Ok(Self { conn })
    }

    /// Delete tokens whose `finish_ts` falls in `[now - retention_days, now)`.
    /// Returns the number of deleted rows.
    pub fn purge_expired_tokens(
        &mut self,
        now: NaiveDateTime,
        retention_days: u32,
    ) -> Result<usize> {
        let begin = now - Duration::days(i64::from(retention_days));
        let begin_ts = begin.format(TS_FORMAT).to_string();
        let end_ts = now.format(TS_FORMAT).to_string();
        debug!("purge window: [{begin_ts} .. {end_ts})");

        // Dropping the transaction on error rolls it back
        let tx = self.conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM t_data_token WHERE finish_ts >= ?1 AND finish_ts < ?2",
            params![begin_ts, end_ts],
        )?;
        tx.commit()?;
        info!("Commit: {deleted} expired token(s) deleted");
        Ok(deleted)
    }
}

impl RecordStore for SqlRecordStore {
    fn current_target_version(&self, kind: KeyKind) -> Result<Option<KeyVersion>> {
        let ckey = kind.target_config_key();
        let value: Option<Value> = self
            .conn
            .query_row(
                "SELECT cvalue FROM t_config WHERE ckey = ?1",
                [ckey],
                |row| row.get(0),
            )
            .optional()?;
        debug!("t_config {ckey} = {value:?}");

        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Integer(v)) => Ok(Some(v)),
            Some(Value::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::Text(text)) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| RekeyError::config(format!("{ckey} is not a version: {text:?}"))),
            Some(other) => Err(RekeyError::config(format!(
                "{ckey} has unexpected type: {other:?}"
            ))),
        }
    }

    fn id_range_not_on_version(
        &self,
        kind: KeyKind,
        version: KeyVersion,
    ) -> Result<Option<IdRange>> {
        let (table, column) = kind.record_table();
        let sql = format!("SELECT MIN(id), MAX(id) FROM {table} WHERE {column} <> ?1");
        debug!("SQL: {sql} [{version}]");

        let (min_id, max_id): (Option<i64>, Option<i64>) =
            self.conn
                .query_row(&sql, [version], |row| Ok((row.get(0)?, row.get(1)?)))?;

        Ok(match (min_id, max_id) {
            (Some(min_id), Some(max_id)) => IdRange::new(min_id, max_id),
            _ => None,
        })
    }
}
