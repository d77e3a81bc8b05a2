//! Cache entry operations.
//!
//! One row per (generation, request key). Writes are single UPSERT
//! statements, so a concurrent reader sees either the previous entry or the
//! new one in full.

use super::connection::CacheDb;
use crate::Error;
use crate::request::RequestKey;
use crate::response::{CapturedResponse, ResponseKind};
use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub generation: String,
    pub key: RequestKey,
    pub response: CapturedResponse,
    pub stored_at: String,
}

/// Entry metadata without the body, for listings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntrySummary {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub kind: String,
    pub body_len: i64,
    pub stored_at: String,
}

pub(crate) fn generation_exists(conn: &rusqlite::Connection, tag: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row("SELECT EXISTS(SELECT 1 FROM generations WHERE tag = ?1)", params![tag], |row| {
        row.get(0)
    })
}

pub(crate) fn upsert_row(
    conn: &rusqlite::Connection, tag: &str, key: &RequestKey, response: &CapturedResponse, headers_json: &str,
    stored_at: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO entries (
            generation, key_hash, method, url, final_url, status, status_text,
            kind, redirected, headers_json, body, body_len, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(generation, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            final_url = excluded.final_url,
            status = excluded.status,
            status_text = excluded.status_text,
            kind = excluded.kind,
            redirected = excluded.redirected,
            headers_json = excluded.headers_json,
            body = excluded.body,
            body_len = excluded.body_len,
            stored_at = excluded.stored_at",
        params![
            tag,
            key.hash(),
            &key.method,
            &key.url,
            &response.url,
            response.status as i64,
            &response.status_text,
            response.kind.as_str(),
            response.redirected as i32,
            headers_json,
            response.body.as_ref(),
            response.body.len() as i64,
            stored_at,
        ],
    )?;
    Ok(())
}

/// Timestamp with sub-second precision so insertion order survives sorting.
pub(crate) fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

impl CacheDb {
    /// Store a response under `key` in generation `tag`.
    ///
    /// Takes the response by value: a handler that also returns the response
    /// to the page has to `clone()` it first. Fails with
    /// `GenerationMissing` instead of recreating a deleted generation.
    pub async fn put_entry(&self, tag: &str, key: &RequestKey, response: CapturedResponse) -> Result<(), Error> {
        let tag = tag.to_string();
        let key = key.clone();
        let headers_json = response.headers_json()?;
        let stored_at = now_stamp();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                if !generation_exists(&tx, &tag)? {
                    return Err(Error::GenerationMissing(tag));
                }
                upsert_row(&tx, &tag, &key, &response, &headers_json, &stored_at)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry.
    ///
    /// Returns None if the generation or the key doesn't exist.
    pub async fn get_entry(&self, tag: &str, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        let tag = tag.to_string();
        let key = key.clone();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT final_url, status, status_text, kind, redirected, headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![&tag, key.hash()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i32>(4)? == 1,
                        row.get::<_, String>(5)?,
                        row.get::<_, Vec<u8>>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                });

                let (final_url, status, status_text, kind, redirected, headers_json, body, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let response = CapturedResponse {
                    url: final_url,
                    status: u16::try_from(status).unwrap_or(0),
                    status_text,
                    kind: kind.parse::<ResponseKind>()?,
                    redirected,
                    headers: CapturedResponse::headers_from_json(&headers_json),
                    body: Bytes::from(body),
                };

                Ok(Some(CacheEntry { generation: tag, key, response, stored_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a generation.
    pub async fn count_entries(&self, tag: &str) -> Result<u64, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![tag], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// List entry metadata for a generation, oldest first.
    pub async fn list_entries(&self, tag: &str) -> Result<Vec<EntrySummary>, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, kind, body_len, stored_at FROM entries
                     WHERE generation = ?1 ORDER BY stored_at ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(params![tag], |row| {
                    Ok(EntrySummary {
                        method: row.get(0)?,
                        url: row.get(1)?,
                        status: u16::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
                        kind: row.get(3)?,
                        body_len: row.get(4)?,
                        stored_at: row.get(5)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a single entry. Returns whether it existed.
    pub async fn delete_entry(&self, tag: &str, key: &RequestKey) -> Result<bool, Error> {
        let tag = tag.to_string();
        let hash = key.hash();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE generation = ?1 AND key_hash = ?2", params![tag, hash])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Drop the oldest opaque entries of a generation until at most `keep`
    /// remain.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_opaque(&self, tag: &str, keep: usize) -> Result<u64, Error> {
        let tag = tag.to_string();
        let keep = keep as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1 AND kind = 'opaque'",
                    params![&tag],
                    |row| row.get(0),
                )?;
                if count <= keep {
                    return Ok(0);
                }

                let to_delete = count - keep;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE rowid IN (
                        SELECT rowid FROM entries WHERE generation = ?1 AND kind = 'opaque'
                        ORDER BY stored_at ASC, rowid ASC LIMIT ?2
                    )",
                    params![&tag, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove every entry of a generation but keep the generation itself.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_generation_entries(&self, tag: &str) -> Result<u64, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE generation = ?1", params![tag])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
