//! Generation (versioned cache store) operations.

use super::connection::CacheDb;
use super::entries::{generation_exists, now_stamp, upsert_row};
use crate::Error;
use crate::request::RequestKey;
use crate::response::CapturedResponse;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// One versioned cache store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationInfo {
    pub tag: String,
    pub created_at: String,
    pub activated_at: Option<String>,
    pub entries: u64,
}

impl CacheDb {
    /// Create an empty generation if it doesn't exist (`caches.open`).
    ///
    /// Returns true if the generation was created.
    pub async fn create_generation(&self, tag: &str) -> Result<bool, Error> {
        let tag = tag.to_string();
        let now = now_stamp();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT INTO generations (tag, created_at) VALUES (?1, ?2) ON CONFLICT(tag) DO NOTHING",
                    params![tag, now],
                )?;
                Ok(inserted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Create (or reuse) a generation and write every entry in one
    /// transaction. Either all entries land or nothing changes.
    ///
    /// Returns the number of entries written.
    pub async fn seed_generation(&self, tag: &str, entries: Vec<(RequestKey, CapturedResponse)>) -> Result<usize, Error> {
        let tag = tag.to_string();
        let now = now_stamp();
        let mut rows = Vec::with_capacity(entries.len());
        for (key, response) in entries {
            let headers_json = response.headers_json()?;
            rows.push((key, response, headers_json));
        }

        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                if !generation_exists(&tx, &tag)? {
                    tx.execute("INSERT INTO generations (tag, created_at) VALUES (?1, ?2)", params![&tag, &now])?;
                }
                for (key, response, headers_json) in &rows {
                    upsert_row(&tx, &tag, key, response, headers_json, &now)?;
                }
                tx.commit()?;
                Ok(rows.len())
            })
            .await
            .map_err(Error::from)
    }

    /// List every generation with its entry count, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.tag, g.created_at, g.activated_at,
                            (SELECT COUNT(*) FROM entries e WHERE e.generation = g.tag)
                     FROM generations g ORDER BY g.created_at ASC, g.tag ASC",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(GenerationInfo {
                        tag: row.get(0)?,
                        created_at: row.get(1)?,
                        activated_at: row.get(2)?,
                        entries: row.get::<_, i64>(3)? as u64,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and, by cascade, all of its entries.
    ///
    /// Returns whether the generation existed.
    pub async fn delete_generation(&self, tag: &str) -> Result<bool, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE generation = ?1", params![&tag])?;
                let deleted = tx.execute("DELETE FROM generations WHERE tag = ?1", params![&tag])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Record that `tag` is the generation serving traffic.
    pub async fn mark_generation_active(&self, tag: &str) -> Result<(), Error> {
        let tag = tag.to_string();
        let now = now_stamp();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let updated = conn.execute(
                    "UPDATE generations SET activated_at = ?2 WHERE tag = ?1",
                    params![&tag, now],
                )?;
                if updated == 0 {
                    return Err(Error::GenerationMissing(tag));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
