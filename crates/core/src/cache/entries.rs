//! Entry operations on one named SQLite store.

use std::sync::Arc;

use super::hash::compute_request_hash;
use super::store::CacheHandle;
use crate::Error;
use crate::http::{RequestKey, Response, ResponseType};
use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::{Connection, params, rusqlite};
use url::Url;

/// Handle to one named store inside a [`super::SqliteStorage`] database.
#[derive(Clone, Debug)]
pub struct SqliteCache {
    conn: Connection,
    name: Arc<str>,
}

/// Raw column values read back from the `entries` table.
struct StoredRow {
    status: i64,
    status_text: String,
    response_type: String,
    response_url: Option<String>,
    redirected: bool,
    headers_json: String,
    body: Vec<u8>,
}

impl StoredRow {
    fn into_response(self) -> Result<Response, Error> {
        let status = u16::try_from(self.status)
            .map_err(|_| Error::Store(format!("stored status out of range: {}", self.status)))?;
        let response_type: ResponseType = self.response_type.parse().map_err(Error::Store)?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::Store(format!("corrupt stored headers: {e}")))?;
        let url = self.response_url.as_deref().map(Url::parse).transpose()?;

        Ok(Response {
            status,
            status_text: self.status_text,
            response_type,
            url,
            redirected: self.redirected,
            headers,
            body: Bytes::from(self.body),
        })
    }
}

impl SqliteCache {
    pub(crate) fn new(conn: Connection, name: &str) -> Self {
        Self { conn, name: Arc::from(name) }
    }

    /// Number of entries in this store.
    pub async fn len(&self) -> Result<usize, Error> {
        let name = self.name.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE cache_name = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl CacheHandle for SqliteCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, key: &RequestKey) -> Result<Option<Response>, Error> {
        let name = self.name.to_string();
        let hash = compute_request_hash(key);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, response_type, response_url, redirected, headers_json, body
                     FROM entries WHERE cache_name = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![name, hash], |row| {
                    Ok(StoredRow {
                        status: row.get(0)?,
                        status_text: row.get(1)?,
                        response_type: row.get(2)?,
                        response_url: row.get(3)?,
                        redirected: row.get::<_, i32>(4)? == 1,
                        headers_json: row.get(5)?,
                        body: row.get(6)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(StoredRow::into_response).transpose()
    }

    /// Insert or replace the entry for `key`.
    ///
    /// Fails if the store was deleted after this handle was opened.
    async fn put(&self, key: RequestKey, response: Response) -> Result<(), Error> {
        let name = self.name.to_string();
        let hash = compute_request_hash(&key);
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::Store(format!("failed to encode headers: {e}")))?;
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                    cache_name, key_hash, method, url, status, status_text,
                    response_type, response_url, redirected, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                    status = excluded.status,
                    status_text = excluded.status_text,
                    response_type = excluded.response_type,
                    response_url = excluded.response_url,
                    redirected = excluded.redirected,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        name,
                        hash,
                        key.method,
                        key.url,
                        response.status as i64,
                        response.status_text,
                        response.response_type.as_str(),
                        response.url.as_ref().map(Url::as_str),
                        response.redirected as i32,
                        headers_json,
                        response.body.as_ref(),
                        stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        let name = self.name.to_string();
        let hash = compute_request_hash(key);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE cache_name = ?1 AND key_hash = ?2", params![name, hash])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        let name = self.name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE cache_name = ?1 ORDER BY rowid")?;
                let keys = stmt
                    .query_map(params![name], |row| Ok(RequestKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
