//! Persistent Store Module
//!
//! SQLite-backed tier that outlives the process. Records carry their
//! creation timestamp and TTL; validity is checked lazily on read and stale
//! rows are deleted on the spot, so no background sweeper exists.
//!
//! All database access is funneled through a single writer task that owns
//! the connection and drains an unbounded command queue. `put` is
//! fire-and-forget; `get`, `remove`, `clear` and `len` wait for a reply.
//! Because every mutation rides the same serial queue, concurrent writes to
//! one key resolve to the last dispatched write (last-writer-wins), and an
//! acknowledged removal can never be undone by an earlier queued write.
//! Dropping the store closes the queue; the writer drains what was already
//! dispatched and exits.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::cache::entry::now_ms;
use crate::error::Result;

// == Disk Record ==
/// A raw persistent record: the serialized payload plus its timestamps.
/// Decoding the payload is the coordinator's job.
#[derive(Debug, Clone)]
pub struct DiskRecord {
    /// Serialized value
    pub payload: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

// == Commands ==
enum DiskCommand {
    Put {
        key: String,
        payload: String,
        created_at: u64,
        ttl_ms: u64,
    },
    Get {
        key: String,
        reply: oneshot::Sender<Option<DiskRecord>>,
    },
    Remove {
        key: String,
        ack: oneshot::Sender<()>,
    },
    Clear {
        ack: oneshot::Sender<()>,
    },
    Len {
        reply: oneshot::Sender<usize>,
    },
}

// == Disk Store ==
/// Handle to the persistent tier.
///
/// Cheap to use from any task; all operations are forwarded to the writer
/// task through the command queue.
pub struct DiskStore {
    queue: mpsc::UnboundedSender<DiskCommand>,
}

impl DiskStore {
    // == Open ==
    /// Opens (or creates) the database at `path` and spawns the writer task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                ttl_ms INTEGER NOT NULL
            )",
            [],
        )?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(conn, rx));
        info!("disk store opened at {}", path.display());

        Ok(Self { queue: tx })
    }

    // == Put ==
    /// Dispatches a write and returns immediately.
    ///
    /// Errors inside the writer are logged, never propagated; the caller's
    /// thread of control is never blocked on durable I/O.
    pub fn put(&self, key: &str, payload: String, created_at: u64, ttl_ms: u64) {
        let command = DiskCommand::Put {
            key: key.to_string(),
            payload,
            created_at,
            ttl_ms,
        };
        if self.queue.send(command).is_err() {
            warn!("disk store writer is gone, dropping write for '{}'", key);
        }
    }

    // == Get ==
    /// Reads the record for `key`, applying lazy TTL expiration.
    ///
    /// A record whose TTL has elapsed is deleted and reported as absent.
    /// Queued writes dispatched before this call are applied first.
    pub async fn get(&self, key: &str) -> Option<DiskRecord> {
        let (reply, rx) = oneshot::channel();
        let command = DiskCommand::Get {
            key: key.to_string(),
            reply,
        };
        self.queue.send(command).ok()?;
        rx.await.unwrap_or(None)
    }

    // == Remove ==
    /// Durably deletes the record for `key`, waiting for completion.
    pub async fn remove(&self, key: &str) {
        let (ack, rx) = oneshot::channel();
        let command = DiskCommand::Remove {
            key: key.to_string(),
            ack,
        };
        if self.queue.send(command).is_ok() {
            let _ = rx.await;
        }
    }

    // == Clear ==
    /// Durably deletes every record, waiting for completion.
    pub async fn clear(&self) {
        let (ack, rx) = oneshot::channel();
        if self.queue.send(DiskCommand::Clear { ack }).is_ok() {
            let _ = rx.await;
        }
    }

    // == Length ==
    /// Returns the number of stored records, expired or not.
    pub async fn len(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.queue.send(DiskCommand::Len { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

// == Writer Task ==
/// Drains the command queue until every `DiskStore` handle is dropped.
async fn run_writer(conn: Connection, mut queue: mpsc::UnboundedReceiver<DiskCommand>) {
    while let Some(command) = queue.recv().await {
        match command {
            DiskCommand::Put {
                key,
                payload,
                created_at,
                ttl_ms,
            } => {
                let result = conn.execute(
                    "INSERT OR REPLACE INTO cache_entries (key, value, created_at, ttl_ms)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![key, payload, created_at as i64, ttl_ms as i64],
                );
                if let Err(e) = result {
                    warn!("disk write for '{}' failed: {}", key, e);
                }
            }
            DiskCommand::Get { key, reply } => {
                let _ = reply.send(read_record(&conn, &key));
            }
            DiskCommand::Remove { key, ack } => {
                if let Err(e) = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
                {
                    warn!("disk delete for '{}' failed: {}", key, e);
                }
                let _ = ack.send(());
            }
            DiskCommand::Clear { ack } => {
                if let Err(e) = conn.execute("DELETE FROM cache_entries", []) {
                    warn!("disk clear failed: {}", e);
                }
                let _ = ack.send(());
            }
            DiskCommand::Len { reply } => {
                let count = conn
                    .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| {
                        row.get::<_, i64>(0)
                    })
                    .unwrap_or(0);
                let _ = reply.send(count as usize);
            }
        }
    }
    debug!("disk store writer stopped");
}

// == Read Path ==
/// Reads one record, deleting it if stale. I/O failures degrade to a miss.
fn read_record(conn: &Connection, key: &str) -> Option<DiskRecord> {
    let row = conn
        .query_row(
            "SELECT value, created_at, ttl_ms FROM cache_entries WHERE key = ?1",
            params![key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional();

    match row {
        Ok(Some((payload, created_at, ttl_ms))) => {
            let created_at = created_at as u64;
            let expires_at = created_at + ttl_ms as u64;
            if now_ms() >= expires_at {
                debug!("stale record for '{}' dropped", key);
                if let Err(e) =
                    conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
                {
                    warn!("failed to delete stale record for '{}': {}", key, e);
                }
                None
            } else {
                Some(DiskRecord {
                    payload,
                    created_at,
                    expires_at,
                })
            }
        }
        Ok(None) => None,
        Err(e) => {
            warn!("disk read for '{}' failed, treating as miss: {}", key, e);
            None
        }
    }
}
