//! Bounded pool of store connections
//!
//! Each request checks out its own [`Database`] handle so concurrent searches
//! never share a `rusqlite::Connection`. Checkout waits on a semaphore with
//! one permit per connection; the handle goes back to the pool on drop.

use super::Database;
use crate::error::{Result, SmartLeaseError};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

struct PoolInner {
    idle: Mutex<Vec<Database>>,
    permits: Arc<Semaphore>,
    path: Option<PathBuf>,
}

/// Shared handle to the connection pool (cheap to clone)
#[derive(Clone)]
pub struct DatabasePool {
    inner: Arc<PoolInner>,
}

impl DatabasePool {
    /// Open `size` connections to the store at `path`.
    ///
    /// The first connection creates the schema; the rest attach to it.
    pub fn open(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        let path = path.as_ref();
        let size = size.max(1);

        let first = Database::open(path)?;
        first.initialize()?;

        let mut idle = Vec::with_capacity(size);
        idle.push(first);
        for _ in 1..size {
            idle.push(Database::open(path)?);
        }

        tracing::debug!("Opened {} store connections at {}", size, path.display());

        Ok(Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(idle),
                permits: Arc::new(Semaphore::new(size)),
                path: Some(path.to_path_buf()),
            }),
        })
    }

    /// Wrap a single already-initialized connection.
    ///
    /// Used for in-memory stores, which cannot be opened twice.
    pub fn from_database(db: Database) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(vec![db]),
                permits: Arc::new(Semaphore::new(1)),
                path: None,
            }),
        }
    }

    /// Wait for a free connection
    pub async fn acquire(&self) -> Result<PooledDatabase> {
        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| SmartLeaseError::Other(anyhow::anyhow!("store pool closed: {}", e)))?;
        self.checkout(permit)
    }

    fn checkout(&self, permit: OwnedSemaphorePermit) -> Result<PooledDatabase> {
        let db = {
            let mut idle = self.inner.idle.lock().unwrap_or_else(|e| e.into_inner());
            idle.pop()
        };

        // A permit guarantees an idle slot unless a previous holder panicked
        // while reopening; fall back to a fresh connection in that case.
        let db = match db {
            Some(db) => db,
            None => match &self.inner.path {
                Some(path) => Database::open(path)?,
                None => {
                    return Err(SmartLeaseError::Other(anyhow::anyhow!(
                        "in-memory store connection was lost"
                    )))
                }
            },
        };

        Ok(PooledDatabase {
            db: Some(db),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }
}

/// A connection checked out of a [`DatabasePool`]
pub struct PooledDatabase {
    db: Option<Database>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledDatabase {
    type Target = Database;

    fn deref(&self) -> &Database {
        // Only taken in Drop
        self.db.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledDatabase {
    fn drop(&mut self) {
        if let Some(db) = self.db.take() {
            let mut idle = self.pool.idle.lock().unwrap_or_else(|e| e.into_inner());
            idle.push(db);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PropertyRecord;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_pool_shares_one_store() {
        let dir = TempDir::new().unwrap();
        let pool = DatabasePool::open(dir.path().join("store.sqlite"), 3).unwrap();

        {
            let db = pool.acquire().await.unwrap();
            let rec = PropertyRecord::from_fields([("property_id", "p1")]).unwrap();
            db.insert_property(&rec).unwrap();
        }

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_eq!(a.count_properties().unwrap(), 1);
        assert_eq!(b.count_properties().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_connection_returns_on_drop() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let pool = DatabasePool::from_database(db);

        let first = pool.acquire().await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(blocked.is_err());
        drop(first);

        let again = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(matches!(again, Ok(Ok(_))));
    }
}
