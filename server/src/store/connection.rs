use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::Mutex;

use super::StoreError;

/// Establishes and tears down a storage handle.
#[async_trait]
pub trait Connect: Send + Sync {
    type Handle: Clone + Send + Sync;

    async fn connect(&self) -> Result<Self::Handle, StoreError>;

    fn is_live(&self, handle: &Self::Handle) -> bool;

    async fn close(&self, handle: Self::Handle);
}

/// Process-wide cache of one storage handle.
///
/// The slot lock is held while a connection is being established, so callers
/// arriving mid-attempt wait for that attempt and then share its handle.
pub struct ConnectionCache<C: Connect> {
    connector: C,
    slot: Mutex<Option<C::Handle>>,
}

impl<C: Connect> ConnectionCache<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached handle, establishing one first when the cache is
    /// empty or the cached handle has gone dead.
    pub async fn acquire(&self) -> Result<C::Handle, StoreError> {
        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.as_ref() {
            if self.connector.is_live(handle) {
                return Ok(handle.clone());
            }
            tracing::warn!("Cached storage handle is no longer live, reconnecting");
        }

        let handle = self.connector.connect().await?;
        tracing::info!("Storage handle established");
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Drops the cached handle and closes it. A later `acquire` reconnects.
    pub async fn release(&self) {
        let handle = self.slot.lock().await.take();
        if let Some(handle) = handle {
            self.connector.close(handle).await;
            tracing::info!("Storage handle released");
        }
    }
}

pub struct PgConnector {
    database_url: String,
    max_connections: u32,
}

impl PgConnector {
    pub fn new(database_url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections,
        }
    }
}

#[async_trait]
impl Connect for PgConnector {
    type Handle = PgPool;

    async fn connect(&self) -> Result<PgPool, StoreError> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn is_live(&self, handle: &PgPool) -> bool {
        !handle.is_closed()
    }

    async fn close(&self, handle: PgPool) {
        handle.close().await;
    }
}
