//! Re-sync target for the connection monitor

use async_trait::async_trait;

/// Something that can re-read its state from the remote source of truth
///
/// The connection monitor calls this after a confirmed `offline → online`
/// transition, since local state may be stale after a partition.
#[async_trait]
pub trait CacheRefresh: Send + Sync {
    /// Re-sync from the remote
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of entries now held
    /// - `Err(Error)`: The refresh failed and the previous state was kept
    async fn refresh(&self) -> crate::Result<usize>;
}
