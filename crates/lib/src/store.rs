//! User reachability hook: written on follow (put) and unfollow (delete).
//!
//! Persistence is left to the integrator. Pushing to users later requires a real
//! implementation of [`UserStore`]; the default only logs.

use async_trait::async_trait;

/// Store of users that can currently be reached by push.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// User followed (or re-followed) the bot.
    async fn put(&self, user_id: &str) -> anyhow::Result<()>;
    /// User unfollowed or blocked the bot.
    async fn delete(&self, user_id: &str) -> anyhow::Result<()>;
}

/// Logs reachability changes and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyStore;

#[async_trait]
impl UserStore for LogOnlyStore {
    async fn put(&self, user_id: &str) -> anyhow::Result<()> {
        log::info!("user {} is reachable (no store configured, not persisted)", user_id);
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> anyhow::Result<()> {
        log::info!("user {} is unreachable (no store configured, not persisted)", user_id);
        Ok(())
    }
}
