use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::Result;

/// Trait for storing and retrieving live sessions
#[async_trait]
pub trait SessionStorage<S>: Send + Sync
where
    S: Send + Sync + 'static,
{
    async fn save(&self, id: String, session: Arc<S>) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Arc<S>>>;
    /// Remove a session. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool>;
    /// Remove every session `keep` rejects and return the removed ones
    async fn retain(&self, keep: &(dyn for<'a> Fn(&'a S) -> bool + Send + Sync)) -> Result<Vec<Arc<S>>>;
}

/// In-memory implementation of SessionStorage.
///
/// Sessions live only as long as the process; nothing is persisted.
pub struct InMemorySessionStorage<S> {
    sessions: Arc<DashMap<String, Arc<S>>>,
}

impl<S> InMemorySessionStorage<S> {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<S> Default for InMemorySessionStorage<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> SessionStorage<S> for InMemorySessionStorage<S>
where
    S: Send + Sync + 'static,
{
    async fn save(&self, id: String, session: Arc<S>) -> Result<()> {
        self.sessions.insert(id, session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Arc<S>>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.remove(id).is_some())
    }

    async fn retain(&self, keep: &(dyn for<'a> Fn(&'a S) -> bool + Send + Sync)) -> Result<Vec<Arc<S>>> {
        let mut removed = Vec::new();
        self.sessions.retain(|_, session| {
            if keep(session) {
                true
            } else {
                removed.push(session.clone());
                false
            }
        });
        Ok(removed)
    }
}
