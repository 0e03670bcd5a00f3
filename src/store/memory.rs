use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{BlobStore, EntryStore, SessionStore, UserRecord};
use crate::errors::StoreError;
use crate::nutrition::EntryRecord;
use crate::types::{SessionId, UserId};

/// Process-local store. Used when no Supabase project is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, (Vec<u8>, String)>>,
    entries: RwLock<Vec<EntryRecord>>,
    sessions: RwLock<HashMap<SessionId, UserId>>,
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<EntryRecord> {
        self.entries.read().await.clone()
    }

    pub async fn blob(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.blobs.read().await.get(key).cloned()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryStore {
    async fn put_image(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        self.blobs
            .write()
            .await
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(format!("memory://{key}"))
    }
}

#[async_trait::async_trait]
impl EntryStore for MemoryStore {
    async fn insert_entry(&self, entry: &EntryRecord) -> Result<(), StoreError> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, sid: &SessionId, uid: &UserId) -> Result<(), StoreError> {
        self.sessions.write().await.insert(sid.clone(), uid.clone());
        Ok(())
    }

    async fn session_user(&self, sid: &SessionId) -> Result<Option<UserId>, StoreError> {
        Ok(self.sessions.read().await.get(sid).cloned())
    }

    async fn find_user(&self, uid: &UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(uid).cloned())
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        self.users
            .write()
            .await
            .insert(user.uid.clone(), user.clone());
        Ok(())
    }
}
