//! Persistence collaborators: image blobs, entry rows, sessions and users.

use serde::{Deserialize, Serialize};

pub mod memory;
pub mod supabase;

use crate::errors::StoreError;
use crate::nutrition::EntryRecord;
use crate::types::{SessionId, UserId};

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: UserId,
    pub username: String,
}

/// Stores raw image bytes and hands back a publicly resolvable URL.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_image(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError>;
}

#[async_trait::async_trait]
pub trait EntryStore: Send + Sync {
    async fn insert_entry(&self, entry: &EntryRecord) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, sid: &SessionId, uid: &UserId) -> Result<(), StoreError>;

    async fn session_user(&self, sid: &SessionId) -> Result<Option<UserId>, StoreError>;

    async fn find_user(&self, uid: &UserId) -> Result<Option<UserRecord>, StoreError>;

    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError>;
}

/// Object key for an uploaded photo: `{uid}/{eid}.{ext}`.
pub fn image_key(uid: &UserId, eid: &crate::types::EntryId, content_type: &str) -> String {
    let ext = match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    };
    format!("{uid}/{eid}.{ext}")
}
