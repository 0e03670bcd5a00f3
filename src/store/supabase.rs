use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::{BlobStore, EntryStore, SessionStore, UserRecord};
use crate::app_config::StorageConfig;
use crate::errors::StoreError;
use crate::nutrition::EntryRecord;
use crate::types::{SessionId, UserId};

/// Supabase project accessed over its REST (PostgREST) and Storage APIs.
pub struct SupabaseStore {
    client: reqwest::Client,
    url: String,
    key: String,
    tables: StorageConfig,
}

#[derive(serde::Deserialize)]
struct SessionRow {
    uid: UserId,
}

impl SupabaseStore {
    pub fn new(url: &str, key: String, tables: StorageConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            key,
            tables,
        })
    }

    /// `SUPABASE_URL` + `SUPABASE_KEY`, if both are set.
    pub fn from_env(tables: StorageConfig) -> Option<Result<Self, StoreError>> {
        let url = std::env::var("SUPABASE_URL").ok().filter(|v| !v.is_empty())?;
        let key = std::env::var("SUPABASE_KEY").ok().filter(|v| !v.is_empty())?;
        Some(Self::new(&url, key, tables))
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.url)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{key}", self.url, self.tables.bucket)
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{key}",
            self.url, self.tables.bucket
        )
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("apikey", &self.key).bearer_auth(&self.key)
    }

    async fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> Result<(), StoreError> {
        let res = self
            .authed(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        check(res).await.map(|_| ())
    }

    async fn select_eq<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Vec<T>, StoreError> {
        let filter = format!("eq.{value}");
        let res = self
            .authed(self.client.get(self.rest_url(table)))
            .query(&[(column, filter.as_str()), ("select", "*")])
            .send()
            .await?;
        let res = check(res).await?;
        res.json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }
}

async fn check(res: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    Err(StoreError::Rejected { status, body })
}

#[async_trait::async_trait]
impl BlobStore for SupabaseStore {
    async fn put_image(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let res = self
            .authed(self.client.post(self.object_url(key)))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        check(res).await?;
        Ok(self.public_url(key))
    }
}

#[async_trait::async_trait]
impl EntryStore for SupabaseStore {
    async fn insert_entry(&self, entry: &EntryRecord) -> Result<(), StoreError> {
        self.insert(&self.tables.entries_table, entry).await
    }
}

#[async_trait::async_trait]
impl SessionStore for SupabaseStore {
    async fn create_session(&self, sid: &SessionId, uid: &UserId) -> Result<(), StoreError> {
        self.insert(&self.tables.sessions_table, &json!({ "sid": sid, "uid": uid }))
            .await
    }

    async fn session_user(&self, sid: &SessionId) -> Result<Option<UserId>, StoreError> {
        let rows: Vec<SessionRow> = self
            .select_eq(&self.tables.sessions_table, "sid", sid.as_str())
            .await?;
        Ok(rows.into_iter().next().map(|row| row.uid))
    }

    async fn find_user(&self, uid: &UserId) -> Result<Option<UserRecord>, StoreError> {
        let rows: Vec<UserRecord> = self
            .select_eq(&self.tables.users_table, "uid", uid.as_str())
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        self.insert(&self.tables.users_table, user).await
    }
}
