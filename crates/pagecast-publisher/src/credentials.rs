//! Page credential lookup.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use pagecast_graph::AccessToken;
use pagecast_models::DestinationId;

use crate::error::{PublishError, PublishResult};

/// Resolves the access token for a destination page.
///
/// Lookups are read-only and may be repeated.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when the destination is not connected.
    async fn lookup(&self, destination: &DestinationId) -> PublishResult<Option<AccessToken>>;
}

/// Credential store held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    tokens: HashMap<DestinationId, AccessToken>,
}

/// One connected page as stored in a pages file.
#[derive(Debug, Deserialize)]
struct PageRecord {
    page_id: String,
    page_access_token: AccessToken,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PagesFile {
    Records(Vec<PageRecord>),
    Map(HashMap<String, AccessToken>),
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, destination: impl Into<DestinationId>, token: AccessToken) {
        self.tokens.insert(destination.into(), token);
    }

    pub fn with(mut self, destination: impl Into<DestinationId>, token: impl Into<String>) -> Self {
        self.insert(destination, AccessToken::new(token));
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Parse a pages document.
    ///
    /// Accepts either `[{"page_id": .., "page_access_token": ..}]` or a
    /// `{"page_id": "token"}` map.
    pub fn from_json(json: &str) -> PublishResult<Self> {
        let parsed: PagesFile = serde_json::from_str(json)
            .map_err(|e| PublishError::credential_store(format!("invalid pages file: {}", e)))?;

        let tokens = match parsed {
            PagesFile::Records(records) => records
                .into_iter()
                .map(|r| (DestinationId::new(r.page_id), r.page_access_token))
                .collect(),
            PagesFile::Map(map) => map
                .into_iter()
                .map(|(id, token)| (DestinationId::new(id), token))
                .collect(),
        };

        Ok(Self { tokens })
    }

    /// Load a pages file from disk.
    pub async fn load(path: impl AsRef<Path>) -> PublishResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            PublishError::credential_store(format!("cannot read {}: {}", path.display(), e))
        })?;
        let store = Self::from_json(&json)?;
        info!(pages = store.len(), path = %path.display(), "Loaded page credentials");
        Ok(store)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, destination: &DestinationId) -> PublishResult<Option<AccessToken>> {
        Ok(self.tokens.get(destination).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup() {
        let store = InMemoryCredentialStore::new().with("page-1", "tok-1");
        assert_eq!(
            store.lookup(&"page-1".into()).await.unwrap(),
            Some(AccessToken::new("tok-1"))
        );
        assert_eq!(store.lookup(&"page-2".into()).await.unwrap(), None);
    }

    #[test]
    fn test_from_json_records_and_map() {
        let records = InMemoryCredentialStore::from_json(
            r#"[{"page_id": "111", "page_access_token": "a", "page_name": "Cafe"},
                {"page_id": "222", "page_access_token": "b"}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);

        let map = InMemoryCredentialStore::from_json(r#"{"111": "a"}"#).unwrap();
        assert_eq!(map.len(), 1);

        assert!(InMemoryCredentialStore::from_json("[1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = InMemoryCredentialStore::load(dir.path().join("pages.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::CredentialStore(_)));
    }
}
