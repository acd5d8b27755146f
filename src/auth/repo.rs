use std::sync::Arc;

use anyhow::Context;

use crate::auth::repo_types::UserRecord;
use crate::storage::KvStore;

/// Typed view of the user namespace. Keys must already be normalized.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KvStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Whether any value is stored for `email`, without decoding it.
    pub async fn exists(&self, email: &str) -> anyhow::Result<bool> {
        Ok(self.store.get(email).await?.is_some())
    }

    /// Find a user by normalized email.
    pub async fn get(&self, email: &str) -> anyhow::Result<Option<UserRecord>> {
        match self.store.get(email).await? {
            Some(raw) => {
                let user = serde_json::from_str(&raw)
                    .with_context(|| format!("decode user record {email}"))?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Unconditional write; replaces whatever is stored.
    pub async fn put(&self, email: &str, user: &UserRecord) -> anyhow::Result<()> {
        let raw = serde_json::to_string(user).context("encode user record")?;
        self.store.put(email, raw).await
    }

    /// Writes only if no record exists yet. Returns `false` when another writer got there first.
    pub async fn insert_new(&self, email: &str, user: &UserRecord) -> anyhow::Result<bool> {
        let raw = serde_json::to_string(user).context("encode user record")?;
        self.store.put_if_absent(email, raw).await
    }
}
