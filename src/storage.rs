use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

/// String-keyed, string-valued store shared by the credential store and the access log.
///
/// No cross-key or cross-call atomicity: a read followed by a write can interleave with
/// other callers. `put_if_absent` is the only conditional primitive.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn put(&self, key: &str, value: String) -> anyhow::Result<()>;
    /// Writes only when `key` has no value yet. Returns `true` when this call wrote.
    async fn put_if_absent(&self, key: &str, value: String) -> anyhow::Result<bool>;
}

#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> anyhow::Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: String) -> anyhow::Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value);
        Ok(true)
    }
}

/// Postgres-backed store. Each instance sees one namespace of the `kv_entries` table.
#[derive(Clone)]
pub struct PgKvStore {
    db: PgPool,
    namespace: String,
}

impl PgKvStore {
    pub fn new(db: PgPool, namespace: &str) -> Self {
        Self {
            db,
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl KvStore for PgKvStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            r#"
            SELECT value
            FROM kv_entries
            WHERE namespace = $1 AND key = $2
            "#,
        )
        .bind(&self.namespace)
        .bind(key)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("kv get {}/{}", self.namespace, key))?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: String) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (namespace, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (namespace, key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(&self.namespace)
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await
        .with_context(|| format!("kv put {}/{}", self.namespace, key))?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: String) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO kv_entries (namespace, key, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (namespace, key) DO NOTHING
            "#,
        )
        .bind(&self.namespace)
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await
        .with_context(|| format!("kv put_if_absent {}/{}", self.namespace, key))?;
        Ok(result.rows_affected() == 1)
    }
}
