//! SQLite-backed key-value store.

use crate::KeyValueStore;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;

/// Key-value store persisted in the `entries` table of a [`Database`](crate::Database).
///
/// Obtained through [`Database::namespace()`](crate::Database::namespace).
/// Every query is filtered by namespace, so several stores can share one
/// database file without seeing each other's keys.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    namespace: String,
}
impl SqliteStore {
    pub(crate) fn new(pool: SqlitePool, namespace: impl Into<String>) -> Self {
        Self { pool, namespace: namespace.into() }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar(include_str!("../../queries/get_entry.sql"))
            .bind(&self.namespace)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(include_str!("../../queries/upsert_entry.sql"))
            .bind(&self.namespace)
            .bind(key)
            .bind(value)
            .bind(UtcDateTime::now().unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let now = UtcDateTime::now().unix_timestamp();
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for (key, value) in entries {
            sqlx::query(include_str!("../../queries/upsert_entry.sql"))
                .bind(&self.namespace)
                .bind(key)
                .bind(value)
                .bind(now)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(include_str!("../../queries/list_keys.sql"))
            .bind(&self.namespace)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn entries(&self) -> Result<Vec<(String, String)>> {
        sqlx::query_as(include_str!("../../queries/list_entries.sql"))
            .bind(&self.namespace)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(include_str!("../../queries/count_entries.sql"))
            .bind(&self.namespace)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        usize::try_from(count).or_raise(|| ErrorKind::InvalidData("entry count"))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query(include_str!("../../queries/delete_entry.sql"))
            .bind(&self.namespace)
            .bind(key)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<()> {
        let result = sqlx::query(include_str!("../../queries/clear_namespace.sql"))
            .bind(&self.namespace)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(namespace = %self.namespace, removed = result.rows_affected(), "Cleared store namespace");
        Ok(())
    }
}
