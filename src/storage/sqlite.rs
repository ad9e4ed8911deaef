//! SQLite-backed stores.
//!
//! Payloads are stored as JSON bodies next to their lookup keys; the
//! write-once constraint on stage results is the primary key on
//! `(indicator_id, stage)`.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use tracing::info;

use crate::domain::{
    ClassificationRecord, IndicatorDescriptor, Result, StageName, StageResult,
};

use super::repository::{
    ClassificationRepository, IndicatorRepository, StageFailureRecord, StageStore,
};

#[derive(Clone)]
pub struct SqliteStores {
    pool: Pool<Sqlite>,
}

impl SqliteStores {
    pub async fn connect(url: &str) -> Result<Self> {
        // An in-memory database exists per connection; more than one
        // connection in the pool would see different databases.
        let max_connections = if url.contains(":memory:") { 1 } else { 10 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        let stores = Self { pool };
        stores.init_schema().await?;
        info!(url = %url, "sqlite stores ready");
        Ok(stores)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS indicators (
                id TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stage_results (
                indicator_id TEXT NOT NULL,
                stage TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (indicator_id, stage)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stage_failures (
                indicator_id TEXT PRIMARY KEY,
                stage TEXT NOT NULL,
                reason TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS classification_records (
                indicator_id TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl IndicatorRepository for SqliteStores {
    async fn upsert(&self, descriptor: &IndicatorDescriptor) -> Result<()> {
        let body = serde_json::to_string(descriptor)?;
        sqlx::query(
            r#"
            INSERT INTO indicators (id, body, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(&descriptor.id)
        .bind(body)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<IndicatorDescriptor>> {
        let row = sqlx::query("SELECT body FROM indicators WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            let body: String = r.get("body");
            serde_json::from_str(&body).map_err(Into::into)
        })
        .transpose()
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM indicators ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }
}

#[async_trait::async_trait]
impl StageStore for SqliteStores {
    async fn put(&self, result: &StageResult) -> Result<bool> {
        let body = serde_json::to_string(result)?;
        let outcome = sqlx::query(
            r#"
            INSERT OR IGNORE INTO stage_results (indicator_id, stage, body, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&result.indicator_id)
        .bind(result.stage.as_str())
        .bind(body)
        .bind(result.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    async fn get(&self, indicator_id: &str, stage: StageName) -> Result<Option<StageResult>> {
        let row = sqlx::query(
            "SELECT body FROM stage_results WHERE indicator_id = ?1 AND stage = ?2",
        )
        .bind(indicator_id)
        .bind(stage.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| {
            let body: String = r.get("body");
            serde_json::from_str(&body).map_err(Into::into)
        })
        .transpose()
    }

    async fn delete_for(&self, indicator_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM stage_results WHERE indicator_id = ?1")
            .bind(indicator_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM stage_failures WHERE indicator_id = ?1")
            .bind(indicator_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn record_failure(&self, failure: &StageFailureRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stage_failures (indicator_id, stage, reason, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(indicator_id) DO UPDATE
                SET stage = excluded.stage,
                    reason = excluded.reason,
                    created_at = excluded.created_at
            "#,
        )
        .bind(&failure.indicator_id)
        .bind(failure.stage.as_str())
        .bind(&failure.reason)
        .bind(failure.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_failure(&self, indicator_id: &str) -> Result<Option<StageFailureRecord>> {
        let row = sqlx::query(
            "SELECT stage, reason, created_at FROM stage_failures WHERE indicator_id = ?1",
        )
        .bind(indicator_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| {
            let stage: String = r.get("stage");
            let stage = serde_json::from_str(&format!("\"{stage}\""))?;
            let created_at: String = r.get("created_at");
            Ok(StageFailureRecord {
                indicator_id: indicator_id.to_string(),
                stage,
                reason: r.get("reason"),
                created_at: created_at
                    .parse()
                    .map_err(|e| crate::domain::IndicatorOpsError::internal(format!(
                        "bad timestamp in stage_failures: {e}"
                    )))?,
            })
        })
        .transpose()
    }
}

#[async_trait::async_trait]
impl ClassificationRepository for SqliteStores {
    async fn upsert(&self, record: &ClassificationRecord) -> Result<()> {
        let body = serde_json::to_string(record)?;
        sqlx::query(
            r#"
            INSERT INTO classification_records (indicator_id, body, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(indicator_id) DO UPDATE
                SET body = excluded.body, created_at = excluded.created_at
            "#,
        )
        .bind(&record.indicator_id)
        .bind(body)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, indicator_id: &str) -> Result<Option<ClassificationRecord>> {
        let row = sqlx::query("SELECT body FROM classification_records WHERE indicator_id = ?1")
            .bind(indicator_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            let body: String = r.get("body");
            serde_json::from_str(&body).map_err(Into::into)
        })
        .transpose()
    }

    async fn delete(&self, indicator_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM classification_records WHERE indicator_id = ?1")
            .bind(indicator_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BooleanReviewResult, LlmProvider, StagePayload};

    async fn stores() -> SqliteStores {
        SqliteStores::connect("sqlite::memory:").await.unwrap()
    }

    fn stage_result(indicator_id: &str) -> StageResult {
        StageResult::new(
            indicator_id.to_string(),
            StagePayload::Review(BooleanReviewResult {
                is_correct: true,
                incorrect_fields: vec![],
                confidence: 0.9,
                reasoning: "fine".to_string(),
            }),
            0.9,
            "fine".to_string(),
            LlmProvider::Local,
        )
    }

    #[tokio::test]
    async fn test_stage_round_trip_and_write_once() {
        let stores = stores().await;
        let result = stage_result("GDP_USA_123");

        assert!(stores.put(&result).await.unwrap());
        assert!(!stores.put(&result).await.unwrap());

        let stored = StageStore::get(&stores, "GDP_USA_123", StageName::Review)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.indicator_id, "GDP_USA_123");
        assert_eq!(stored.confidence, 0.9);
    }

    #[tokio::test]
    async fn test_delete_for() {
        let stores = stores().await;
        stores.put(&stage_result("A")).await.unwrap();
        stores.delete_for("A").await.unwrap();
        assert!(StageStore::get(&stores, "A", StageName::Review)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_indicator_upsert() {
        let stores = stores().await;
        let mut descriptor = IndicatorDescriptor::new("X", "Exports").with_units("USD Million");
        IndicatorRepository::upsert(&stores, &descriptor).await.unwrap();

        descriptor.units_raw = Some("USD Billion".to_string());
        IndicatorRepository::upsert(&stores, &descriptor).await.unwrap();

        let stored = IndicatorRepository::get(&stores, "X").await.unwrap().unwrap();
        assert_eq!(stored.units_raw.as_deref(), Some("USD Billion"));
        assert_eq!(stores.list_ids().await.unwrap(), vec!["X".to_string()]);
    }

    #[tokio::test]
    async fn test_file_backed_store_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("stages.db").display());

        {
            let stores = SqliteStores::connect(&url).await.unwrap();
            stores.put(&stage_result("GDP_USA_123")).await.unwrap();
            stores.pool().close().await;
        }

        // A fresh connection sees the persisted stage, so a crashed run can
        // resume where it left off.
        let stores = SqliteStores::connect(&url).await.unwrap();
        let stored = StageStore::get(&stores, "GDP_USA_123", StageName::Review)
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_failure_round_trip() {
        let stores = stores().await;
        let failure = StageFailureRecord::new(
            "A".to_string(),
            StageName::Type,
            "retries exhausted".to_string(),
        );
        stores.record_failure(&failure).await.unwrap();
        let stored = stores.get_failure("A").await.unwrap().unwrap();
        assert_eq!(stored.stage, StageName::Type);
        assert_eq!(stored.reason, "retries exhausted");
    }
}
