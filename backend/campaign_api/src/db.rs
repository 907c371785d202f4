//! Database layer: migrations and the SQLite campaign store.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use funding_engine::{
    Campaign, CampaignId, CampaignStore, CommitOutcome, Receipt, SecretHash, StoreError,
    StoreFuture,
};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::Result;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct CampaignRow {
    id: String,
    title: String,
    description: String,
    target_amount: String,
    current_amount: String,
    created_at_ms: i64,
    end_at_ms: i64,
    edit_secret_hash: String,
    version: i64,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = StoreError;

    fn try_from(row: CampaignRow) -> std::result::Result<Self, Self::Error> {
        let corrupt = |field: &str| StoreError::Corrupt(format!("campaign {}: bad {field}", row.id));
        Ok(Campaign {
            id: CampaignId::from_str(&row.id).map_err(|_| corrupt("id"))?,
            title: row.title.clone(),
            description: row.description.clone(),
            target_amount: Decimal::from_str(&row.target_amount).map_err(|_| corrupt("target_amount"))?,
            current_amount: Decimal::from_str(&row.current_amount)
                .map_err(|_| corrupt("current_amount"))?,
            created_at: from_millis(row.created_at_ms).ok_or_else(|| corrupt("created_at_ms"))?,
            end_at: from_millis(row.end_at_ms).ok_or_else(|| corrupt("end_at_ms"))?,
            edit_secret_hash: SecretHash::decode(&row.edit_secret_hash)
                .ok_or_else(|| corrupt("edit_secret_hash"))?,
            version: u64::try_from(row.version).map_err(|_| corrupt("version"))?,
        })
    }
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn version_to_i64(version: u64) -> std::result::Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Corrupt(format!("version {version} out of range")))
}

const SELECT_CAMPAIGN: &str = r#"
    SELECT id, title, description, target_amount, current_amount,
           created_at_ms, end_at_ms, edit_secret_hash, version
    FROM   campaigns
"#;

// ─────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────

/// [`CampaignStore`] backed by the `campaigns` and `contribution_receipts` tables.
///
/// The conditional commit is an `UPDATE ... WHERE version = ?` inside a
/// transaction that also records the receipt, so both land or neither does.
#[derive(Clone)]
pub struct SqliteCampaignStore {
    pool: SqlitePool,
}

impl SqliteCampaignStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl CampaignStore for SqliteCampaignStore {
    fn create(&self, campaign: Campaign) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query(
                r#"
                INSERT INTO campaigns
                    (id, title, description, target_amount, current_amount,
                     created_at_ms, end_at_ms, edit_secret_hash, version)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(campaign.id.to_string())
            .bind(&campaign.title)
            .bind(&campaign.description)
            .bind(campaign.target_amount.to_string())
            .bind(campaign.current_amount.to_string())
            .bind(campaign.created_at.timestamp_millis())
            .bind(campaign.end_at.timestamp_millis())
            .bind(campaign.edit_secret_hash.encode())
            .bind(version_to_i64(campaign.version)?)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    Err(StoreError::DuplicateId(campaign.id))
                }
                Err(e) => Err(unavailable(e)),
            }
        })
    }

    fn get(&self, id: CampaignId) -> StoreFuture<'_, Option<Campaign>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, CampaignRow>(&format!("{SELECT_CAMPAIGN} WHERE id = ?1"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;
            row.map(Campaign::try_from).transpose()
        })
    }

    fn list(&self) -> StoreFuture<'_, Vec<Campaign>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, CampaignRow>(&format!(
                "{SELECT_CAMPAIGN} ORDER BY created_at_ms ASC, id ASC"
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
            rows.into_iter().map(Campaign::try_from).collect()
        })
    }

    fn compare_and_swap(
        &self,
        next: Campaign,
        expected_version: u64,
        receipt: Option<Receipt>,
    ) -> StoreFuture<'_, CommitOutcome> {
        Box::pin(async move {
            let id = next.id.to_string();
            let mut tx = self.pool.begin().await.map_err(unavailable)?;

            if let Some(receipt) = &receipt {
                let inserted = sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO contribution_receipts (campaign_id, request_id, version)
                    VALUES (?1, ?2, ?3)
                    "#,
                )
                .bind(&id)
                .bind(&receipt.request_id)
                .bind(version_to_i64(next.version)?)
                .execute(&mut *tx)
                .await
                .map_err(unavailable)?
                .rows_affected();

                if inserted == 0 {
                    let (version,): (i64,) = sqlx::query_as(
                        "SELECT version FROM contribution_receipts WHERE campaign_id = ?1 AND request_id = ?2",
                    )
                    .bind(&id)
                    .bind(&receipt.request_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(unavailable)?;
                    tx.rollback().await.map_err(unavailable)?;
                    let version = u64::try_from(version)
                        .map_err(|_| StoreError::Corrupt(format!("receipt version {version}")))?;
                    return Ok(CommitOutcome::Duplicate { version });
                }
            }

            let updated = sqlx::query(
                r#"
                UPDATE campaigns
                SET    title = ?1, description = ?2, target_amount = ?3,
                       current_amount = ?4, version = ?5
                WHERE  id = ?6 AND version = ?7
                "#,
            )
            .bind(&next.title)
            .bind(&next.description)
            .bind(next.target_amount.to_string())
            .bind(next.current_amount.to_string())
            .bind(version_to_i64(next.version)?)
            .bind(&id)
            .bind(version_to_i64(expected_version)?)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?
            .rows_affected();

            if updated != 1 {
                tx.rollback().await.map_err(unavailable)?;
                return Ok(CommitOutcome::Conflict);
            }

            tx.commit().await.map_err(unavailable)?;
            Ok(CommitOutcome::Committed)
        })
    }

    fn receipt(&self, id: CampaignId, request_id: String) -> StoreFuture<'_, Option<u64>> {
        Box::pin(async move {
            let row: Option<(i64,)> = sqlx::query_as(
                "SELECT version FROM contribution_receipts WHERE campaign_id = ?1 AND request_id = ?2",
            )
            .bind(id.to_string())
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
            Ok(row.and_then(|(v,)| u64::try_from(v).ok()))
        })
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
