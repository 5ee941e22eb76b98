//! PostgreSQL backing store.
//!
//! Objects and associations live in two tables. The association primary key
//! is the `(source_id, association_type, destination_id)` triple, which is
//! what makes a duplicate create fail atomically, and the listing index
//! serves the `(created_at DESC, destination_id DESC)` range scans directly.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::types::FromSql;
use tokio_postgres::Row;

use assoc_core::{
    Association, AssociationItem, AssociationKey, AssociationPatch, AssociationStatus,
    AssociationType, AssocResult, NewAssociation, Object, ObjectId, ObjectType, StorageError,
};
use assoc_storage::{BackingStore, PageQuery};
use serde_json::Value as JsonValue;

use crate::config::DbConfig;
use crate::error::{pg_error, pg_insert_error, pool_error, ServiceResult};

/// Tables and indexes, idempotent.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS objects (
    id          BIGSERIAL PRIMARY KEY,
    object_type TEXT        NOT NULL,
    data        JSONB       NOT NULL DEFAULT '{}'::jsonb,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS associations (
    source_id        BIGINT      NOT NULL,
    association_type TEXT        NOT NULL,
    destination_id   BIGINT      NOT NULL,
    data             JSONB       NOT NULL DEFAULT '{}'::jsonb,
    created_at       TIMESTAMPTZ NOT NULL,
    status           SMALLINT    NOT NULL DEFAULT 1,
    PRIMARY KEY (source_id, association_type, destination_id)
);

CREATE INDEX IF NOT EXISTS associations_listing_idx
    ON associations (source_id, association_type, created_at DESC, destination_id DESC);
"#;

const OBJECT_COLUMNS: &str = "id, object_type, data, created_at, updated_at";
const ASSOCIATION_COLUMNS: &str =
    "source_id, association_type, destination_id, data, created_at, status";

/// Database client wrapping a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ServiceResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> AssocResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }

    /// Create the tables and indexes if they are missing.
    pub async fn ensure_schema(&self) -> AssocResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(SCHEMA).await.map_err(pg_error)?;
        tracing::info!("Schema ensured");
        Ok(())
    }

    /// Close the pool. Checked-out connections are dropped on return.
    pub fn close(&self) {
        self.pool.close();
    }
}

// ============================================================================
// ROW DECODING
// ============================================================================

fn column<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> AssocResult<T> {
    row.try_get(name)
        .map_err(|e| StorageError::malformed(format!("column {name}: {e}")).into())
}

fn id_column(row: &Row, name: &str) -> AssocResult<ObjectId> {
    let raw: i64 = column(row, name)?;
    ObjectId::new(raw).map_err(|e| StorageError::malformed(format!("column {name}: {e}")).into())
}

fn object_from_row(row: &Row) -> AssocResult<Object> {
    let object_type: String = column(row, "object_type")?;
    Ok(Object {
        id: id_column(row, "id")?,
        object_type: ObjectType::from_db_str(&object_type)
            .map_err(|e| StorageError::malformed(e.to_string()))?,
        data: column(row, "data")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn association_from_row(row: &Row) -> AssocResult<Association> {
    let association_type: String = column(row, "association_type")?;
    let status: i16 = column(row, "status")?;
    Ok(Association {
        source_id: id_column(row, "source_id")?,
        destination_id: id_column(row, "destination_id")?,
        association_type: AssociationType::from_db_str(&association_type)
            .map_err(|e| StorageError::malformed(e.to_string()))?,
        data: column(row, "data")?,
        created_at: column(row, "created_at")?,
        status: AssociationStatus::from_db_i16(status)
            .map_err(|e| StorageError::malformed(e.to_string()))?,
    })
}

fn item_from_row(row: &Row) -> AssocResult<AssociationItem> {
    Ok(AssociationItem {
        destination_id: id_column(row, "destination_id")?,
        data: column(row, "data")?,
        created_at: column(row, "created_at")?,
    })
}

// ============================================================================
// BACKING STORE
// ============================================================================

#[async_trait]
impl BackingStore for DbClient {
    async fn object_insert(&self, object_type: ObjectType, data: &JsonValue) -> AssocResult<Object> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "INSERT INTO objects (object_type, data) VALUES ($1, $2) RETURNING {OBJECT_COLUMNS}"
        );
        let row = conn
            .query_one(&sql, &[&object_type.as_db_str(), data])
            .await
            .map_err(pg_error)?;
        object_from_row(&row)
    }

    async fn object_get(&self, id: ObjectId) -> AssocResult<Option<Object>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {OBJECT_COLUMNS} FROM objects WHERE id = $1");
        let row = conn
            .query_opt(&sql, &[&id.get()])
            .await
            .map_err(pg_error)?;
        row.as_ref().map(object_from_row).transpose()
    }

    async fn object_exists(&self, id: ObjectId) -> AssocResult<bool> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one("SELECT EXISTS(SELECT 1 FROM objects WHERE id = $1)", &[&id.get()])
            .await
            .map_err(pg_error)?;
        row.try_get(0)
            .map_err(|e| StorageError::malformed(format!("exists: {e}")).into())
    }

    async fn object_update(&self, id: ObjectId, data: &JsonValue) -> AssocResult<bool> {
        let conn = self.get_conn().await?;
        let updated = conn
            .execute(
                "UPDATE objects SET data = $2, updated_at = NOW() WHERE id = $1",
                &[&id.get(), data],
            )
            .await
            .map_err(pg_error)?;
        Ok(updated > 0)
    }

    async fn object_delete(&self, id: ObjectId) -> AssocResult<bool> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute("DELETE FROM objects WHERE id = $1", &[&id.get()])
            .await
            .map_err(pg_error)?;
        Ok(deleted > 0)
    }

    async fn association_insert(&self, new: &NewAssociation) -> AssocResult<Association> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "INSERT INTO associations \
             (source_id, association_type, destination_id, data, created_at, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ASSOCIATION_COLUMNS}"
        );
        let row = conn
            .query_one(
                &sql,
                &[
                    &new.key.source_id.get(),
                    &new.key.association_type.as_db_str(),
                    &new.key.destination_id.get(),
                    &new.data,
                    &new.created_at,
                    &AssociationStatus::Active.as_db_i16(),
                ],
            )
            .await
            .map_err(|e| pg_insert_error(e, &new.key))?;
        association_from_row(&row)
    }

    async fn association_get_active(&self, key: &AssociationKey) -> AssocResult<Option<Association>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {ASSOCIATION_COLUMNS} FROM associations \
             WHERE source_id = $1 AND association_type = $2 AND destination_id = $3 AND status = $4"
        );
        let row = conn
            .query_opt(
                &sql,
                &[
                    &key.source_id.get(),
                    &key.association_type.as_db_str(),
                    &key.destination_id.get(),
                    &AssociationStatus::Active.as_db_i16(),
                ],
            )
            .await
            .map_err(pg_error)?;
        row.as_ref().map(association_from_row).transpose()
    }

    async fn association_update(
        &self,
        key: &AssociationKey,
        patch: &AssociationPatch,
    ) -> AssocResult<Option<Association>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "UPDATE associations SET data = COALESCE($4, data), status = COALESCE($5, status) \
             WHERE source_id = $1 AND association_type = $2 AND destination_id = $3 \
             RETURNING {ASSOCIATION_COLUMNS}"
        );
        let status = patch.status.map(|s| s.as_db_i16());
        let row = conn
            .query_opt(
                &sql,
                &[
                    &key.source_id.get(),
                    &key.association_type.as_db_str(),
                    &key.destination_id.get(),
                    &patch.data,
                    &status,
                ],
            )
            .await
            .map_err(pg_error)?;
        row.as_ref().map(association_from_row).transpose()
    }

    async fn association_page(&self, query: &PageQuery) -> AssocResult<Vec<AssociationItem>> {
        let conn = self.get_conn().await?;
        let source_id = query.source_id.get();
        let association_type = query.association_type.as_db_str();
        let active = AssociationStatus::Active.as_db_i16();
        let limit = i64::from(query.limit);

        let rows = match &query.after {
            None => {
                conn.query(
                    "SELECT destination_id, data, created_at FROM associations \
                     WHERE source_id = $1 AND association_type = $2 AND status = $3 \
                     ORDER BY created_at DESC, destination_id DESC \
                     LIMIT $4",
                    &[&source_id, &association_type, &active, &limit],
                )
                .await
            }
            Some(cursor) => {
                conn.query(
                    "SELECT destination_id, data, created_at FROM associations \
                     WHERE source_id = $1 AND association_type = $2 AND status = $3 \
                       AND (created_at, destination_id) < ($4, $5) \
                     ORDER BY created_at DESC, destination_id DESC \
                     LIMIT $6",
                    &[
                        &source_id,
                        &association_type,
                        &active,
                        &cursor.created_at,
                        &cursor.destination_id.get(),
                        &limit,
                    ],
                )
                .await
            }
        }
        .map_err(pg_error)?;

        rows.iter().map(item_from_row).collect()
    }

    async fn association_count_active(
        &self,
        source_id: ObjectId,
        association_type: AssociationType,
    ) -> AssocResult<u64> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one(
                "SELECT COUNT(*) FROM associations \
                 WHERE source_id = $1 AND association_type = $2 AND status = $3",
                &[
                    &source_id.get(),
                    &association_type.as_db_str(),
                    &AssociationStatus::Active.as_db_i16(),
                ],
            )
            .await
            .map_err(pg_error)?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| StorageError::malformed(format!("count: {e}")))?;
        u64::try_from(count).map_err(|_| StorageError::malformed(format!("negative count {count}")).into())
    }

    async fn ping(&self) -> AssocResult<()> {
        let conn = self.get_conn().await?;
        conn.execute("SELECT 1", &[]).await.map_err(pg_error)?;
        Ok(())
    }
}
