//! Database operations for `semantic_anchors` and `anchor_components`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `semantic_anchors` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnchorRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

/// A row from the `anchor_components` table, joined for active anchors.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnchorComponentRow {
    pub anchor_id: i64,
    pub component_type: String,
    pub component_ref: String,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns all active anchors, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_anchors(pool: &PgPool) -> Result<Vec<AnchorRow>, DbError> {
    let rows = sqlx::query_as::<_, AnchorRow>(
        "SELECT id, name, description, author, is_active, created_at, deactivated_at \
         FROM semantic_anchors \
         WHERE is_active = TRUE \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the components of every active anchor.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_anchor_components(pool: &PgPool) -> Result<Vec<AnchorComponentRow>, DbError> {
    let rows = sqlx::query_as::<_, AnchorComponentRow>(
        "SELECT ac.anchor_id, ac.component_type, ac.component_ref \
         FROM anchor_components ac \
         JOIN semantic_anchors sa ON sa.id = ac.anchor_id \
         WHERE sa.is_active = TRUE \
         ORDER BY ac.anchor_id, ac.id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Soft-deletes an anchor: `is_active = FALSE`, `deactivated_at = NOW()`.
///
/// Historical match links are preserved so threshold calibration can keep
/// reading them.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no active anchor has this id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_anchor(pool: &PgPool, anchor_id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE semantic_anchors \
         SET is_active = FALSE, deactivated_at = NOW() \
         WHERE id = $1 AND is_active = TRUE",
    )
    .bind(anchor_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
