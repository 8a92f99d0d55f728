//! Database operations for the `articles` table and its digest/reset surfaces.

use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// An article eligible for scoring: indexed but not yet analyzed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnscoredArticleRow {
    pub id: i64,
    pub title: String,
    pub source_category: String,
}

/// One (article, anchor) candidate row for digest selection.
///
/// An article matching several anchors produces several rows; the selection
/// engine aggregates them.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DigestCandidateRow {
    pub article_id: i64,
    pub title: String,
    pub link: String,
    pub source_name: String,
    pub source_category: String,
    pub similarity_score: f64,
    pub is_org_highlight: bool,
    pub anchor_name: String,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns up to `limit` articles that are indexed but not yet analyzed,
/// oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unscored_articles(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<UnscoredArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, UnscoredArticleRow>(
        "SELECT a.id, a.title, src.category AS source_category \
         FROM articles a \
         JOIN sources src ON src.id = a.source_id \
         WHERE a.indexed_at IS NOT NULL AND a.analyzed_at IS NULL \
         ORDER BY a.id \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns digest candidate rows within the trailing window.
///
/// A row qualifies when the article was created inside the lookback window,
/// has not been sent in a digest, and is either a global highlight or
/// carries a score at or above `min_score`. Joined against active anchors
/// only.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_digest_candidates(
    pool: &PgPool,
    lookback_hours: i64,
    min_score: f64,
) -> Result<Vec<DigestCandidateRow>, DbError> {
    let rows = sqlx::query_as::<_, DigestCandidateRow>(
        "SELECT a.id AS article_id, a.title, a.link, \
                src.name AS source_name, src.category AS source_category, \
                aal.similarity_score, \
                COALESCE(a.is_org_highlight, FALSE) AS is_org_highlight, \
                sa.name AS anchor_name \
         FROM articles a \
         JOIN article_anchor_links aal ON aal.article_id = a.id \
         JOIN sources src ON src.id = a.source_id \
         JOIN semantic_anchors sa ON sa.id = aal.anchor_id \
         WHERE sa.is_active = TRUE \
           AND a.digest_sent_at IS NULL \
           AND a.created_at > NOW() - make_interval(hours => $1::INT) \
           AND (COALESCE(a.is_org_highlight, FALSE) OR aal.similarity_score >= $2)",
    )
    .bind(lookback_hours)
    .bind(min_score)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Stamps `digest_sent_at = NOW()` for the given articles.
///
/// Called by the delivery collaborator after the rendered digest was
/// actually used; the selection engine itself never writes.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_articles_sent(pool: &PgPool, article_ids: &[i64]) -> Result<u64, DbError> {
    if article_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "UPDATE articles SET digest_sent_at = NOW() WHERE id = ANY($1)",
    )
    .bind(article_ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Deliberate external reset: clears all highlight flags and enrichment
/// stamps so the classifier may re-run over the full history.
///
/// Both updates commit in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either update fails.
pub async fn reset_enrichment(pool: &PgPool) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let links = sqlx::query(
        "UPDATE article_anchor_links SET is_anchor_highlight = NULL \
         WHERE is_anchor_highlight IS NOT NULL",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE articles SET is_org_highlight = NULL, enrichment_processed_at = NULL \
         WHERE enrichment_processed_at IS NOT NULL",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(links.rows_affected())
}

/// Deliberate external reset: deletes all match links and clears
/// `analyzed_at` so the scoring pass may re-run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn reset_analysis(pool: &PgPool) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let links = sqlx::query("DELETE FROM article_anchor_links")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE articles SET analyzed_at = NULL, enrichment_processed_at = NULL, \
                             is_org_highlight = NULL \
         WHERE analyzed_at IS NOT NULL",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(links.rows_affected())
}
