//! Database operations for the `article_anchor_links` table.
//!
//! The scoring pass appends links, the calibrator reads the full history,
//! and the enrichment pass writes flags. Every write surface here is
//! transactional: a scoring batch or an enrichment pass commits atomically
//! or not at all.

use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A link to insert from the scoring pass.
#[derive(Debug, Clone)]
pub struct NewLink {
    pub article_id: i64,
    pub anchor_id: i64,
    pub score: f64,
}

/// An unflagged link joined with the context the classifier needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnflaggedLinkRow {
    pub link_id: i64,
    pub article_id: i64,
    pub anchor_name: String,
    pub source_category: String,
    pub similarity_score: f64,
}

/// One historical score for threshold calibration.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoricalScoreRow {
    pub anchor_name: String,
    pub source_category: String,
    pub similarity_score: f64,
}

/// The write payload of one enrichment pass.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentUpdates {
    /// (link id, `is_anchor_highlight`)
    pub link_flags: Vec<(i64, bool)>,
    /// (article id, `is_org_highlight`); every article listed here also gets
    /// its `enrichment_processed_at` stamp.
    pub article_flags: Vec<(i64, bool)>,
}

/// Row counts actually written by [`apply_enrichment`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichmentWriteSummary {
    pub links_updated: u64,
    pub articles_updated: u64,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a batch of links and stamps the batch's articles as analyzed,
/// in one transaction.
///
/// The unique constraint on (`article_id`, `anchor_id`) plus
/// `ON CONFLICT DO NOTHING` makes re-running scoring safe: an existing pair
/// is ignored, never double-counted. Articles are stamped even when they
/// produced no links (e.g. no chunk embeddings yet resolvable), so the
/// scoring loop always progresses.
///
/// Returns the number of links actually inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is committed
/// in that case.
pub async fn insert_links_and_stamp(
    pool: &PgPool,
    links: &[NewLink],
    article_ids: &[i64],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let mut inserted = 0_u64;
    if !links.is_empty() {
        let link_article_ids: Vec<i64> = links.iter().map(|l| l.article_id).collect();
        let anchor_ids: Vec<i64> = links.iter().map(|l| l.anchor_id).collect();
        let scores: Vec<f64> = links.iter().map(|l| l.score).collect();

        let result = sqlx::query(
            "INSERT INTO article_anchor_links (article_id, anchor_id, similarity_score) \
             SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::DOUBLE PRECISION[]) \
             ON CONFLICT (article_id, anchor_id) DO NOTHING",
        )
        .bind(&link_article_ids)
        .bind(&anchor_ids)
        .bind(&scores)
        .execute(&mut *tx)
        .await?;
        inserted = result.rows_affected();
    }

    if !article_ids.is_empty() {
        sqlx::query(
            "UPDATE articles SET analyzed_at = NOW() \
             WHERE id = ANY($1) AND analyzed_at IS NULL",
        )
        .bind(article_ids)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(inserted)
}

/// Returns all links of not-yet-enriched articles, joined with anchor name
/// and source category. Active anchors only.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unflagged_links(pool: &PgPool) -> Result<Vec<UnflaggedLinkRow>, DbError> {
    let rows = sqlx::query_as::<_, UnflaggedLinkRow>(
        "SELECT aal.id AS link_id, a.id AS article_id, \
                sa.name AS anchor_name, src.category AS source_category, \
                aal.similarity_score \
         FROM articles a \
         JOIN article_anchor_links aal ON aal.article_id = a.id \
         JOIN sources src ON src.id = a.source_id \
         JOIN semantic_anchors sa ON sa.id = aal.anchor_id \
         WHERE a.analyzed_at IS NOT NULL \
           AND a.enrichment_processed_at IS NULL \
           AND sa.is_active = TRUE",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the full historical score population for active anchors,
/// grouped upstream by (anchor, source category).
///
/// Calibration reads committed history only; the caller runs this before
/// classifying so thresholds are never inflated by the batch being judged.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_historical_scores(pool: &PgPool) -> Result<Vec<HistoricalScoreRow>, DbError> {
    let rows = sqlx::query_as::<_, HistoricalScoreRow>(
        "SELECT sa.name AS anchor_name, src.category AS source_category, \
                aal.similarity_score \
         FROM article_anchor_links aal \
         JOIN articles a ON a.id = aal.article_id \
         JOIN sources src ON src.id = a.source_id \
         JOIN semantic_anchors sa ON sa.id = aal.anchor_id \
         WHERE sa.is_active = TRUE",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns every (article id, score) pair across all matches, for the
/// population-wide global-relevance signal.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_article_score_history(pool: &PgPool) -> Result<Vec<(i64, f64)>, DbError> {
    let rows = sqlx::query_as::<_, (i64, f64)>(
        "SELECT article_id, similarity_score FROM article_anchor_links",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Persists one enrichment pass atomically: link flags, article org flags,
/// and `enrichment_processed_at` stamps commit together or not at all.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is committed
/// in that case, so a rerun sees the same unflagged population.
pub async fn apply_enrichment(
    pool: &PgPool,
    updates: &EnrichmentUpdates,
) -> Result<EnrichmentWriteSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = EnrichmentWriteSummary::default();

    if !updates.link_flags.is_empty() {
        let link_ids: Vec<i64> = updates.link_flags.iter().map(|(id, _)| *id).collect();
        let flags: Vec<bool> = updates.link_flags.iter().map(|(_, f)| *f).collect();

        let result = sqlx::query(
            "UPDATE article_anchor_links aal \
             SET is_anchor_highlight = u.flag \
             FROM UNNEST($1::BIGINT[], $2::BOOLEAN[]) AS u(id, flag) \
             WHERE aal.id = u.id",
        )
        .bind(&link_ids)
        .bind(&flags)
        .execute(&mut *tx)
        .await?;
        summary.links_updated = result.rows_affected();
    }

    if !updates.article_flags.is_empty() {
        let article_ids: Vec<i64> = updates.article_flags.iter().map(|(id, _)| *id).collect();
        let flags: Vec<bool> = updates.article_flags.iter().map(|(_, f)| *f).collect();

        let result = sqlx::query(
            "UPDATE articles a \
             SET is_org_highlight = u.flag, enrichment_processed_at = NOW() \
             FROM UNNEST($1::BIGINT[], $2::BOOLEAN[]) AS u(id, flag) \
             WHERE a.id = u.id",
        )
        .bind(&article_ids)
        .bind(&flags)
        .execute(&mut *tx)
        .await?;
        summary.articles_updated = result.rows_affected();
    }

    tx.commit().await?;

    Ok(summary)
}
