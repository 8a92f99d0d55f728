//! Pass orchestration: scoring, enrichment, and digest selection.
//!
//! Passes run sequentially in one logical pipeline instance. Every commit
//! unit is transactional, so a pass that fails mid-flight leaves flags and
//! timestamps exactly as before; the retry wrapper re-runs whole passes on
//! connectivity failures only.

use sqlx::PgPool;

use anchorlink_core::{AppConfig, EngineSettings};
use anchorlink_db::{articles, links, pipeline_runs, NewLink, RunCounters};

use crate::aggregator::{load_anchor_vectors, load_article_vectors};
use crate::calibrate::calibrate;
use crate::classify::classify;
use crate::error::EngineError;
use crate::retry::retry_pass;
use crate::select::select_digest;
use crate::similarity::top_k_pooled_score;
use crate::types::{CandidateRow, DigestSelection, EnrichmentOutcome, ScoringOutcome};
use crate::vector_store::VectorStoreClient;

/// The result of one full pipeline invocation.
#[derive(Debug)]
pub struct PipelineSummary {
    pub run_id: i64,
    pub scoring: ScoringOutcome,
    pub enrichment: EnrichmentOutcome,
    pub selection: DigestSelection,
}

/// Score every pending article against every eligible anchor.
///
/// Articles are consumed in batches; each batch's link inserts and
/// `analyzed_at` stamps commit in one transaction. Passing `limit` scores a
/// single batch of at most that size — the test-mode entry point.
///
/// # Errors
///
/// Returns [`EngineError`] on database or vector-store failure. The batch
/// in flight is rolled back; previously committed batches stand.
pub async fn run_scoring_pass(
    pool: &PgPool,
    store: &VectorStoreClient,
    settings: &EngineSettings,
    batch_size: usize,
    limit: Option<usize>,
) -> Result<ScoringOutcome, EngineError> {
    let anchors = load_anchor_vectors(pool, store).await?;
    if anchors.is_empty() {
        tracing::warn!("no active anchors with resolvable vectors; scoring skipped");
        return Ok(ScoringOutcome::default());
    }

    let scoring = &settings.scoring;
    let floor_applies =
        |category: &str| scoring.floor_categories.iter().any(|c| c == category);

    let size = limit.unwrap_or(batch_size).max(1);
    let fetch_limit = i64::try_from(size).unwrap_or(i64::MAX);

    let mut outcome = ScoringOutcome::default();
    loop {
        let batch = articles::list_unscored_articles(pool, fetch_limit).await?;
        if batch.is_empty() {
            break;
        }

        let article_ids: Vec<i64> = batch.iter().map(|a| a.id).collect();
        let vectors_by_article = load_article_vectors(store, &article_ids).await?;

        let mut new_links: Vec<NewLink> = Vec::new();
        for article in &batch {
            let chunks = vectors_by_article
                .get(&article.id)
                .map_or(&[][..], Vec::as_slice);
            if chunks.is_empty() {
                // Stamped below with the rest of the batch; produces no links.
                continue;
            }

            for anchor in &anchors {
                let score = top_k_pooled_score(chunks, &anchor.vectors, scoring.top_k);

                if floor_applies(&article.source_category) && score < scoring.floor {
                    outcome.links_floored += 1;
                    continue;
                }

                new_links.push(NewLink {
                    article_id: article.id,
                    anchor_id: anchor.anchor_id,
                    score,
                });
            }
        }

        let inserted = links::insert_links_and_stamp(pool, &new_links, &article_ids).await?;
        outcome.articles_scored += batch.len();
        outcome.links_created += inserted;

        tracing::info!(
            batch = batch.len(),
            inserted,
            "scoring batch committed"
        );

        if limit.is_some() {
            break;
        }
    }

    tracing::info!(
        articles = outcome.articles_scored,
        links = outcome.links_created,
        floored = outcome.links_floored,
        "scoring pass finished"
    );
    Ok(outcome)
}

/// Calibrate thresholds from committed history, classify every unflagged
/// match, and persist all flags atomically.
///
/// Calibration completes before any classification starts, and reads the
/// full population rather than the batch being judged, so thresholds are
/// never self-referentially inflated.
///
/// # Errors
///
/// Returns [`EngineError`] on database failure; nothing is committed in
/// that case.
pub async fn run_enrichment_pass(
    pool: &PgPool,
    settings: &EngineSettings,
) -> Result<EnrichmentOutcome, EngineError> {
    let unflagged = links::list_unflagged_links(pool).await?;
    if unflagged.is_empty() {
        tracing::info!("no unflagged matches; enrichment skipped");
        return Ok(EnrichmentOutcome::default());
    }

    let history = links::list_historical_scores(pool).await?;
    let article_history = links::list_article_score_history(pool).await?;

    let thresholds = calibrate(&history);
    let classification = classify(&unflagged, &thresholds, &article_history, &settings.enrichment);

    if let Some(bar) = classification.global_threshold {
        tracing::info!(global_threshold = bar, "global highlight bar calibrated");
    }

    let summary = links::apply_enrichment(pool, &classification.updates).await?;

    let outcome = EnrichmentOutcome {
        links_flagged: classification.updates.link_flags.len(),
        anchor_highlights: classification.anchor_highlights,
        org_highlights: classification.org_highlights,
        articles_stamped: classification.updates.article_flags.len(),
        global_threshold: classification.global_threshold,
    };

    tracing::info!(
        links = outcome.links_flagged,
        anchor_highlights = outcome.anchor_highlights,
        org_highlights = outcome.org_highlights,
        links_updated = summary.links_updated,
        articles_updated = summary.articles_updated,
        "enrichment pass committed"
    );
    Ok(outcome)
}

/// Select digest content from the trailing candidate window.
///
/// Read-only: marking articles delivered is the caller's responsibility,
/// after the selection has actually been used.
///
/// # Errors
///
/// Returns [`EngineError`] on database failure.
pub async fn run_digest_pass(
    pool: &PgPool,
    settings: &EngineSettings,
) -> Result<DigestSelection, EngineError> {
    let rows = articles::list_digest_candidates(
        pool,
        settings.digest.lookback_hours,
        settings.digest.min_score,
    )
    .await?;

    let candidates: Vec<CandidateRow> = rows.into_iter().map(Into::into).collect();
    let selection = select_digest(&candidates, &settings.digest);

    tracing::info!(
        candidates = candidates.len(),
        placed = selection.item_count(),
        "digest selection finished"
    );
    Ok(selection)
}

/// Run scoring, enrichment, and digest selection as one tracked pipeline
/// invocation.
///
/// Each pass is retried on transient connectivity failures with the
/// configured fixed backoff; a pass that still fails marks the run `failed`
/// and aborts without partial persistence beyond already-committed batches.
///
/// # Errors
///
/// Returns [`EngineError`] when any pass exhausts its retries or fails on a
/// non-retriable error.
pub async fn run_full_pipeline(
    pool: &PgPool,
    store: &VectorStoreClient,
    config: &AppConfig,
    settings: &EngineSettings,
    trigger_source: &str,
) -> Result<PipelineSummary, EngineError> {
    let run = pipeline_runs::create_pipeline_run(pool, trigger_source).await?;
    pipeline_runs::start_pipeline_run(pool, run.id).await?;
    tracing::info!(run_id = run.id, trigger_source, "pipeline run started");

    let retries = config.max_retries;
    let backoff = config.retry_backoff_secs;

    let passes = async {
        let scoring = retry_pass(retries, backoff, || {
            run_scoring_pass(pool, store, settings, config.scoring_batch_size, None)
        })
        .await?;

        let enrichment =
            retry_pass(retries, backoff, || run_enrichment_pass(pool, settings)).await?;

        let selection = retry_pass(retries, backoff, || run_digest_pass(pool, settings)).await?;

        Ok::<_, EngineError>((scoring, enrichment, selection))
    };

    match passes.await {
        Ok((scoring, enrichment, selection)) => {
            let counters = RunCounters {
                articles_scored: i32::try_from(scoring.articles_scored).unwrap_or(i32::MAX),
                links_created: i32::try_from(scoring.links_created).unwrap_or(i32::MAX),
                highlights_found: i32::try_from(enrichment.org_highlights).unwrap_or(i32::MAX),
            };
            pipeline_runs::complete_pipeline_run(pool, run.id, counters).await?;
            tracing::info!(run_id = run.id, "pipeline run succeeded");

            Ok(PipelineSummary {
                run_id: run.id,
                scoring,
                enrichment,
                selection,
            })
        }
        Err(err) => {
            tracing::error!(run_id = run.id, error = %err, "pipeline run failed");
            if let Err(mark_err) =
                pipeline_runs::fail_pipeline_run(pool, run.id, &err.to_string()).await
            {
                tracing::warn!(run_id = run.id, error = %mark_err, "failed to record run failure");
            }
            Err(err)
        }
    }
}
