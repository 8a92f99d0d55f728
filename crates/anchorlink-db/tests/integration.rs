//! Offline unit tests for anchorlink-db pool configuration and row types.
//! These tests do not require a live database connection.

use anchorlink_db::{
    decode_embedding, DigestCandidateRow, EnrichmentUpdates, NewLink, PipelineRunRow, PoolConfig,
    UnflaggedLinkRow,
};
use chrono::Utc;
use uuid::Uuid;

#[test]
fn pool_config_default_values() {
    let config = PoolConfig::default();
    assert_eq!(config.max_connections, 10);
    assert_eq!(config.min_connections, 1);
    assert_eq!(config.acquire_timeout_secs, 10);
}

/// Compile-time smoke test: confirm that [`PipelineRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn pipeline_run_row_has_expected_fields() {
    let row = PipelineRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        trigger_source: "cli".to_string(),
        status: "queued".to_string(),
        started_at: None,
        completed_at: None,
        articles_scored: 0_i32,
        links_created: 0_i32,
        highlights_found: 0_i32,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.trigger_source, "cli");
    assert_eq!(row.status, "queued");
    assert!(row.started_at.is_none());
    assert!(row.error_message.is_none());
}

#[test]
fn digest_candidate_row_has_expected_fields() {
    let row = DigestCandidateRow {
        article_id: 7,
        title: "Budget bill tabled".to_string(),
        link: "https://example.org/budget".to_string(),
        source_name: "Finance Canada".to_string(),
        source_category: "Government".to_string(),
        similarity_score: 0.42,
        is_org_highlight: false,
        anchor_name: "PROG: Fiscal Policy".to_string(),
    };

    assert_eq!(row.article_id, 7);
    assert!(!row.is_org_highlight);
    assert!(row.similarity_score > 0.4);
}

#[test]
fn unflagged_link_row_has_expected_fields() {
    let row = UnflaggedLinkRow {
        link_id: 3,
        article_id: 7,
        anchor_name: "AI Regulation".to_string(),
        source_category: "News Media".to_string(),
        similarity_score: -0.12,
    };

    assert_eq!(row.link_id, 3);
    assert_eq!(row.source_category, "News Media");
}

#[test]
fn enrichment_updates_default_is_empty() {
    let updates = EnrichmentUpdates::default();
    assert!(updates.link_flags.is_empty());
    assert!(updates.article_flags.is_empty());
}

#[test]
fn new_link_carries_score() {
    let link = NewLink {
        article_id: 1,
        anchor_id: 2,
        score: 0.31,
    };
    assert_eq!(link.article_id, 1);
    assert_eq!(link.anchor_id, 2);
    assert!((link.score - 0.31).abs() < f64::EPSILON);
}

#[test]
fn decode_embedding_matches_source_bytes() {
    let values = [1.0_f32, 0.0, -0.5];
    let blob: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    assert_eq!(decode_embedding(&blob), Some(values.to_vec()));
    assert_eq!(decode_embedding(&blob[..5]), None);
}
