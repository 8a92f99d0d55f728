//! Matching, adaptive enrichment, and selection engine.
//!
//! Scores article chunk embeddings against semantic anchor vectors with
//! top-K pooled cosine similarity, classifies matches with per-(anchor,
//! source category) adaptive thresholds calibrated from the full match
//! history, and packs a bounded, de-duplicated digest across named
//! sections. Postgres holds flags and history; a Qdrant collection holds
//! chunk embeddings and is read-only from here.

pub mod aggregator;
pub mod calibrate;
pub mod classify;
pub mod error;
pub mod pipeline;
pub mod select;
pub mod similarity;
pub mod types;
pub mod vector_store;

mod retry;

pub use error::EngineError;
pub use pipeline::{
    run_digest_pass, run_enrichment_pass, run_full_pipeline, run_scoring_pass, PipelineSummary,
};
pub use select::select_digest;
pub use similarity::top_k_pooled_score;
pub use types::{
    AnchorVectors, CandidateRow, DigestArticle, DigestSelection, EnrichmentOutcome,
    ScoringOutcome, SectionPicks,
};
pub use vector_store::VectorStoreClient;
