//! Embedding aggregation: resolving anchors and articles to vector sets.
//!
//! An anchor's identity fans out through its components — tags resolve
//! against the relational tags table, knowledge-base items and program
//! charters against the vector store. Resolution is best-effort: a missing
//! component is warned and dropped, and only an anchor with zero resolved
//! vectors is excluded from the pass.

use std::collections::HashMap;

use sqlx::PgPool;

use anchorlink_core::ComponentKind;
use anchorlink_db::{anchors, knowledge};

use crate::error::EngineError;
use crate::types::AnchorVectors;
use crate::vector_store::VectorStoreClient;

/// Load every active anchor that resolves to at least one vector.
///
/// # Errors
///
/// Returns [`EngineError`] only on store/database failure; resolution gaps
/// are handled locally by exclusion.
pub async fn load_anchor_vectors(
    pool: &PgPool,
    store: &VectorStoreClient,
) -> Result<Vec<AnchorVectors>, EngineError> {
    let anchor_rows = anchors::list_active_anchors(pool).await?;
    let component_rows = anchors::list_anchor_components(pool).await?;
    let tag_embeddings = knowledge::list_tag_embeddings(pool).await?;
    let program_charters = knowledge::list_program_charters(pool).await?;

    let mut components_by_anchor: HashMap<i64, Vec<(String, String)>> = HashMap::new();
    for row in component_rows {
        components_by_anchor
            .entry(row.anchor_id)
            .or_default()
            .push((row.component_type, row.component_ref));
    }

    let mut resolved = Vec::with_capacity(anchor_rows.len());
    for anchor in anchor_rows {
        let Some(components) = components_by_anchor.get(&anchor.id) else {
            tracing::warn!(anchor = %anchor.name, "anchor has no components, excluded from scoring");
            continue;
        };

        let mut vectors: Vec<Vec<f32>> = Vec::new();
        for (component_type, component_ref) in components {
            let Some(kind) = ComponentKind::parse(component_type) else {
                tracing::warn!(
                    anchor = %anchor.name,
                    component_type,
                    "unknown component type, dropped"
                );
                continue;
            };

            match kind {
                ComponentKind::Tag => match tag_embeddings.get(component_ref) {
                    Some(vector) => vectors.push(vector.clone()),
                    None => {
                        tracing::warn!(
                            anchor = %anchor.name,
                            tag = %component_ref,
                            "tag embedding not found, component dropped"
                        );
                    }
                },
                ComponentKind::KbItem => {
                    let chunks = store.location_vectors(component_ref).await?;
                    if chunks.is_empty() {
                        tracing::warn!(
                            anchor = %anchor.name,
                            location = %component_ref,
                            "no vectors at knowledge-base location, component dropped"
                        );
                    }
                    vectors.extend(chunks);
                }
                ComponentKind::Program => match program_charters.get(component_ref) {
                    Some(location) => {
                        let chunks = store.location_vectors(location).await?;
                        if chunks.is_empty() {
                            tracing::warn!(
                                anchor = %anchor.name,
                                program = %component_ref,
                                "no vectors for program charter, component dropped"
                            );
                        }
                        vectors.extend(chunks);
                    }
                    None => {
                        tracing::warn!(
                            anchor = %anchor.name,
                            program = %component_ref,
                            "program has no charter row, component dropped"
                        );
                    }
                },
            }
        }

        if vectors.is_empty() {
            tracing::warn!(
                anchor = %anchor.name,
                "no component resolved to a vector, anchor excluded from this pass"
            );
            continue;
        }

        resolved.push(AnchorVectors {
            anchor_id: anchor.id,
            name: anchor.name,
            vectors,
        });
    }

    tracing::info!(anchors = resolved.len(), "loaded anchor vector sets");
    Ok(resolved)
}

/// Fetch chunk vectors for a batch of articles, keyed by article id.
///
/// Articles with no chunks map to an empty set; the scorer treats that as
/// score zero.
///
/// # Errors
///
/// Returns [`EngineError`] on store failure.
pub async fn load_article_vectors(
    store: &VectorStoreClient,
    article_ids: &[i64],
) -> Result<HashMap<i64, Vec<Vec<f32>>>, EngineError> {
    let mut by_article = HashMap::with_capacity(article_ids.len());
    for &article_id in article_ids {
        let chunks = store.article_vectors(article_id).await?;
        if chunks.is_empty() {
            tracing::debug!(article_id, "article has no chunk vectors");
        }
        by_article.insert(article_id, chunks);
    }
    Ok(by_article)
}
