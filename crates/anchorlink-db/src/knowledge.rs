//! Database operations for `tags` and `knowledge_base`.
//!
//! Tag embeddings are stored inline as little-endian f32 byte blobs; the
//! knowledge base holds pointers (`source_location`) into the vector store,
//! including the program-charter rows that back `program` components.

use std::collections::HashMap;

use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct TagRow {
    name: String,
    embedding: Vec<u8>,
}

/// Decode a little-endian f32 byte blob into a vector.
///
/// Returns `None` if the blob length is not a multiple of four, so callers
/// can drop the malformed row with a warning instead of failing the pass.
#[must_use]
pub fn decode_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.is_empty() || blob.len() % 4 != 0 {
        return None;
    }
    Some(bytemuck::pod_collect_to_vec::<u8, f32>(blob))
}

/// Returns every tag embedding, keyed by tag name.
///
/// Tags with malformed embedding blobs are omitted; the caller treats an
/// absent tag as an unresolvable component.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tag_embeddings(pool: &PgPool) -> Result<HashMap<String, Vec<f32>>, DbError> {
    let rows = sqlx::query_as::<_, TagRow>("SELECT name, embedding FROM tags")
        .fetch_all(pool)
        .await?;

    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        if let Some(vector) = decode_embedding(&row.embedding) {
            map.insert(row.name, vector);
        }
    }

    Ok(map)
}

/// Returns the charter `source_location` for every program, keyed by
/// program tag.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_program_charters(pool: &PgPool) -> Result<HashMap<String, String>, DbError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT program_tag, source_location \
         FROM knowledge_base \
         WHERE source_type = 'program_charter' AND program_tag IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_embedding_round_trips_f32_values() {
        let values = [0.25_f32, -1.5, 3.0];
        let blob: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let decoded = decode_embedding(&blob).expect("valid blob must decode");
        assert_eq!(decoded, values);
    }

    #[test]
    fn decode_embedding_rejects_truncated_blob() {
        assert!(decode_embedding(&[0x00, 0x01, 0x02]).is_none());
    }

    #[test]
    fn decode_embedding_rejects_empty_blob() {
        assert!(decode_embedding(&[]).is_none());
    }
}
