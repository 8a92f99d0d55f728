use serde::Serialize;

/// An active anchor with every vector its components resolved to.
///
/// Anchors whose components resolved to nothing are excluded upstream; a
/// value of this type always carries at least one vector.
#[derive(Debug, Clone)]
pub struct AnchorVectors {
    pub anchor_id: i64,
    pub name: String,
    pub vectors: Vec<Vec<f32>>,
}

/// One digest candidate row: an (article, anchor) match with the context
/// selection needs. An article matching several anchors appears once per
/// anchor; [`crate::select::select_digest`] aggregates.
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub article_id: i64,
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub source_category: String,
    pub score: f64,
    pub is_org_highlight: bool,
    pub anchor_name: String,
}

impl From<anchorlink_db::DigestCandidateRow> for CandidateRow {
    fn from(row: anchorlink_db::DigestCandidateRow) -> Self {
        Self {
            article_id: row.article_id,
            title: row.title,
            url: row.link,
            source_name: row.source_name,
            source_category: row.source_category,
            score: row.similarity_score,
            is_org_highlight: row.is_org_highlight,
            anchor_name: row.anchor_name,
        }
    }
}

/// One article aggregated across its matches, as placed into a section.
#[derive(Debug, Clone, Serialize)]
pub struct DigestArticle {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub source_category: String,
    /// Best score across the article's matches.
    pub score: f64,
    pub is_highlight: bool,
    pub anchors: Vec<String>,
}

/// One named section with its ordered, capacity-bounded picks.
#[derive(Debug, Clone, Serialize)]
pub struct SectionPicks {
    pub name: String,
    pub articles: Vec<DigestArticle>,
}

/// The digest output: sections in presentation order, article ids globally
/// de-duplicated.
#[derive(Debug, Clone, Serialize)]
pub struct DigestSelection {
    pub sections: Vec<SectionPicks>,
}

impl DigestSelection {
    /// Total number of placed articles across all sections.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.articles.len()).sum()
    }

    /// Every placed article id, in section order.
    #[must_use]
    pub fn article_ids(&self) -> Vec<i64> {
        self.sections
            .iter()
            .flat_map(|s| s.articles.iter().map(|a| a.id))
            .collect()
    }
}

/// Counters from one scoring pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringOutcome {
    pub articles_scored: usize,
    pub links_created: u64,
    pub links_floored: usize,
}

/// Counters from one enrichment pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichmentOutcome {
    pub links_flagged: usize,
    pub anchor_highlights: usize,
    pub org_highlights: usize,
    pub articles_stamped: usize,
    /// The population-wide bar the pass used, if one could be computed.
    pub global_threshold: Option<f64>,
}
