//! Digest selection: aggregate, scope-filter, and greedily pack candidate
//! articles into named sections.
//!
//! Pure over (candidate rows, digest settings). The caller persists nothing
//! here; marking articles delivered happens only after the output is used.

use std::collections::{BTreeMap, HashSet};

use anchorlink_core::DigestSettings;

use crate::types::{CandidateRow, DigestArticle, DigestSelection, SectionPicks};

/// Select the digest content from the windowed candidate pool.
///
/// The priority section (if configured) is packed first from
/// global-highlighted articles; remaining sections follow in declaration
/// order, drawing on their mapped source categories. An article id is
/// claimed by the first section that takes it and never appears again.
#[must_use]
pub fn select_digest(rows: &[CandidateRow], digest: &DigestSettings) -> DigestSelection {
    let articles = scope_filter(aggregate(rows), digest);

    let mut claimed: HashSet<i64> = HashSet::new();
    let mut sections = Vec::with_capacity(digest.sections.len());

    // Priority section first, regardless of where it is declared.
    for section in digest.sections.iter().filter(|s| s.priority) {
        let candidates: Vec<&DigestArticle> =
            articles.iter().filter(|a| a.is_highlight).collect();
        sections.push(SectionPicks {
            name: section.name.clone(),
            articles: pick_top_n(candidates, digest.items_per_section, &mut claimed),
        });
    }

    for section in digest.sections.iter().filter(|s| !s.priority) {
        let candidates: Vec<&DigestArticle> = articles
            .iter()
            .filter(|a| section.categories.contains(&a.source_category))
            .collect();
        sections.push(SectionPicks {
            name: section.name.clone(),
            articles: pick_top_n(candidates, digest.items_per_section, &mut claimed),
        });
    }

    DigestSelection { sections }
}

/// Collapse (article, anchor) rows into one candidate per article carrying
/// its best score and the list of matching anchor names.
fn aggregate(rows: &[CandidateRow]) -> Vec<DigestArticle> {
    let mut by_article: BTreeMap<i64, DigestArticle> = BTreeMap::new();

    for row in rows {
        let entry = by_article
            .entry(row.article_id)
            .or_insert_with(|| DigestArticle {
                id: row.article_id,
                title: row.title.clone(),
                url: row.url.clone(),
                source_name: row.source_name.clone(),
                source_category: row.source_category.clone(),
                score: row.score,
                is_highlight: row.is_org_highlight,
                anchors: Vec::new(),
            });

        if !entry.anchors.contains(&row.anchor_name) {
            entry.anchors.push(row.anchor_name.clone());
        }
        if row.score > entry.score {
            entry.score = row.score;
        }
        entry.is_highlight |= row.is_org_highlight;
    }

    by_article.into_values().collect()
}

/// Apply the anchor scope filter.
///
/// Global highlights always pass — the priority override. Everything else
/// needs at least one anchor matching an allowed exact name or an allowed
/// type prefix followed by `:` (case-insensitive). No configured filters
/// means everything passes.
fn scope_filter(articles: Vec<DigestArticle>, digest: &DigestSettings) -> Vec<DigestArticle> {
    let names = digest.allowed_anchors.as_deref().unwrap_or(&[]);
    let types = digest.allowed_anchor_types.as_deref().unwrap_or(&[]);
    if names.is_empty() && types.is_empty() {
        return articles;
    }

    let total = articles.len();
    let kept: Vec<DigestArticle> = articles
        .into_iter()
        .filter(|article| {
            if article.is_highlight {
                return true;
            }

            let name_match = article.anchors.iter().any(|a| names.contains(a));
            let type_match = article.anchors.iter().any(|anchor| {
                let upper = anchor.to_uppercase();
                types
                    .iter()
                    .any(|t| upper.starts_with(&format!("{}:", t.to_uppercase())))
            });

            name_match || type_match
        })
        .collect();

    tracing::info!(kept = kept.len(), total, "scope filter applied");
    kept
}

/// Take up to `limit` unclaimed candidates, best first.
///
/// Ordering is `(is_highlight, score)` descending; claimed ids are skipped
/// so no article appears in two sections.
fn pick_top_n(
    mut candidates: Vec<&DigestArticle>,
    limit: usize,
    claimed: &mut HashSet<i64>,
) -> Vec<DigestArticle> {
    candidates.sort_by(|a, b| {
        b.is_highlight
            .cmp(&a.is_highlight)
            .then(b.score.total_cmp(&a.score))
    });

    let mut picks = Vec::new();
    for article in candidates {
        if picks.len() >= limit {
            break;
        }
        if claimed.insert(article.id) {
            picks.push(article.clone());
        }
    }
    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchorlink_core::SectionSettings;

    fn digest_settings() -> DigestSettings {
        DigestSettings {
            lookback_hours: 60,
            min_score: 0.40,
            items_per_section: 2,
            allowed_anchors: None,
            allowed_anchor_types: None,
            sections: vec![
                SectionSettings {
                    name: "Priority Highlights".to_string(),
                    categories: vec![],
                    priority: true,
                },
                SectionSettings {
                    name: "Governments".to_string(),
                    categories: vec!["Government".to_string()],
                    priority: false,
                },
                SectionSettings {
                    name: "Media".to_string(),
                    categories: vec!["News Media".to_string()],
                    priority: false,
                },
            ],
        }
    }

    fn row(
        article_id: i64,
        category: &str,
        score: f64,
        highlight: bool,
        anchor: &str,
    ) -> CandidateRow {
        CandidateRow {
            article_id,
            title: format!("article {article_id}"),
            url: format!("https://example.org/{article_id}"),
            source_name: "Example Source".to_string(),
            source_category: category.to_string(),
            score,
            is_org_highlight: highlight,
            anchor_name: anchor.to_string(),
        }
    }

    #[test]
    fn aggregates_multi_anchor_articles_into_one_candidate() {
        let rows = vec![
            row(1, "Government", 0.5, false, "PROG: Trade"),
            row(1, "Government", 0.8, false, "AI Regulation"),
            row(1, "Government", 0.8, false, "AI Regulation"),
        ];
        let selection = select_digest(&rows, &digest_settings());
        let govs = &selection.sections[1];
        assert_eq!(govs.articles.len(), 1);
        let article = &govs.articles[0];
        assert!((article.score - 0.8).abs() < 1e-12, "best score wins");
        assert_eq!(article.anchors, vec!["PROG: Trade", "AI Regulation"]);
    }

    #[test]
    fn no_article_appears_in_two_sections() {
        // A highlighted government article qualifies for both the priority
        // section and Governments; the priority section claims it first.
        let rows = vec![
            row(1, "Government", 0.9, true, "PROG: Trade"),
            row(2, "Government", 0.5, false, "PROG: Trade"),
        ];
        let selection = select_digest(&rows, &digest_settings());
        assert_eq!(selection.sections[0].articles[0].id, 1);
        let gov_ids: Vec<i64> = selection.sections[1].articles.iter().map(|a| a.id).collect();
        assert_eq!(gov_ids, vec![2]);

        let all_ids = selection.article_ids();
        let unique: HashSet<i64> = all_ids.iter().copied().collect();
        assert_eq!(all_ids.len(), unique.len(), "duplicate placement found");
    }

    #[test]
    fn capacity_bounds_each_section() {
        let rows = vec![
            row(1, "News Media", 0.9, false, "PROG: Trade"),
            row(2, "News Media", 0.8, false, "PROG: Trade"),
            row(3, "News Media", 0.7, false, "PROG: Trade"),
        ];
        let selection = select_digest(&rows, &digest_settings());
        let media = &selection.sections[2];
        assert_eq!(media.articles.len(), 2);
        assert_eq!(media.articles[0].id, 1);
        assert_eq!(media.articles[1].id, 2);
    }

    #[test]
    fn highlights_sort_before_higher_scores() {
        let rows = vec![
            row(1, "Government", 0.9, false, "PROG: Trade"),
            row(2, "Government", 0.3, true, "PROG: Trade"),
        ];
        let mut settings = digest_settings();
        settings.items_per_section = 1;
        // Remove the priority section so both compete in Governments.
        settings.sections.remove(0);
        let selection = select_digest(&rows, &settings);
        assert_eq!(selection.sections[0].articles[0].id, 2);
    }

    #[test]
    fn scope_filter_by_exact_anchor_name() {
        let rows = vec![
            row(1, "Government", 0.9, false, "AI Regulation"),
            row(2, "Government", 0.8, false, "Health Policy"),
        ];
        let mut settings = digest_settings();
        settings.allowed_anchors = Some(vec!["AI Regulation".to_string()]);
        let selection = select_digest(&rows, &settings);
        let gov_ids: Vec<i64> = selection.sections[1].articles.iter().map(|a| a.id).collect();
        assert_eq!(gov_ids, vec![1]);
    }

    #[test]
    fn scope_filter_by_type_prefix_is_case_insensitive() {
        let rows = vec![
            row(1, "Government", 0.9, false, "prog: Trade Policy"),
            row(2, "Government", 0.8, false, "TAG: Trade"),
        ];
        let mut settings = digest_settings();
        settings.allowed_anchor_types = Some(vec!["PROG".to_string()]);
        let selection = select_digest(&rows, &settings);
        let gov_ids: Vec<i64> = selection.sections[1].articles.iter().map(|a| a.id).collect();
        assert_eq!(gov_ids, vec![1]);
    }

    #[test]
    fn prefix_requires_the_separator() {
        // "PROGRAM..." must not satisfy the "PROG" type filter.
        let rows = vec![row(1, "Government", 0.9, false, "PROGRAM Trade")];
        let mut settings = digest_settings();
        settings.allowed_anchor_types = Some(vec!["PROG".to_string()]);
        let selection = select_digest(&rows, &settings);
        assert!(selection.sections[1].articles.is_empty());
    }

    #[test]
    fn global_highlight_overrides_scope_filter() {
        let rows = vec![row(1, "Government", 0.9, true, "Unrelated Anchor")];
        let mut settings = digest_settings();
        settings.allowed_anchor_types = Some(vec!["PROG".to_string()]);
        let selection = select_digest(&rows, &settings);
        assert_eq!(selection.sections[0].articles[0].id, 1);
    }

    #[test]
    fn empty_sections_are_present_and_empty() {
        let rows = vec![row(1, "Government", 0.9, false, "PROG: Trade")];
        let selection = select_digest(&rows, &digest_settings());
        assert_eq!(selection.sections.len(), 3);
        assert!(selection.sections[0].articles.is_empty());
        assert!(selection.sections[2].articles.is_empty());
        assert_eq!(selection.item_count(), 1);
    }

    #[test]
    fn empty_pool_yields_empty_sections() {
        let selection = select_digest(&[], &digest_settings());
        assert_eq!(selection.item_count(), 0);
        assert_eq!(selection.sections.len(), 3);
    }

    #[test]
    fn unmapped_category_is_never_placed() {
        let rows = vec![row(1, "Podcast", 0.9, false, "PROG: Trade")];
        let selection = select_digest(&rows, &digest_settings());
        assert_eq!(selection.item_count(), 0);
    }
}
