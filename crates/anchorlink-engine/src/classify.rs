//! Enrichment classification: anchor-level highlight flags and the
//! population-wide global relevance signal.
//!
//! Decisions are pure functions of (unflagged matches, threshold map,
//! full score history, settings); persistence happens separately in one
//! transaction. Only unflagged matches are ever decided, so a rerun over
//! unchanged history flips nothing.

use std::collections::{BTreeSet, HashMap};

use anchorlink_core::EnrichmentSettings;
use anchorlink_db::{EnrichmentUpdates, UnflaggedLinkRow};

use crate::calibrate::ThresholdMap;

/// The decisions of one classification pass, ready to persist.
#[derive(Debug, Default)]
pub struct Classification {
    pub updates: EnrichmentUpdates,
    pub anchor_highlights: usize,
    pub org_highlights: usize,
    /// The percentile bar for global highlights, when the population allowed
    /// one to be computed.
    pub global_threshold: Option<f64>,
}

/// Classify every unflagged match and compute per-article global flags.
///
/// `article_history` is the full (article id, score) population across all
/// matches — the global signal is relative to every article ever matched,
/// not just the batch being classified. An article whose best absolute
/// score strictly exceeds the configured percentile of per-article bests
/// becomes a global highlight.
#[must_use]
pub fn classify(
    unflagged: &[UnflaggedLinkRow],
    thresholds: &ThresholdMap,
    article_history: &[(i64, f64)],
    settings: &EnrichmentSettings,
) -> Classification {
    let mut result = Classification::default();

    // Anchor-level flags: strict comparison of the absolute score against
    // the tier rule; no rule means never highlighted.
    for link in unflagged {
        let decision = thresholds
            .threshold(&link.anchor_name, &link.source_category, settings)
            .is_some_and(|threshold| link.similarity_score.abs() > threshold);
        if decision {
            result.anchor_highlights += 1;
        }
        result.updates.link_flags.push((link.link_id, decision));
    }

    // Per-article best absolute score over the full history.
    let mut best_by_article: HashMap<i64, f64> = HashMap::new();
    for &(article_id, score) in article_history {
        let abs = score.abs();
        best_by_article
            .entry(article_id)
            .and_modify(|best| *best = best.max(abs))
            .or_insert(abs);
    }
    // Batch links are committed before classification, but merging them in
    // keeps the function total even on an inconsistent snapshot.
    for link in unflagged {
        let abs = link.similarity_score.abs();
        best_by_article
            .entry(link.article_id)
            .and_modify(|best| *best = best.max(abs))
            .or_insert(abs);
    }

    result.global_threshold = if best_by_article.is_empty() {
        None
    } else {
        let mut bests: Vec<f64> = best_by_article.values().copied().collect();
        bests.sort_unstable_by(f64::total_cmp);
        Some(percentile(&bests, settings.global_percentile))
    };

    let batch_articles: BTreeSet<i64> = unflagged.iter().map(|l| l.article_id).collect();
    for article_id in batch_articles {
        let flag = match result.global_threshold {
            Some(bar) => best_by_article
                .get(&article_id)
                .is_some_and(|best| *best > bar),
            None => false,
        };
        if flag {
            result.org_highlights += 1;
        }
        result.updates.article_flags.push((article_id, flag));
    }

    result
}

/// Linear-interpolation percentile over an ascending-sorted slice.
///
/// `q` in [0, 1]. Matches the interpolation the historical data was
/// calibrated with, so thresholds stay comparable across reruns.
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }

    #[allow(clippy::cast_precision_loss)]
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lower = position.floor() as usize;
    let fraction = position - position.floor();

    if lower + 1 >= sorted.len() {
        return sorted[sorted.len() - 1];
    }
    sorted[lower] + fraction * (sorted[lower + 1] - sorted[lower])
}
