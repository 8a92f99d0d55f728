//! Category-tiered threshold calibration.
//!
//! Thresholds are a pure projection of the full historical score population:
//! recomputed before every classification pass, never persisted. Each
//! source-trust tier applies its own rule to the per-(anchor, category)
//! statistics — a fixed bar for high-trust sources, the historical mean for
//! government sources, mean + one standard deviation for noisy media.

use std::collections::HashMap;

use anchorlink_core::EnrichmentSettings;
use anchorlink_db::HistoricalScoreRow;

/// Absolute-score statistics for one (anchor, source category) pair.
#[derive(Debug, Clone, Copy)]
pub struct ScoreStats {
    pub mean: f64,
    /// Sample standard deviation; `0.0` when fewer than two observations.
    pub std_dev: f64,
    pub count: usize,
}

/// Per-(anchor, source category) decision thresholds derived from history.
#[derive(Debug, Default)]
pub struct ThresholdMap {
    stats: HashMap<(String, String), ScoreStats>,
}

/// Build the threshold map from the full historical population.
///
/// Scores enter as signed values; all statistics are over absolute scores.
#[must_use]
pub fn calibrate(history: &[HistoricalScoreRow]) -> ThresholdMap {
    let mut grouped: HashMap<(String, String), Vec<f64>> = HashMap::new();
    for row in history {
        grouped
            .entry((row.anchor_name.clone(), row.source_category.clone()))
            .or_default()
            .push(row.similarity_score.abs());
    }

    let stats = grouped
        .into_iter()
        .map(|(key, scores)| (key, compute_stats(&scores)))
        .collect();

    ThresholdMap { stats }
}

#[allow(clippy::cast_precision_loss)]
fn compute_stats(scores: &[f64]) -> ScoreStats {
    let count = scores.len();
    let mean = scores.iter().sum::<f64>() / count as f64;

    let std_dev = if count < 2 {
        0.0
    } else {
        let variance =
            scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    };

    ScoreStats {
        mean,
        std_dev,
        count,
    }
}

impl ThresholdMap {
    /// The statistics for one (anchor, category) pair, if any history exists.
    #[must_use]
    pub fn stats(&self, anchor_name: &str, source_category: &str) -> Option<&ScoreStats> {
        self.stats
            .get(&(anchor_name.to_string(), source_category.to_string()))
    }

    /// Resolve the decision threshold for a match.
    ///
    /// Returns `None` when the source category belongs to no configured
    /// tier (such matches are never highlighted). A tiered category with no
    /// history yields `f64::INFINITY` — unsatisfiable until history
    /// accumulates.
    #[must_use]
    pub fn threshold(
        &self,
        anchor_name: &str,
        source_category: &str,
        settings: &EnrichmentSettings,
    ) -> Option<f64> {
        let in_tier =
            |categories: &[String]| categories.iter().any(|c| c == source_category);

        if in_tier(&settings.tier1_categories) {
            return Some(settings.tier1_threshold);
        }

        if in_tier(&settings.tier2_categories) {
            return Some(
                self.stats(anchor_name, source_category)
                    .map_or(f64::INFINITY, |s| s.mean),
            );
        }

        if in_tier(&settings.tier3_categories) {
            return Some(
                self.stats(anchor_name, source_category)
                    .map_or(f64::INFINITY, |s| s.mean + s.std_dev),
            );
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> EnrichmentSettings {
        EnrichmentSettings {
            tier1_categories: vec!["Think Tank".to_string()],
            tier1_threshold: 0.20,
            tier2_categories: vec!["Government".to_string()],
            tier3_categories: vec!["News Media".to_string()],
            global_percentile: 0.90,
        }
    }

    fn row(anchor: &str, category: &str, score: f64) -> HistoricalScoreRow {
        HistoricalScoreRow {
            anchor_name: anchor.to_string(),
            source_category: category.to_string(),
            similarity_score: score,
        }
    }

    #[test]
    fn tier1_uses_fixed_threshold_regardless_of_history() {
        let map = calibrate(&[row("A", "Think Tank", 0.9), row("A", "Think Tank", 0.8)]);
        assert_eq!(map.threshold("A", "Think Tank", &settings()), Some(0.20));
        // Even with no history at all.
        let empty = calibrate(&[]);
        assert_eq!(empty.threshold("A", "Think Tank", &settings()), Some(0.20));
    }

    #[test]
    fn tier2_uses_historical_mean() {
        let map = calibrate(&[
            row("A", "Government", 0.10),
            row("A", "Government", 0.30),
        ]);
        let threshold = map.threshold("A", "Government", &settings()).unwrap();
        assert!((threshold - 0.20).abs() < 1e-12, "got {threshold}");
    }

    #[test]
    fn tier3_uses_mean_plus_std() {
        // Mean 0.10, sample std 0.05 -> threshold 0.15.
        let map = calibrate(&[
            row("A", "News Media", 0.05),
            row("A", "News Media", 0.10),
            row("A", "News Media", 0.15),
        ]);
        let stats = map.stats("A", "News Media").unwrap();
        assert!((stats.mean - 0.10).abs() < 1e-12);
        assert!((stats.std_dev - 0.05).abs() < 1e-12);
        let threshold = map.threshold("A", "News Media", &settings()).unwrap();
        assert!((threshold - 0.15).abs() < 1e-12, "got {threshold}");
    }

    #[test]
    fn statistics_use_absolute_scores() {
        let map = calibrate(&[
            row("A", "Government", -0.10),
            row("A", "Government", 0.30),
        ]);
        let stats = map.stats("A", "Government").unwrap();
        assert!((stats.mean - 0.20).abs() < 1e-12, "got {}", stats.mean);
    }

    #[test]
    fn single_observation_has_zero_std() {
        let map = calibrate(&[row("A", "News Media", 0.12)]);
        let stats = map.stats("A", "News Media").unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.std_dev, 0.0);
        // mean + 0 std: the single observation is its own bar.
        assert_eq!(
            map.threshold("A", "News Media", &settings()),
            Some(0.12)
        );
    }

    #[test]
    fn missing_history_yields_unsatisfiable_threshold() {
        let map = calibrate(&[]);
        assert_eq!(
            map.threshold("A", "Government", &settings()),
            Some(f64::INFINITY)
        );
        assert_eq!(
            map.threshold("A", "News Media", &settings()),
            Some(f64::INFINITY)
        );
    }

    #[test]
    fn history_is_scoped_to_the_anchor() {
        // Anchor B's government history must not feed anchor A's bar.
        let map = calibrate(&[row("B", "Government", 0.50)]);
        assert_eq!(
            map.threshold("A", "Government", &settings()),
            Some(f64::INFINITY)
        );
    }

    #[test]
    fn untier_category_has_no_rule() {
        let map = calibrate(&[row("A", "Podcast", 0.50)]);
        assert_eq!(map.threshold("A", "Podcast", &settings()), None);
    }

    #[test]
    fn raising_the_mean_never_lowers_tier2_threshold() {
        let low = calibrate(&[
            row("A", "Government", 0.10),
            row("A", "Government", 0.20),
        ]);
        let high = calibrate(&[
            row("A", "Government", 0.30),
            row("A", "Government", 0.40),
        ]);
        let t_low = low.threshold("A", "Government", &settings()).unwrap();
        let t_high = high.threshold("A", "Government", &settings()).unwrap();
        assert!(t_high >= t_low, "threshold dropped: {t_low} -> {t_high}");
    }

    #[test]
    fn raising_the_mean_never_lowers_tier3_threshold() {
        // Same spread, shifted up: mean rises, std unchanged.
        let low = calibrate(&[
            row("A", "News Media", 0.10),
            row("A", "News Media", 0.20),
        ]);
        let high = calibrate(&[
            row("A", "News Media", 0.30),
            row("A", "News Media", 0.40),
        ]);
        let t_low = low.threshold("A", "News Media", &settings()).unwrap();
        let t_high = high.threshold("A", "News Media", &settings()).unwrap();
        assert!(t_high >= t_low, "threshold dropped: {t_low} -> {t_high}");
    }
}
