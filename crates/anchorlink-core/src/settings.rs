use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Scoring-pass knobs.
///
/// `top_k` is invariant across anchors and articles within one run; changing
/// it requires re-scoring the full history so calibrated thresholds stay
/// comparable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Links below this floor are not persisted for the categories listed in
    /// `floor_categories`. Empty list disables the floor entirely.
    #[serde(default)]
    pub floor: f64,
    #[serde(default)]
    pub floor_categories: Vec<String>,
}

fn default_top_k() -> usize {
    5
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            floor: 0.0,
            floor_categories: Vec::new(),
        }
    }
}

/// Source-trust tiers and the statistical rule parameters for each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSettings {
    /// High-trust categories judged against the fixed `tier1_threshold`.
    pub tier1_categories: Vec<String>,
    pub tier1_threshold: f64,
    /// Moderate-trust categories judged against the historical mean for the
    /// specific (anchor, category) pair.
    pub tier2_categories: Vec<String>,
    /// Noisy categories judged against mean + one standard deviation.
    pub tier3_categories: Vec<String>,
    /// Percentile of per-article best scores above which an article is a
    /// global (organization-wide) highlight. Computed over all-time history.
    #[serde(default = "default_global_percentile")]
    pub global_percentile: f64,
}

fn default_global_percentile() -> f64 {
    0.90
}

/// One named digest section. A `priority` section ignores `categories` and
/// draws from global-highlighted articles instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSettings {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub priority: bool,
}

/// Digest window, scope filter, and section layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestSettings {
    pub lookback_hours: i64,
    pub min_score: f64,
    pub items_per_section: usize,
    /// Exact anchor names allowed through the scope filter. `None` disables
    /// the name check.
    #[serde(default)]
    pub allowed_anchors: Option<Vec<String>>,
    /// Anchor name prefixes (matched case-insensitively, followed by `:`)
    /// allowed through the scope filter. `None` disables the type check.
    #[serde(default)]
    pub allowed_anchor_types: Option<Vec<String>>,
    pub sections: Vec<SectionSettings>,
}

/// The full engine settings file.
///
/// Loaded once at startup and passed by reference into every component call,
/// so calibration, classification, and selection stay pure functions of
/// (data, settings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub scoring: ScoringSettings,
    pub enrichment: EnrichmentSettings,
    pub digest: DigestSettings,
}

/// Load and validate engine settings from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_settings(path: &Path) -> Result<EngineSettings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SettingsIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let settings: EngineSettings =
        serde_yaml::from_str(&content).map_err(ConfigError::SettingsParse)?;

    validate_settings(&settings)?;

    Ok(settings)
}

fn validate_settings(settings: &EngineSettings) -> Result<(), ConfigError> {
    if settings.scoring.top_k == 0 {
        return Err(ConfigError::Validation(
            "scoring.top_k must be at least 1".to_string(),
        ));
    }

    let e = &settings.enrichment;
    if !(e.global_percentile > 0.0 && e.global_percentile < 1.0) {
        return Err(ConfigError::Validation(format!(
            "enrichment.global_percentile must be in (0, 1), got {}",
            e.global_percentile
        )));
    }

    let mut seen_categories = HashSet::new();
    for category in e
        .tier1_categories
        .iter()
        .chain(&e.tier2_categories)
        .chain(&e.tier3_categories)
    {
        if !seen_categories.insert(category.as_str()) {
            return Err(ConfigError::Validation(format!(
                "category '{category}' appears in more than one tier"
            )));
        }
    }

    let d = &settings.digest;
    if d.items_per_section == 0 {
        return Err(ConfigError::Validation(
            "digest.items_per_section must be at least 1".to_string(),
        ));
    }
    if d.lookback_hours <= 0 {
        return Err(ConfigError::Validation(format!(
            "digest.lookback_hours must be positive, got {}",
            d.lookback_hours
        )));
    }

    let mut seen_names = HashSet::new();
    let mut priority_count = 0;
    for section in &d.sections {
        if section.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "section name must be non-empty".to_string(),
            ));
        }
        if !seen_names.insert(section.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate section name: '{}'",
                section.name
            )));
        }
        if section.priority {
            priority_count += 1;
            if !section.categories.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "priority section '{}' must not list categories",
                    section.name
                )));
            }
        }
    }
    if priority_count > 1 {
        return Err(ConfigError::Validation(
            "at most one priority section is allowed".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> EngineSettings {
        EngineSettings {
            scoring: ScoringSettings::default(),
            enrichment: EnrichmentSettings {
                tier1_categories: vec!["Think Tank".to_string(), "Academic".to_string()],
                tier1_threshold: 0.20,
                tier2_categories: vec!["Government".to_string()],
                tier3_categories: vec!["News Media".to_string()],
                global_percentile: 0.90,
            },
            digest: DigestSettings {
                lookback_hours: 60,
                min_score: 0.40,
                items_per_section: 2,
                allowed_anchors: None,
                allowed_anchor_types: Some(vec!["PROG".to_string()]),
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
                ],
            },
        }
    }

    #[test]
    fn validate_accepts_valid_settings() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn validate_rejects_zero_top_k() {
        let mut settings = valid_settings();
        settings.scoring.top_k = 0;
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn validate_rejects_out_of_range_percentile() {
        let mut settings = valid_settings();
        settings.enrichment.global_percentile = 1.0;
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("global_percentile"));
    }

    #[test]
    fn validate_rejects_category_in_two_tiers() {
        let mut settings = valid_settings();
        settings
            .enrichment
            .tier3_categories
            .push("Government".to_string());
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("more than one tier"));
    }

    #[test]
    fn validate_rejects_duplicate_section_names() {
        let mut settings = valid_settings();
        settings.digest.sections.push(SectionSettings {
            name: "Governments".to_string(),
            categories: vec!["Government".to_string()],
            priority: false,
        });
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("duplicate section name"));
    }

    #[test]
    fn validate_rejects_two_priority_sections() {
        let mut settings = valid_settings();
        settings.digest.sections.push(SectionSettings {
            name: "More Highlights".to_string(),
            categories: vec![],
            priority: true,
        });
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("at most one priority section"));
    }

    #[test]
    fn validate_rejects_priority_section_with_categories() {
        let mut settings = valid_settings();
        settings.digest.sections[0]
            .categories
            .push("Government".to_string());
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("must not list categories"));
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut settings = valid_settings();
        settings.digest.items_per_section = 0;
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("items_per_section"));
    }

    #[test]
    fn settings_yaml_round_trip() {
        let settings = valid_settings();
        let rendered = serde_yaml::to_string(&settings).unwrap();
        let parsed: EngineSettings = serde_yaml::from_str(&rendered).unwrap();
        assert!(validate_settings(&parsed).is_ok());
        assert_eq!(parsed.scoring.top_k, 5);
        assert_eq!(parsed.digest.sections.len(), 2);
    }

    #[test]
    fn scoring_defaults_apply_when_omitted() {
        let yaml = r"
enrichment:
  tier1_categories: [Think Tank]
  tier1_threshold: 0.2
  tier2_categories: [Government]
  tier3_categories: [News Media]
digest:
  lookback_hours: 60
  min_score: 0.4
  items_per_section: 2
  sections:
    - name: Governments
      categories: [Government]
";
        let parsed: EngineSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.scoring.top_k, 5);
        assert_eq!(parsed.enrichment.global_percentile, 0.90);
        assert!(parsed.digest.allowed_anchors.is_none());
        assert!(validate_settings(&parsed).is_ok());
    }

    #[test]
    fn load_settings_from_real_file() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("engine.yaml");
        assert!(
            path.exists(),
            "engine.yaml missing at {path:?} — required for this test"
        );
        let result = load_settings(&path);
        assert!(result.is_ok(), "failed to load engine.yaml: {result:?}");
        let settings = result.unwrap();
        assert!(!settings.digest.sections.is_empty());
    }
}
