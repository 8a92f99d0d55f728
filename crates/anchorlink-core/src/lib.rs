use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod settings;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use settings::{
    load_settings, DigestSettings, EngineSettings, EnrichmentSettings, ScoringSettings,
    SectionSettings,
};

/// The type of reference an anchor component holds.
///
/// Each component contributes embedding vectors to its anchor: a `tag` is
/// looked up by exact name in the tags table, a `kb_item` by its source
/// location in the vector store, and a `program` indirectly through the
/// program's charter document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Tag,
    Program,
    KbItem,
}

impl ComponentKind {
    /// Parse the database representation of a component type.
    ///
    /// Returns `None` for unrecognized values so callers can drop the
    /// component with a warning instead of failing the pass.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tag" => Some(Self::Tag),
            "program" => Some(Self::Program),
            "kb_item" => Some(Self::KbItem),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Tag => write!(f, "tag"),
            ComponentKind::Program => write!(f, "program"),
            ComponentKind::KbItem => write!(f, "kb_item"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read settings file {path}")]
    SettingsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file")]
    SettingsParse(#[from] serde_yaml::Error),
    #[error("invalid settings: {0}")]
    Validation(String),
}
