pub mod app_config;
pub mod catalog;
pub mod config;
pub mod synonyms;
pub mod sync;

pub use app_config::{AppConfig, Environment, ZureoCredentials};
pub use catalog::{sync_key, CatalogRow};
pub use config::{load_app_config, load_app_config_from_env};
pub use synonyms::{load_synonyms, load_synonyms_or_builtin, SynonymTable};
pub use sync::{SyncStatusKind, SyncStrategy, PRODUCTS_SYNC_TYPE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read synonyms file {path}: {source}")]
    SynonymsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse synonyms file: {0}")]
    SynonymsFileParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}
