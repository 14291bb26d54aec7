pub mod app_config;
pub mod catalog;
pub mod config;
pub mod exclusions;

pub use app_config::{AppConfig, BuyPriceMode, Environment};
pub use catalog::{CatalogImage, CatalogProduct, CatalogVariant, CountryPrice, LocaleContent};
pub use config::{load_app_config, load_app_config_from_env};
pub use exclusions::{load_exclusions, load_exclusions_or_empty, ExclusionsFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read exclusions file {path}: {source}")]
    ExclusionsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse exclusions file: {0}")]
    ExclusionsFileParse(#[source] serde_yaml::Error),

    #[error("invalid exclusions file: {0}")]
    InvalidExclusions(String),
}
