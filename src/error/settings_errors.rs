use either::{Either, Left};
use thiserror::Error;

use super::MetricLabel;

#[derive(Debug, Error)]
pub enum SettingsError {
    /// Error loading or merging configuration sources.
    #[error("failed to load settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl MetricLabel for SettingsError {
    fn slug(&self) -> String {
        "settings".into()
    }

    fn next(&self) -> Either<String, Box<&dyn MetricLabel>> {
        match self {
            Self::Config(_) => Left("config".into()),
            Self::Validation(_) => Left("validation".into()),
        }
    }
}
