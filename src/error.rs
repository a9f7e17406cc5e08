use std::fmt::Debug;

use either::{Either, Left, Right};
use thiserror::Error;

mod api_errors;
mod settings_errors;

pub use api_errors::ApiError;
pub use settings_errors::SettingsError;

/// Produces a hierarchical `::`-separated label for an error, suitable as a metric label value.
pub trait MetricLabel {
    fn label(&self) -> String {
        match self.next() {
            Either::Right(n) => format!("{}::{}", self.slug(), n.label()),
            Either::Left(ls) => format!("{}::{}", self.slug(), ls),
        }
    }

    fn slug(&self) -> String;
    fn next(&self) -> Either<String, Box<&dyn MetricLabel>>;
}

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Settings(#[from] SettingsError),

    #[error("failed to declare metric instruments: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("failed to initialize tracing: {0}")]
    Tracing(#[source] anyhow::Error),

    #[error("collection cancelled")]
    Cancelled,
}

impl MetricLabel for ExporterError {
    fn slug(&self) -> String {
        "exporter".into()
    }

    fn next(&self) -> Either<String, Box<&dyn MetricLabel>> {
        match self {
            Self::Api(e) => Right(Box::new(e)),
            Self::Settings(e) => Right(Box::new(e)),
            Self::Metrics(_) => Left("prometheus".into()),
            Self::Io(_) => Left("io".into()),
            Self::Tracing(_) => Left("tracing".into()),
            Self::Cancelled => Left("cancelled".into()),
        }
    }
}
