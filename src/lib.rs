pub mod api;
pub mod collection;
pub mod error;
pub mod serde;
pub mod server;
pub mod settings;
pub mod tracing;

pub use collection::{Collector, CollectorSettings};
pub use error::ExporterError;

pub type ExporterResult<T> = Result<T, error::ExporterError>;
