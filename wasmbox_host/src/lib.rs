pub mod call;
pub mod config;
pub mod loader;
pub mod runtime;

pub use config::{Config, ConfigBuilder};
pub use loader::{Buffer, Encoding};
pub use runtime::{Error, Runtime};

/// The default cap on guest linear memory (128MiB)
pub(crate) const DEFAULT_MAX_MEMORY: usize = 128 * 1024 * 1024;
