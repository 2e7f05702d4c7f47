pub mod config;
pub mod console;
pub mod error;
pub mod existing;
pub mod introspect;
pub mod license;
pub mod operations;
pub mod recipe;
pub mod registry;
pub mod requirement;
pub mod resolve;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{PipoeConfig, PythonTag};
pub use error::PipoeError;
pub use registry::{PypiRegistry, Registry};

pub type Result<T> = std::result::Result<T, PipoeError>;
