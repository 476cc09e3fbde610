//! # Brobbot Runtime
//!
//! Orchestration layer for the Brobbot chat framework: configuration
//! loading (figment: `brobbot.toml` + `BROBBOT_*` environment variables),
//! tracing setup, startup sequencing, and orderly shutdown.
//!
//! The runtime owns the initialization contract the core relies on: the
//! robot's receive gate only opens after the brain reports ready and every
//! script has loaded, and any failure on that path closes the adapter and
//! brain before surfacing to the host process.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use brobbot_runtime::Runtime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     Runtime::builder()
//!         .adapter(ShellAdapter::new())
//!         .script(PingScript)
//!         .build()?
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{BrobbotConfig, LogFormat, LogLevel, LoggingConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use runtime::{Runtime, RuntimeBuilder};
