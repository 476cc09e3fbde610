//! # Brobbot
//!
//! A chat-message dispatch framework: incoming events are routed to
//! registered listeners, each with its own serialized execution queue, and
//! handlers work against a namespaced structured key-value store.
//!
//! This facade re-exports the core engine ([`brobbot_core`]) and the
//! orchestration layer ([`brobbot_runtime`]). Most applications only need:
//!
//! ```rust,ignore
//! use brobbot::prelude::*;
//! use brobbot::Runtime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     Runtime::builder()
//!         .adapter(my_adapter)
//!         .script(my_script)
//!         .build()?
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

pub use brobbot_core;
pub use brobbot_runtime;

pub use brobbot_core::*;
pub use brobbot_runtime::{
    BrobbotConfig, LogFormat, LogLevel, LoggingConfig, Runtime, RuntimeBuilder, RuntimeError,
    RuntimeResult,
};

/// Prelude for common imports.
pub mod prelude {
    pub use brobbot_core::prelude::*;
    pub use brobbot_runtime::{BrobbotConfig, Runtime};
}
