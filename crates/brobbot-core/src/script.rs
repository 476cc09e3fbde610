//! Handler providers.
//!
//! A [`Script`] is a named bundle of listener registrations. The runtime
//! loads every script after the brain is ready and before the router
//! starts accepting messages; a load failure is an initialization failure
//! and aborts startup.

use async_trait::async_trait;

use crate::error::ScriptError;
use crate::robot::RobotSegment;

/// A named unit of listener registrations and storage setup.
#[async_trait]
pub trait Script: Send + Sync {
    /// Name used for the script's brain segment and in logs.
    fn name(&self) -> &str;

    /// Registers listeners and seeds storage.
    ///
    /// The robot handed in is a segment named after the script, so its
    /// brain keys are automatically scoped.
    async fn load(&self, robot: RobotSegment) -> Result<(), ScriptError>;
}
