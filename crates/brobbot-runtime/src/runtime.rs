//! Runtime orchestration.
//!
//! The [`Runtime`] wires the pieces together and sequences startup:
//!
//! 1. initialize logging from configuration,
//! 2. wait for the brain to report ready,
//! 3. load every registered script (each against its own robot segment),
//! 4. open the robot's receive gate,
//! 5. drive the adapter until it stops, the process is interrupted, or
//!    the shutdown token is cancelled.
//!
//! Any initialization failure is fatal: the adapter and brain are closed
//! in order and the error is returned to the host process. Messages are
//! never accepted before step 4, so handlers can rely on a ready store.
//!
//! # Example
//!
//! ```rust,ignore
//! use brobbot_runtime::Runtime;
//!
//! let runtime = Runtime::builder()
//!     .adapter(ShellAdapter::new())
//!     .script(PingScript)
//!     .build()?;
//! runtime.run().await?;
//! ```

use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use brobbot_core::{Adapter, Brain, MemoryBrain, Robot, Script};

use crate::config::{self, BrobbotConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Orchestrates a robot, its brain, its adapter, and its scripts.
pub struct Runtime {
    config: BrobbotConfig,
    robot: Arc<Robot>,
    brain: Arc<dyn Brain>,
    adapter: Arc<dyn Adapter>,
    scripts: Vec<Arc<dyn Script>>,
    shutdown: CancellationToken,
}

impl Runtime {
    /// Starts building a runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// The shared robot, for registrations outside of scripts or for
    /// handing to an embedding host.
    pub fn robot(&self) -> &Arc<Robot> {
        &self.robot
    }

    /// A token an embedding host can cancel to stop [`run`](Self::run).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs the bot to completion.
    pub async fn run(self) -> RuntimeResult<()> {
        logging::init_from_config(&self.config.logging);
        info!(name = %self.config.name, "starting");

        if let Err(err) = self.initialize().await {
            error!(error = %err, "initialization failed, shutting down");
            self.close().await;
            return Err(err);
        }

        self.robot.mark_ready();
        info!("ready");

        let result = tokio::select! {
            result = self.adapter.run(Arc::clone(&self.robot)) => {
                result.map_err(RuntimeError::from)
            }
            signal = signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!(error = %err, "interrupt handler failed");
                }
                info!("interrupt received");
                Ok(())
            }
            _ = self.shutdown.cancelled() => {
                info!("shutdown requested");
                Ok(())
            }
        };

        self.shutdown.cancel();
        self.close().await;
        result
    }

    /// Brain readiness, then scripts, in registration order.
    async fn initialize(&self) -> RuntimeResult<()> {
        self.brain.ready().await?;

        for script in &self.scripts {
            debug!(script = script.name(), "loading script");
            script
                .load(self.robot.segment(script.name()))
                .await
                .map_err(|source| RuntimeError::Script {
                    name: script.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Orderly teardown; failures are logged, not propagated.
    async fn close(&self) {
        info!("shutting down");
        if let Err(err) = self.adapter.close().await {
            warn!(error = %err, "adapter close failed");
        }
        if let Err(err) = self.brain.close().await {
            warn!(error = %err, "brain close failed");
        }
    }
}

/// Builder for [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    config: Option<BrobbotConfig>,
    brain: Option<Arc<dyn Brain>>,
    adapter: Option<Arc<dyn Adapter>>,
    scripts: Vec<Arc<dyn Script>>,
}

impl RuntimeBuilder {
    /// Uses a pre-loaded configuration instead of the default lookup
    /// (`brobbot.toml` + `BROBBOT_*` environment variables).
    pub fn config(mut self, config: BrobbotConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Substitutes a brain for the default volatile [`MemoryBrain`].
    pub fn brain(mut self, brain: impl Brain + 'static) -> Self {
        self.brain = Some(Arc::new(brain));
        self
    }

    /// Sets the adapter. Required.
    pub fn adapter(mut self, adapter: impl Adapter + 'static) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    /// Registers a script; may be called repeatedly, scripts accumulate.
    pub fn script(mut self, script: impl Script + 'static) -> Self {
        self.scripts.push(Arc::new(script));
        self
    }

    /// Builds the runtime, loading configuration when none was supplied.
    pub fn build(self) -> RuntimeResult<Runtime> {
        let config = match self.config {
            Some(config) => config,
            None => config::load()?,
        };
        let brain = self
            .brain
            .unwrap_or_else(|| Arc::new(MemoryBrain::new()));
        let adapter = self.adapter.ok_or(RuntimeError::MissingAdapter)?;

        let robot = Arc::new(Robot::new(
            &config.name,
            config.alias.clone(),
            Arc::clone(&brain),
        ));
        robot.attach_adapter(Arc::clone(&adapter));

        Ok(Runtime {
            config,
            robot,
            brain,
            adapter,
            scripts: self.scripts,
            shutdown: CancellationToken::new(),
        })
    }
}
