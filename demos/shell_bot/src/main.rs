//! Shell Bot
//!
//! A small interactive bot demonstrating the framework end to end: three
//! scripts register listeners, the memory brain holds their state, and the
//! shell adapter turns stdin lines into messages.
//!
//! Try, at the prompt:
//!
//! ```text
//! Brobbot> Brobbot: ping
//! Brobbot> alice++
//! Brobbot> Brobbot: help
//! Brobbot> exit
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package shell-bot
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::error;

use brobbot::Runtime;
use brobbot::prelude::*;
use brobbot_adapter_shell::ShellAdapter;

/// Compiles a pattern, mapping failures onto the script error channel.
fn pattern(pattern: &str) -> Result<Regex, ScriptError> {
    Regex::new(pattern).map_err(ScriptError::init)
}

// ============================================================================
// Scripts
// ============================================================================

/// Replies to "ping", addressed at the bot.
struct PingScript;

#[async_trait]
impl Script for PingScript {
    fn name(&self) -> &str {
        "ping"
    }

    async fn load(&self, robot: RobotSegment) -> Result<(), ScriptError> {
        robot.help_command("<bot> ping", "replies with PONG");
        robot.respond(pattern("(?i)^ping$")?, |res: Response| async move {
            let pong = res
                .random(&["PONG", "pong", "PONG!"])
                .copied()
                .unwrap_or("PONG");
            res.send(pong).await?;
            Ok(())
        });
        Ok(())
    }
}

/// Hands out points: `alice++` bumps alice's score in the script's own
/// brain segment.
struct ScoreScript;

#[async_trait]
impl Script for ScoreScript {
    fn name(&self) -> &str {
        "score"
    }

    async fn load(&self, robot: RobotSegment) -> Result<(), ScriptError> {
        robot.help_command("<name>++", "gives <name> a point");

        let brain = Arc::clone(robot.brain());
        robot.hear(pattern(r"^\s*(\w+)\+\+\s*$")?, move |res: Response| {
            let brain = Arc::clone(&brain);
            async move {
                let name = res.capture(1).unwrap_or("someone").to_string();
                let total = brain.hincr_by("scores", &name, 1).await?;
                res.send(format!("{name} has {total} point(s)")).await?;
                Ok(())
            }
        });
        Ok(())
    }
}

/// Lists every registered help entry.
struct HelpScript;

#[async_trait]
impl Script for HelpScript {
    fn name(&self) -> &str {
        "help"
    }

    async fn load(&self, robot: RobotSegment) -> Result<(), ScriptError> {
        let shared = Arc::clone(robot.robot());
        robot.respond(pattern("(?i)^help$")?, move |res: Response| {
            let robot = Arc::clone(&shared);
            async move {
                let mut commands = robot.help_commands();
                commands.sort();
                res.send_all(commands).await?;
                Ok(())
            }
        });
        Ok(())
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = Runtime::builder()
        .adapter(ShellAdapter::new())
        .script(PingScript)
        .script(ScoreScript)
        .script(HelpScript)
        .build()?;

    // Failures stay local to the failing listener; this just makes them
    // visible on the console.
    runtime.robot().on_error(|err, message| {
        error!(
            error = %err,
            text = message.text_body().unwrap_or(""),
            "handler failed"
        );
    });

    runtime.run().await?;
    Ok(())
}
