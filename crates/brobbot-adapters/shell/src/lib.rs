//! Interactive shell adapter.
//!
//! A development transport: every stdin line becomes a text message from
//! the `Shell` user, and outgoing sends are printed in green. Typing
//! `exit` (or closing stdin) stops the loop; [`Adapter::close`] unblocks a
//! concurrently running loop through a cancellation token.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use brobbot_core::{Adapter, AdapterResult, Brain, Envelope, Message, Robot, UserOptions};

/// Directory identity the shell user is cached under.
const SHELL_USER_ID: &str = "1";
const SHELL_USER_NAME: &str = "Shell";
const SHELL_ROOM: &str = "Shell";

/// Wraps a line in the ANSI green used for bot output.
fn green(text: &str) -> String {
    format!("\x1b[01;32m{text}\x1b[0m")
}

/// Prefixes a reply with the addressee's name.
fn reply_line(name: &str, text: &str) -> String {
    format!("{name}: {text}")
}

/// Prefixes an emote.
fn emote_line(text: &str) -> String {
    format!("* {text}")
}

/// A REPL on stdin/stdout.
pub struct ShellAdapter {
    shutdown: CancellationToken,
}

impl ShellAdapter {
    /// Creates a shell adapter.
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
        }
    }

    async fn write_line(&self, line: &str) -> AdapterResult<()> {
        let mut stdout = io::stdout();
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn prompt(&self, robot: &Robot) -> AdapterResult<()> {
        let mut stdout = io::stdout();
        stdout.write_all(format!("{}> ", robot.name()).as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

impl Default for ShellAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for ShellAdapter {
    async fn send(&self, _envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        for string in strings {
            self.write_line(&green(string)).await?;
        }
        Ok(())
    }

    async fn reply(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        let name = envelope
            .user
            .as_ref()
            .map(|user| user.name.as_str())
            .unwrap_or(SHELL_USER_NAME);
        let prefixed: Vec<String> = strings
            .iter()
            .map(|string| reply_line(name, string))
            .collect();
        self.send(envelope, &prefixed).await
    }

    async fn emote(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        let prefixed: Vec<String> = strings.iter().map(|string| emote_line(string)).collect();
        self.send(envelope, &prefixed).await
    }

    async fn run(&self, robot: Arc<Robot>) -> AdapterResult<()> {
        let mut lines = BufReader::new(io::stdin()).lines();
        self.prompt(&robot).await?;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                line = lines.next_line() => match line? {
                    None => break,
                    Some(line) => {
                        if line.trim().eq_ignore_ascii_case("exit") {
                            break;
                        }
                        let user = robot
                            .brain()
                            .user_for_id(
                                SHELL_USER_ID,
                                UserOptions::named(SHELL_USER_NAME).in_room(SHELL_ROOM),
                            )
                            .await?;
                        robot
                            .receive(Message::text(user, line, Uuid::new_v4().to_string()))
                            .await;
                        self.prompt(&robot).await?;
                    }
                },
            }
        }

        debug!("shell adapter stopped");
        Ok(())
    }

    async fn close(&self) -> AdapterResult<()> {
        self.shutdown.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brobbot_core::MemoryBrain;
    use std::time::Duration;

    #[test]
    fn output_formatting() {
        assert_eq!(green("hi"), "\x1b[01;32mhi\x1b[0m");
        assert_eq!(reply_line("Shell", "OK"), "Shell: OK");
        assert_eq!(emote_line("waves"), "* waves");
    }

    #[tokio::test]
    async fn close_unblocks_run() {
        let adapter = Arc::new(ShellAdapter::new());
        let robot = Arc::new(Robot::new(
            "Brobbot",
            None,
            Arc::new(MemoryBrain::new()) as Arc<dyn Brain>,
        ));
        robot.mark_ready();

        let running = Arc::clone(&adapter);
        let handle = tokio::spawn(async move { running.run(robot).await });

        adapter.close().await.unwrap();
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("run did not stop after close");
        result.unwrap().unwrap();
    }
}
