//! Generator that shells out to an external command.
//!
//! The prompt is written to the command's stdin; whatever it prints on
//! stdout is the reply. A non-zero exit or a timeout is a failure.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info};

use super::PlanningGenerator;

#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandGenerator {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[async_trait]
impl PlanningGenerator for CommandGenerator {
    fn name(&self) -> &str {
        "command"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        info!(command = %self.command_line(), "running planning generator");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start generator {:?}", self.command_line()))?;

        let mut stdin = child.stdin.take();
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        // Feed stdin and drain both pipes while waiting so a chatty child
        // cannot block on a full pipe.
        let write_prompt = async {
            if let Some(mut pipe) = stdin.take() {
                pipe.write_all(prompt.as_bytes()).await?;
                pipe.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stdout_pipe {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<Vec<u8>, std::io::Error>(buf)
        };
        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stderr_pipe {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<Vec<u8>, std::io::Error>(buf)
        };

        let outcome = tokio::time::timeout(self.timeout, async {
            tokio::join!(write_prompt, read_stdout, read_stderr, child.wait())
        })
        .await;

        let (written, stdout, stderr, status) = match outcome {
            Ok(results) => results,
            Err(_) => {
                let _ = child.kill().await;
                bail!(
                    "generator {:?} timed out after {}s",
                    self.command_line(),
                    self.timeout.as_secs()
                );
            }
        };

        let status = status.context("failed to wait on generator")?;
        let stdout = stdout.context("failed to read generator stdout")?;
        let stderr = stderr.context("failed to read generator stderr")?;
        if !status.success() {
            // stderr is only shown to the operator, so a lossy decode is enough.
            bail!(
                "generator {:?} exited with {}: {}",
                self.command_line(),
                status,
                String::from_utf8_lossy(&stderr).trim()
            );
        }
        // A generator that exits without reading its stdin is fine.
        if let Err(e) = written {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(e).context("failed to send prompt to generator");
            }
        }

        debug!(bytes = stdout.len(), "generator reply received");
        String::from_utf8(stdout).context("generator reply is not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandGenerator {
        CommandGenerator::new("sh", vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn returns_stdout() {
        let reply = sh("echo '{\"type_tournoi\": \"round_robin\"}'")
            .generate("ignored")
            .await
            .unwrap();
        assert_eq!(reply.trim(), r#"{"type_tournoi": "round_robin"}"#);
    }

    #[tokio::test]
    async fn prompt_goes_to_stdin() {
        let reply = sh("cat").generate("bonjour").await.unwrap();
        assert_eq!(reply, "bonjour");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let err = sh("echo quota exceeded >&2; exit 3")
            .generate("p")
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exited with"), "{msg}");
        assert!(msg.contains("quota exceeded"), "{msg}");
    }

    #[tokio::test]
    async fn times_out() {
        let err = sh("sleep 5")
            .with_timeout(Duration::from_millis(100))
            .generate("p")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn non_utf8_reply_is_an_error() {
        let err = sh("printf '\\377\\376'").generate("p").await.unwrap_err();
        assert!(err.to_string().contains("not valid UTF-8"), "{err:#}");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let err = CommandGenerator::new("/nonexistent/tourney-generator", vec![])
            .generate("p")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to start generator"));
    }
}
