use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, info, warn};

use crate::{agent::Agent, config::BridgeConfig, error::ServiceError};

const STDERR_TAIL_CHARS: usize = 200;

/// Agent driven as a subprocess: the task goes in on stdin, the result comes
/// back on stdout.
///
/// No shell is involved; the executable and its arguments are passed as-is.
pub struct CliAgent {
    program: String,
    args: Vec<String>,
    workdir: Option<PathBuf>,
}

impl CliAgent {
    pub fn new(program: impl Into<String>, args: Vec<String>, workdir: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            workdir,
        }
    }

    /// Builds the agent and checks once that its executable actually runs.
    pub async fn initialize(config: &BridgeConfig) -> Result<Self, ServiceError> {
        let agent = Self::new(
            config.agent_command.clone(),
            config.agent_args.clone(),
            config.agent_workdir.clone(),
        );
        agent.probe(&config.agent_probe_args).await?;
        info!(program = %agent.program, "agent ready");
        Ok(agent)
    }

    async fn probe(&self, probe_args: &[String]) -> Result<(), ServiceError> {
        if probe_args.is_empty() {
            return Ok(());
        }
        let output = self
            .command(probe_args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ServiceError::Agent(format!("failed to spawn {}: {e}", self.program)))?;
        if !output.status.success() {
            return Err(exit_error(&self.program, output.status.code(), &output.stderr));
        }
        Ok(())
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.workdir.as_ref() {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl Agent for CliAgent {
    async fn run(&self, task: &str) -> Result<Option<String>, ServiceError> {
        let mut child = self
            .command(&self.args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| ServiceError::Agent(format!("failed to spawn {}: {e}", self.program)))?;

        // Feed stdin from its own task so a chatty child cannot deadlock
        // against a full stdout pipe.
        if let Some(mut stdin) = child.stdin.take() {
            let task = task.to_string();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(task.as_bytes()).await {
                    warn!("agent stdin write failed: {e}");
                }
            });
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(exit_error(&self.program, output.status.code(), &output.stderr));
        }
        if !output.stderr.is_empty() {
            debug!(
                program = %self.program,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "agent stderr output"
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!stdout.is_empty()).then_some(stdout))
    }
}

fn exit_error(program: &str, code: Option<i32>, stderr: &[u8]) -> ServiceError {
    let code = code.unwrap_or(-1);
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        return ServiceError::Agent(format!("{program} exited with code {code}"));
    }
    // the useful part of a failing CLI's stderr is at the end
    let skip = stderr.chars().count().saturating_sub(STDERR_TAIL_CHARS);
    let tail: String = stderr.chars().skip(skip).collect();
    let prefix = if skip > 0 { "..." } else { "" };
    ServiceError::Agent(format!("{program} exited with code {code}: {prefix}{tail}"))
}
