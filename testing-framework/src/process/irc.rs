//! Auxiliary IRC server shared by every scenario of a suite
//!
//! The server is started once, before the first scenario, and is considered
//! ready once its stderr prints the configured marker line. Its stderr keeps
//! being copied to the output file for the whole suite.

use crate::config::IrcServerConfig;
use crate::error::ProcessError;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;

/// A running IRC server
pub struct IrcServer {
    program: String,
    child: Child,
    drain: Option<JoinHandle<()>>,
}

impl IrcServer {
    /// Launch the server and wait for its readiness marker
    pub async fn start(config: &IrcServerConfig, output: PathBuf) -> Result<Self, ProcessError> {
        info!("Starting {} {}", config.program, config.args.join(" "));
        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: config.program.clone(),
                source,
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProcessError::NotStarted(config.program.clone()))?;
        let mut lines = BufReader::new(stderr).lines();
        let mut file = File::create(&output).await?;

        loop {
            let Some(line) = lines.next_line().await? else {
                return Err(ProcessError::NotReady {
                    program: config.program.clone(),
                    marker: config.ready_marker.clone(),
                });
            };
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
            if line.contains(&config.ready_marker) {
                break;
            }
        }
        file.flush().await?;
        info!("{} is ready", config.program);

        let drain = tokio::spawn(drain_stderr(lines, file));
        Ok(Self {
            program: config.program.clone(),
            child,
            drain: Some(drain),
        })
    }

    /// Interrupt the server and reap it, killing it after `grace`
    pub async fn stop(mut self, grace: Duration) -> Result<i32, ProcessError> {
        super::interrupt(&self.child)?;
        let status = match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!("{} ignored SIGINT for {:?}, killing it", self.program, grace);
                self.child.kill().await?;
                self.child.wait().await?
            }
        };
        if let Some(drain) = self.drain.take() {
            // Stderr closes with the process
            let _ = drain.await;
        }
        let code = super::exit_code(status);
        debug!("{} exited with code {}", self.program, code);
        Ok(code)
    }
}

impl Drop for IrcServer {
    fn drop(&mut self) {
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
    }
}

async fn drain_stderr(
    mut lines: tokio::io::Lines<BufReader<ChildStderr>>,
    mut file: File,
) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if file.write_all(line.as_bytes()).await.is_err()
                    || file.write_all(b"\n").await.is_err()
                {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read IRC server output: {}", e);
                break;
            }
        }
    }
    let _ = file.flush().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str, marker: &str) -> IrcServerConfig {
        IrcServerConfig {
            enabled: true,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            ready_marker: marker.to_string(),
            output_file: PathBuf::from("irc_output.txt"),
        }
    }

    #[tokio::test]
    async fn test_ready_marker_then_stop() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("irc_output.txt");
        let config = shell("echo booting >&2; echo 'now running in foreground mode' >&2; exec sleep 30", "now running");

        let server = IrcServer::start(&config, output.clone()).await.unwrap();
        let code = server.stop(Duration::from_secs(5)).await.unwrap();
        assert_ne!(code, 0);

        let text = std::fs::read_to_string(output).unwrap();
        assert!(text.contains("booting"));
        assert!(text.contains("now running in foreground mode"));
    }

    #[tokio::test]
    async fn test_exit_before_marker() {
        let dir = tempfile::tempdir().unwrap();
        let config = shell("echo 'config error' >&2; exit 1", "now running");
        let result = IrcServer::start(&config, dir.path().join("irc_output.txt")).await;
        assert!(matches!(result, Err(ProcessError::NotReady { .. })));
    }
}
