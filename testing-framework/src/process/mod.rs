// File: testing-framework/src/process/mod.rs
//
// System Under Test Processes
//
// The gateway is started fresh for every scenario with its output redirected
// to a per-scenario file. Shutdown is cooperative: one SIGINT, then the exit
// code is awaited; the run loop kills the process only when it does not exit
// in time.

pub mod irc;

pub use irc::IrcServer;

use crate::config::{ConfigVariant, HarnessConfig};
use crate::error::ProcessError;
use async_trait::async_trait;
use log::{debug, info};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fs::File;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};

/// Handle on the process whose protocol behavior is being tested
#[async_trait]
pub trait SutProcess: Send {
    /// Launch the process
    async fn start(&mut self) -> Result<(), ProcessError>;

    /// Ask the process to exit; sends the interrupt at most once
    fn signal_terminate(&mut self) -> Result<(), ProcessError>;

    /// Wait for the process to exit and return its exit code
    ///
    /// A process killed by signal N reports -N. Cancel-safe.
    async fn wait(&mut self) -> Result<i32, ProcessError>;

    /// Kill the process and reap it
    async fn kill(&mut self) -> Result<(), ProcessError>;
}

/// Exit code of a finished process, -N when killed by signal N
pub fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => -status.signal().unwrap_or(0),
    }
}

/// Send SIGINT to a running child
pub(crate) fn interrupt(child: &Child) -> Result<(), ProcessError> {
    let Some(pid) = child.id() else {
        // Already reaped
        return Ok(());
    };
    signal::kill(Pid::from_raw(pid as i32), Signal::SIGINT).map_err(|e| ProcessError::Signal {
        pid,
        reason: e.to_string(),
    })
}

/// A command whose stdout and stderr go to one file
pub struct ProcessRunner {
    name: String,
    program: String,
    args: Vec<String>,
    output_path: PathBuf,
    child: Option<Child>,
    interrupted: bool,
    exit_code: Option<i32>,
}

impl ProcessRunner {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            output_path: output_path.into(),
            child: None,
            interrupted: false,
            exit_code: None,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    fn child_mut(&mut self) -> Result<&mut Child, ProcessError> {
        self.child
            .as_mut()
            .ok_or_else(|| ProcessError::NotStarted(self.name.clone()))
    }
}

#[async_trait]
impl SutProcess for ProcessRunner {
    async fn start(&mut self) -> Result<(), ProcessError> {
        let output = File::create(&self.output_path)?;
        let stderr = output.try_clone()?;

        debug!("Launching {} {}", self.program, self.args.join(" "));
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(output))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        info!("Started {} (pid {:?})", self.name, child.id());
        self.child = Some(child);
        self.interrupted = false;
        self.exit_code = None;
        Ok(())
    }

    fn signal_terminate(&mut self) -> Result<(), ProcessError> {
        if self.interrupted {
            return Ok(());
        }
        let child = self.child_mut()?;
        interrupt(child)?;
        self.interrupted = true;
        debug!("Sent SIGINT to {}", self.name);
        Ok(())
    }

    async fn wait(&mut self) -> Result<i32, ProcessError> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }
        let status = self.child_mut()?.wait().await?;
        let code = exit_code(status);
        debug!("{} exited with code {}", self.name, code);
        self.exit_code = Some(code);
        Ok(code)
    }

    async fn kill(&mut self) -> Result<(), ProcessError> {
        let name = self.name.clone();
        let child = self.child_mut()?;
        child.kill().await?;
        info!("Killed {}", name);
        Ok(())
    }
}

/// The gateway, launched once per scenario
///
/// Before launching, the configuration file for the scenario's variant is
/// written and the database left by the previous scenario is removed.
pub struct GatewayProcess {
    runner: ProcessRunner,
    config_path: PathBuf,
    config_text: String,
    db_path: PathBuf,
}

impl GatewayProcess {
    pub fn new(config: &HarnessConfig, scenario: &str, variant: ConfigVariant) -> anyhow::Result<Self> {
        let (program, args) = config.gateway.command_line();
        let output = config.output_path(format!("biboumi_{}_output.txt", scenario));
        Ok(Self {
            runner: ProcessRunner::new("biboumi", program, args, output),
            config_path: config.gateway.config_path.clone(),
            config_text: variant.render(&config.component, &config.gateway)?,
            db_path: config.gateway.db_path.clone(),
        })
    }

    pub fn output_path(&self) -> &Path {
        self.runner.output_path()
    }

    fn prepare(&self) -> Result<(), ProcessError> {
        std::fs::write(&self.config_path, &self.config_text)?;
        match std::fs::remove_file(&self.db_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SutProcess for GatewayProcess {
    async fn start(&mut self) -> Result<(), ProcessError> {
        self.prepare()?;
        self.runner.start().await
    }

    fn signal_terminate(&mut self) -> Result<(), ProcessError> {
        self.runner.signal_terminate()
    }

    async fn wait(&mut self) -> Result<i32, ProcessError> {
        self.runner.wait().await
    }

    async fn kill(&mut self) -> Result<(), ProcessError> {
        self.runner.kill().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn runner(dir: &tempfile::TempDir, program: &str, args: &[&str]) -> ProcessRunner {
        ProcessRunner::new(
            "test",
            program,
            args.iter().map(|s| s.to_string()).collect(),
            dir.path().join("output.txt"),
        )
    }

    #[tokio::test]
    async fn test_exit_code_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut process = runner(&dir, "sh", &["-c", "echo out; echo err >&2; exit 3"]);
        process.start().await.unwrap();
        assert_eq!(process.wait().await.unwrap(), 3);
        // Cached after the first wait
        assert_eq!(process.wait().await.unwrap(), 3);
        let output = std::fs::read_to_string(dir.path().join("output.txt")).unwrap();
        assert!(output.contains("out"));
        assert!(output.contains("err"));
    }

    #[tokio::test]
    async fn test_sigint_exit_code_is_negative_signal() {
        let dir = tempfile::tempdir().unwrap();
        let mut process = runner(&dir, "sleep", &["30"]);
        process.start().await.unwrap();
        process.signal_terminate().unwrap();
        // Only one interrupt is ever sent
        process.signal_terminate().unwrap();
        let code = tokio::time::timeout(Duration::from_secs(5), process.wait())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(code, -(Signal::SIGINT as i32));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut process = runner(&dir, "/nonexistent/biboumi", &[]);
        assert!(matches!(process.start().await, Err(ProcessError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_not_started() {
        let dir = tempfile::tempdir().unwrap();
        let mut process = runner(&dir, "true", &[]);
        assert!(matches!(process.signal_terminate(), Err(ProcessError::NotStarted(_))));
    }

    #[tokio::test]
    async fn test_gateway_prepares_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = HarnessConfig::default();
        config.output_dir = dir.path().to_path_buf();
        config.gateway.binary = PathBuf::from("true");
        config.gateway.config_path = dir.path().join("test.conf");
        config.gateway.db_path = dir.path().join("e2e_test.sqlite");
        std::fs::write(&config.gateway.db_path, b"stale").unwrap();

        let mut gateway = GatewayProcess::new(&config, "quit", ConfigVariant::FixedServer).unwrap();
        gateway.start().await.unwrap();
        assert_eq!(gateway.wait().await.unwrap(), 0);

        let written = std::fs::read_to_string(&config.gateway.config_path).unwrap();
        assert!(written.contains("fixed_irc_server=irc.localhost"));
        assert!(!config.gateway.db_path.exists());
        assert!(gateway.output_path().ends_with("biboumi_quit_output.txt"));
    }
}
