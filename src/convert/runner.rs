//! External program invocation.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::utils::error::{ConvertError, ConvertResult};

/// Builder for a single external program run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path
    program: String,
    /// Arguments, in order
    args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a path argument.
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished program.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code; `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam between the conversion pipeline and the operating system.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Resolve a program on `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Run to completion and capture output. Only a failure to launch is an
    /// error here; a non-zero exit is reported through `ProcessOutput`.
    async fn run(&self, invocation: &Invocation) -> ConvertResult<ProcessOutput>;
}

/// Runs programs with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    async fn run(&self, invocation: &Invocation) -> ConvertResult<ProcessOutput> {
        debug!("Running: {}", invocation);

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command.output().await.map_err(|source| ConvertError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
