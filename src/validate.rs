//! Validation bridge.
//!
//! Hands writer output to an external authority and turns its answer
//! into a [`Verdict`]. Two authorities are supported: the proxy binary's
//! `validate` subcommand and the admin API's `/adapt` endpoint.
//!
//! An invalid configuration is a successful call returning
//! [`Verdict::Invalid`]. Failing to reach the authority at all is a
//! [`BridgeError`], since nothing is known about the text.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::admin::{AdminClient, AdminError};
use crate::diagnostics::{Diagnostic, adapt_warnings, decode_failure};

/// Answer of the validating authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// Accepted. Carries non-fatal warnings, if the authority reports any.
    Valid(Vec<Diagnostic>),
    /// Rejected, with at least one diagnostic.
    Invalid(Vec<Diagnostic>),
}

impl Verdict {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Valid(d) | Self::Invalid(d) => d,
        }
    }
}

/// Validation status of a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum ValidationState {
    #[default]
    Unchecked,
    Valid,
    Invalid(Vec<Diagnostic>),
}

impl From<Verdict> for ValidationState {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Valid(_) => Self::Valid,
            Verdict::Invalid(diagnostics) => Self::Invalid(diagnostics),
        }
    }
}

/// The authority could not produce a verdict.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("validator unreachable: {0}")]
    Unreachable(String),
    #[error("validator timed out after {0:?}")]
    Timeout(Duration),
    #[error("validation cancelled")]
    Cancelled,
    #[error("validator i/o: {0}")]
    Io(#[from] io::Error),
}

impl From<AdminError> for BridgeError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Timeout(after) => Self::Timeout(after),
            AdminError::Cancelled => Self::Cancelled,
            other => Self::Unreachable(other.to_string()),
        }
    }
}

/// A validating authority.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Submit `text` for validation. Returns early with
    /// [`BridgeError::Cancelled`] once `cancel` fires.
    async fn validate(&self, text: &str, cancel: &CancellationToken)
    -> Result<Verdict, BridgeError>;
}

/// Runs `<bin> validate --config <file> --adapter caddyfile`.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    bin: PathBuf,
    timeout: Duration,
}

impl CommandValidator {
    #[must_use]
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    fn spawn(&self, config: &std::path::Path) -> Result<Child, BridgeError> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("validate")
            .arg("--config")
            .arg(config)
            .arg("--adapter")
            .arg("caddyfile")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                BridgeError::Unreachable(format!("{}: {e}", self.bin.display()))
            }
            _ => BridgeError::Io(e),
        })
    }
}

enum Interrupt {
    Cancelled,
    TimedOut,
}

#[async_trait]
impl Validator for CommandValidator {
    async fn validate(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Verdict, BridgeError> {
        let mut file = tempfile::Builder::new()
            .prefix("caddyfile-")
            .suffix(".caddyfile")
            .tempfile()?;
        file.write_all(text.as_bytes())?;
        file.flush()?;

        let mut child = self.spawn(file.path())?;
        debug!(bin = %self.bin.display(), pid = ?child.id(), "validator started");

        let interrupt = tokio::select! {
            biased;
            () = cancel.cancelled() => Interrupt::Cancelled,
            result = collect(&mut child) => {
                let (status, output) = result?;
                return Ok(command_verdict(status, &output));
            }
            () = tokio::time::sleep(self.timeout) => Interrupt::TimedOut,
        };

        if let Err(e) = child.kill().await {
            warn!(error = %e, "failed to kill validator");
        }
        match interrupt {
            Interrupt::Cancelled => Err(BridgeError::Cancelled),
            Interrupt::TimedOut => Err(BridgeError::Timeout(self.timeout)),
        }
    }
}

fn command_verdict(status: ExitStatus, output: &str) -> Verdict {
    if status.success() {
        info!("configuration valid");
        Verdict::Valid(Vec::new())
    } else {
        let diagnostics = decode_failure(output);
        info!(code = ?status.code(), diagnostics = diagnostics.len(), "configuration invalid");
        Verdict::Invalid(diagnostics)
    }
}

/// Wait for the child while draining both pipes. Output is stdout
/// followed by stderr.
async fn collect(child: &mut Child) -> io::Result<(ExitStatus, String)> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (out, err, status) = tokio::join!(read_pipe(stdout), read_pipe(stderr), child.wait());

    let mut output = out?;
    let err = err?;
    if !output.is_empty() && !err.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(&err);
    Ok((status?, output))
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Validates through the admin API's `/adapt` endpoint.
#[derive(Debug, Clone)]
pub struct AdminValidator {
    client: AdminClient,
}

impl AdminValidator {
    #[must_use]
    pub const fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Validator for AdminValidator {
    async fn validate(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Verdict, BridgeError> {
        let response = self.client.adapt(text, cancel).await?;
        if response.is_success() {
            let warnings = adapt_warnings(&response.body);
            info!(warnings = warnings.len(), "configuration valid");
            Ok(Verdict::Valid(warnings))
        } else {
            let diagnostics = decode_failure(&response.body);
            info!(
                status = response.status,
                diagnostics = diagnostics.len(),
                "configuration invalid"
            );
            Ok(Verdict::Invalid(diagnostics))
        }
    }
}
