//! Bridge to the external proof-of-work worker binary.
//!
//! The worker is invoked as `<bin> [args..] '<json-input>'`. It may print any
//! amount of progress output; the one line that matters carries the result
//! sentinel followed by a JSON body `{sequence, nonce, time, magic}`.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::WorkerError;

/// Marker the worker prints in front of its result line.
pub const RESULT_SENTINEL: &str = "a87c1c7c-02a2-4d7d-ae59-81b176127c81";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub sequence: u64,
    pub nonce: u64,
    pub time: u64,
    pub magic: String,
}

// ==============================================================================
// Line Classification
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// The text after the sentinel.
    Result(&'a str),
    Diagnostic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelClassifier {
    sentinel: String,
}

impl Default for SentinelClassifier {
    fn default() -> Self {
        Self::new(RESULT_SENTINEL)
    }
}

impl SentinelClassifier {
    pub fn new(sentinel: &str) -> Self {
        Self {
            sentinel: sentinel.to_owned(),
        }
    }

    pub fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        match line.find(&self.sentinel) {
            Some(start) => {
                let payload = &line[start + self.sentinel.len()..];
                LineKind::Result(payload.trim_start_matches(|c: char| c == ':' || c.is_whitespace()).trim_end())
            }
            None => LineKind::Diagnostic,
        }
    }

    pub fn is_result(&self, line: &str) -> bool {
        matches!(self.classify(line), LineKind::Result(_))
    }

    /// Decode the JSON body of a result line.
    pub fn decode(&self, line: &str) -> Result<WorkerResult, WorkerError> {
        let payload = match self.classify(line) {
            LineKind::Result(payload) => payload,
            LineKind::Diagnostic => line,
        };
        serde_json::from_str(payload).map_err(|source| WorkerError::ResultParse {
            line: line.to_owned(),
            source,
        })
    }
}

// ==============================================================================
// Process Bridge
// ==============================================================================

/// Runs the worker binary and collects its result.
///
/// No timeout is applied: a worker that never exits keeps the call pending.
/// The child is killed if the returned future is dropped.
#[derive(Debug, Clone)]
pub struct WorkerBridge {
    bin: PathBuf,
    args: Vec<OsString>,
    classifier: SentinelClassifier,
}

impl WorkerBridge {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            args: Vec::new(),
            classifier: SentinelClassifier::default(),
        }
    }

    /// Add an argument placed before the JSON input.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn sentinel(mut self, sentinel: &str) -> Self {
        self.classifier = SentinelClassifier::new(sentinel);
        self
    }

    /// Spawn the worker with `input` as its last argument and wait for it.
    ///
    /// Returns `Ok(None)` when the worker exits cleanly without ever printing
    /// a sentinel line. A nonzero exit yields [`WorkerError::ProcessExit`]
    /// carrying the worker's stderr, whatever stdout contained.
    pub async fn run<T>(&self, input: &T) -> Result<Option<WorkerResult>, WorkerError>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(input).map_err(WorkerError::InvalidInput)?;
        debug!(
            bin = %self.bin.display(),
            payload_len = payload.len(),
            "spawning worker"
        );

        let mut child = Command::new(&self.bin)
            .args(&self.args)
            .arg(&payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WorkerError::Spawn {
                bin: self.bin.display().to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("worker stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("worker stderr was not captured"))?;

        // Both streams are drained to the end before the exit status is
        // inspected; a stdout failure only surfaces after a clean exit.
        let (candidate, stderr) =
            futures::join!(self.scan_stdout(stdout), collect_stderr(stderr));
        let status = child.wait().await?;

        if !status.success() {
            warn!(bin = %self.bin.display(), code = ?status.code(), "worker exited with failure");
            return Err(WorkerError::ProcessExit {
                code: status.code(),
                stderr: stderr?,
            });
        }

        match candidate? {
            Some(line) => self.classifier.decode(&line).map(Some),
            None => {
                warn!(bin = %self.bin.display(), "worker exited cleanly without a result line");
                Ok(None)
            }
        }
    }

    /// Keep the first sentinel line; everything else is logged and dropped.
    /// Lines are decoded lossily, so stray non-UTF-8 output is harmless.
    async fn scan_stdout<R>(&self, stdout: R) -> Result<Option<String>, WorkerError>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(stdout);
        let mut raw = Vec::new();
        let mut candidate = None;
        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw).await? == 0 {
                break;
            }
            let decoded = String::from_utf8_lossy(&raw);
            let line = decoded.trim_end_matches(['\r', '\n']);
            if !self.classifier.is_result(line) {
                debug!(target: "atomx_core::worker::stdout", "{line}");
            } else if candidate.is_none() {
                debug!("worker result line received");
                candidate = Some(line.to_owned());
            } else {
                warn!(line = %line, "ignoring extra worker result line");
            }
        }
        Ok(candidate)
    }
}

async fn collect_stderr<R>(mut stderr: R) -> Result<String, WorkerError>
where
    R: AsyncRead + Unpin,
{
    let mut raw = Vec::new();
    stderr.read_to_end(&mut raw).await?;
    let text = String::from_utf8_lossy(&raw).into_owned();
    for line in text.lines() {
        debug!(target: "atomx_core::worker::stderr", "{line}");
    }
    Ok(text)
}
