// src/exec/worker.rs

//! One worker process: `Spawning -> Running -> Exited`.
//!
//! A worker's stdout, stderr and exit are turned into [`WorkerMessage`]s on
//! a channel shared by its cohort; the supervisor consumes them one at a
//! time.

use std::process::ExitStatus;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::ExitRecord;
use crate::types::OutputStyle;

/// How long to keep reading output after the process exited.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Spawning,
    Running,
    Exited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    /// 1-based position in the cohort.
    pub ordinal: usize,
    /// `None` until the process has started.
    pub pid: Option<u32>,
    pub status: WorkerStatus,
}

impl WorkerHandle {
    pub fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            pid: None,
            status: WorkerStatus::Spawning,
        }
    }

    pub fn started(&mut self, pid: u32) {
        self.pid = Some(pid);
        self.status = WorkerStatus::Running;
    }

    pub fn exited(&mut self) {
        self.status = WorkerStatus::Exited;
    }

    pub fn is_live(&self) -> bool {
        self.status == WorkerStatus::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug)]
pub enum WorkerMessage {
    Output {
        pid: u32,
        stream: Stream,
        text: String,
    },
    Exited(ExitRecord),
    /// Waiting on the process failed; it is treated as exited.
    WaitFailed {
        pid: u32,
        error: String,
    },
}

fn ansi_escape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("static regex"))
}

/// Drop terminal escape sequences and control characters other than
/// newline, carriage return and tab.
pub fn sanitize_output(text: &str) -> String {
    ansi_escape()
        .replace_all(text, "")
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Styling for one line of stderr.
pub fn stderr_style(text: &str) -> OutputStyle {
    let head = text.trim_start();
    let is_warning = head
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("warning"));
    if is_warning {
        OutputStyle::Warning
    } else {
        OutputStyle::Error
    }
}

/// Incremental UTF-8 decoding that never splits a character across chunks.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let keep_from = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // Incomplete sequence at the end: hold it for the next chunk.
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.pending.len(),
        };
        let rest = self.pending.split_off(keep_from);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = rest;
        text
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

/// Splits text into complete lines, holding a trailing partial line until
/// the rest of it arrives.
#[derive(Debug, Default)]
pub struct LineCarry {
    partial: String,
}

impl LineCarry {
    /// Complete lines (with their terminators) now available.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.partial.push_str(text);
        let Some(last_newline) = self.partial.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.partial.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial, rest);
        complete.split_inclusive('\n').map(str::to_owned).collect()
    }

    /// Whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        (!self.partial.is_empty()).then(|| std::mem::take(&mut self.partial))
    }
}

/// Forward a worker stream. Stdout goes out as read; stderr goes out line by
/// line, since each line is styled on its own.
async fn relay<R>(reader: Option<R>, pid: u32, stream: Stream, tx: mpsc::UnboundedSender<WorkerMessage>)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut buf = vec![0u8; READ_CHUNK];
    let mut carry = Utf8Carry::default();
    let mut lines = (stream == Stream::Stderr).then(LineCarry::default);

    let send = |text: String| {
        if !text.is_empty() {
            let _ = tx.send(WorkerMessage::Output { pid, stream, text });
        }
    };
    let mut forward = |text: String| {
        let text = sanitize_output(&text);
        match lines.as_mut() {
            Some(lines) => {
                for line in lines.push(&text) {
                    send(line);
                }
            }
            None => send(text),
        }
    };

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => forward(carry.decode(&buf[..n])),
            Err(e) => {
                debug!(pid, ?stream, error = %e, "output stream closed with error");
                break;
            }
        }
    }
    forward(carry.finish());
    if let Some(rest) = lines.as_mut().and_then(LineCarry::finish) {
        send(rest);
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Relay a started worker's output and report its exit on `tx`.
pub async fn pump_worker(mut child: Child, pid: u32, tx: mpsc::UnboundedSender<WorkerMessage>) {
    let stdout = tokio::spawn(relay(child.stdout.take(), pid, Stream::Stdout, tx.clone()));
    let stderr = tokio::spawn(relay(child.stderr.take(), pid, Stream::Stderr, tx.clone()));

    let status = child.wait().await;

    // A grandchild may hold the pipes open; do not wait for it forever.
    for reader in [stdout, stderr] {
        let abort = reader.abort_handle();
        if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, reader).await.is_err() {
            warn!(pid, "output still open after exit; dropping the rest");
            abort.abort();
        }
    }

    let message = match status {
        Ok(status) => WorkerMessage::Exited(ExitRecord {
            pid,
            exit_code: status.code(),
            signal: exit_signal(&status),
        }),
        Err(e) => WorkerMessage::WaitFailed {
            pid,
            error: e.to_string(),
        },
    };
    let _ = tx.send(message);
}
