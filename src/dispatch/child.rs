//! Local child worker processes
//!
//! The process and hybrid strategies re-execute the wordfreq binary in
//! `map-worker` mode. The parent writes framed requests to the child's stdin
//! and reads framed replies from its stdout; the child logs to stderr.

use crate::count::{count_words, merge_all, CountMapping};
use crate::distributed::protocol::*;
use crate::error::WordFreqError;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::ffi::OsString;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// How to start a child worker
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerCommand {
    /// Run `program` with exactly `args` (plus `--threads N`)
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// A wordfreq binary started in map-worker mode
    pub fn for_binary(program: impl Into<PathBuf>) -> Self {
        Self::new(program).arg("--mode").arg("map-worker")
    }

    /// The running executable started in map-worker mode
    pub fn current_exe() -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to get current executable path")?;
        Ok(Self::for_binary(exe))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

/// Handle to one running child worker
pub struct ChildWorker {
    id: usize,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl ChildWorker {
    /// Start a child with a `threads`-wide counting pool
    pub fn spawn(id: usize, command: &WorkerCommand, threads: usize) -> Result<Self> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .arg("--threads")
            .arg(threads.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| {
                format!("Failed to spawn worker process {}", command.program.display())
            })?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WordFreqError::worker_failed(id.to_string(), "stdout not captured"))?;

        tracing::debug!(worker = id, pid = child.id(), threads, "worker process started");

        Ok(Self {
            id,
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Count one chunk in the child
    pub fn map_chunk(&mut self, text: String) -> Result<CountMapping> {
        let worker = self.describe();
        let stdin = self.stdin_for(&worker)?;
        write_message_blocking(stdin, &Message::MapChunk { text })
            .map_err(|e| WordFreqError::worker_failed(worker.clone(), format!("{:#}", e)))?;
        self.read_result(worker)
    }

    /// Count a block of chunks on the child's thread pool
    ///
    /// The block is streamed one frame per chunk, so its total size is not
    /// bounded by the frame limit.
    pub fn map_block(&mut self, texts: Vec<String>) -> Result<CountMapping> {
        let worker = self.describe();
        let stdin = self.stdin_for(&worker)?;
        write_block(stdin, texts, MAX_FRAME_LEN)
            .map_err(|e| WordFreqError::worker_failed(worker.clone(), format!("{:#}", e)))?;
        self.read_result(worker)
    }

    fn describe(&self) -> String {
        format!("process {} (pid {})", self.id, self.child.id())
    }

    fn stdin_for(&mut self, worker: &str) -> Result<&mut ChildStdin> {
        self.stdin
            .as_mut()
            .ok_or_else(|| WordFreqError::worker_failed(worker, "stdin closed").into())
    }

    fn read_result(&mut self, worker: String) -> Result<CountMapping> {
        let reply = read_message_blocking(&mut self.stdout)
            .map_err(|e| WordFreqError::worker_failed(worker.clone(), format!("{:#}", e)))?;

        match reply {
            Some(Message::MapResult { counts }) => Ok(counts),
            Some(Message::Error { error, .. }) => Err(WordFreqError::worker_failed(worker, error).into()),
            Some(other) => Err(WordFreqError::Protocol(format!("unexpected {} from {}", other.kind(), worker)).into()),
            None => Err(WordFreqError::worker_failed(worker, "exited before replying").into()),
        }
    }

    /// Close the child's input and wait for it to exit
    pub fn shutdown(mut self) -> Result<()> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .with_context(|| format!("Failed to wait for worker process {}", self.id))?;

        tracing::debug!(worker = self.id, %status, "worker process exited");
        if !status.success() {
            anyhow::bail!("worker process {} exited with {}", self.id, status);
        }
        Ok(())
    }
}

impl Drop for ChildWorker {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Stream a block to a child: a `MAP_BLOCK` header, then one `MAP_CHUNK`
/// frame per text
pub(crate) fn write_block<W: Write>(writer: &mut W, texts: Vec<String>, max_frame_len: usize) -> Result<()> {
    write_frame_blocking(writer, &Message::MapBlock { units: texts.len() as u64 }, max_frame_len)?;
    for text in texts {
        write_frame_blocking(writer, &Message::MapChunk { text }, max_frame_len)?;
    }
    Ok(())
}

/// Gather the `units` chunk frames that follow a `MAP_BLOCK` header
fn read_block<R: Read>(reader: &mut R, units: u64, max_frame_len: usize) -> Result<Vec<String>> {
    let mut texts = Vec::new();
    for received in 0..units {
        match read_frame_blocking(reader, max_frame_len)? {
            Some(Message::MapChunk { text }) => texts.push(text),
            Some(other) => {
                return Err(WordFreqError::Protocol(format!(
                    "expected MAP_CHUNK {} of {} in a block, got {}",
                    received + 1,
                    units,
                    other.kind()
                ))
                .into())
            }
            None => {
                return Err(WordFreqError::Protocol(format!(
                    "input closed after {} of {} block chunks",
                    received, units
                ))
                .into())
            }
        }
    }
    Ok(texts)
}

/// Serve map requests from `reader` until it closes
///
/// This is the body of `--mode map-worker`. `MAP_BLOCK` requests are fanned
/// out over a rayon pool of `threads` threads; the per-chunk partials are
/// merged after the pool finishes.
pub fn run_child_worker<R: Read, W: Write>(reader: R, writer: W, threads: usize) -> Result<()> {
    serve_requests(reader, writer, threads, MAX_FRAME_LEN)
}

/// [`run_child_worker`] with an explicit limit on incoming frames
pub(crate) fn serve_requests<R: Read, W: Write>(
    reader: R,
    writer: W,
    threads: usize,
    max_frame_len: usize,
) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("map-{}", i))
        .build()
        .context("Failed to build worker thread pool")?;

    let node_id = format!("pid-{}", std::process::id());
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);

    while let Some(request) = read_frame_blocking(&mut reader, max_frame_len)? {
        let reply = match request {
            Message::MapChunk { text } => Message::MapResult {
                counts: count_words(&text),
            },
            Message::MapBlock { units } => {
                let texts = read_block(&mut reader, units, max_frame_len)?;
                let partials: Vec<CountMapping> =
                    pool.install(|| texts.par_iter().map(|text| count_words(text)).collect());
                Message::MapResult {
                    counts: merge_all(partials),
                }
            }
            Message::Health { .. } => Message::HealthOk {
                node_id: node_id.clone(),
                status: HEALTH_OK.to_string(),
            },
            other => Message::Error {
                node_id: node_id.clone(),
                error: format!("Unsupported request: {}", other.kind()),
            },
        };
        write_message_blocking(&mut writer, &reply)?;
    }

    Ok(())
}
