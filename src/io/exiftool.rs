//! ExifTool process protocol (§4.H, §6): a long-lived `exiftool -stay_open
//! True -@ -` process, batched through argfile-style stdin writes, with
//! per-file/per-batch timeouts and stderr attribution for split-and-retry.
//!
//! Recoverable failures here (timeouts, tool errors, malformed output) are
//! `Result<_, String>`; a broken pipe to an already-dead child process is
//! the one condition treated as a programming-level invariant violation.

use std::{
  io::{BufRead, BufReader, Write},
  path::{Path, PathBuf},
  process::{Child, ChildStdin, Command, Stdio},
  sync::mpsc::{self, Receiver, RecvTimeoutError},
  thread,
  time::{Duration, Instant},
};

/// One file's worth of `-TAG=VALUE` assignments to write via ExifTool.
#[derive(Clone, Debug)]
pub struct ExifWriteJob {
  pub path: PathBuf,
  pub tags: Vec<(String, String)>,
}

impl ExifWriteJob {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), tags: Vec::new() }
  }

  pub fn with_tag(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
    self.tags.push((tag.into(), value.into()));
    self
  }

  /// One argfile line per assignment, `-F` (fix minor) first, ending with
  /// the target path and `-execute`. Per §4.H, `-common_args` is avoided
  /// when using `-@`.
  fn argfile_lines(&self) -> Vec<String> {
    let mut lines = vec!["-F".to_string(), "-overwrite_original".to_string()];
    for (tag, value) in &self.tags {
      lines.push(format!("-{tag}={value}"));
    }
    lines.push(self.path.to_string_lossy().into_owned());
    lines.push("-execute".to_string());
    lines
  }
}

pub struct BatchOutcome {
  /// One raw stdout block per job, in job order.
  pub per_job_stdout: Vec<String>,
  pub stderr:         String,
}

/// A persistent `exiftool -stay_open` process. Construct once per EXIF
/// writer worker (§5: EXIF batch state is owned per-worker, never shared).
pub struct ExifToolProcess {
  child:     Child,
  stdin:     ChildStdin,
  stdout_rx: Receiver<String>,
  stderr_rx: Receiver<String>,
}

impl ExifToolProcess {
  pub fn spawn() -> Result<Self, String> {
    let mut child = Command::new("exiftool")
      .args(["-stay_open", "True", "-@", "-"])
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|e| format!("ExternalToolFailed: failed to spawn exiftool: {e}"))?;

    let stdin = child.stdin.take().expect("piped stdin");
    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    let (stdout_tx, stdout_rx) = mpsc::channel();
    thread::spawn(move || {
      let reader = BufReader::new(stdout);
      for line in reader.lines().map_while(Result::ok) {
        if stdout_tx.send(line).is_err() {
          break;
        }
      }
    });

    let (stderr_tx, stderr_rx) = mpsc::channel();
    thread::spawn(move || {
      let reader = BufReader::new(stderr);
      for line in reader.lines().map_while(Result::ok) {
        if stderr_tx.send(line).is_err() {
          break;
        }
      }
    });

    Ok(Self { child, stdin, stdout_rx, stderr_rx })
  }

  /// Writes every job's argfile lines, then reads back one `{ready}`-
  /// terminated stdout block per job. Bounded by `per_file_timeout` between
  /// consecutive ready markers and `per_batch_timeout` overall (§5).
  /// Returns `Err` with `ExternalToolTimeout` if either bound is exceeded;
  /// the caller (stage 5) is responsible for splitting the batch on error.
  pub fn execute_batch(
    &mut self,
    jobs: &[ExifWriteJob],
    per_file_timeout: Duration,
    per_batch_timeout: Duration,
  ) -> Result<BatchOutcome, String> {
    for job in jobs {
      for line in job.argfile_lines() {
        writeln!(self.stdin, "{line}").map_err(|e| format!("ExternalToolFailed: {e}"))?;
      }
    }
    self.stdin.flush().map_err(|e| format!("ExternalToolFailed: {e}"))?;

    let batch_deadline = Instant::now() + per_batch_timeout;
    let mut per_job_stdout = Vec::with_capacity(jobs.len());
    let mut current_block = String::new();

    for _ in jobs {
      loop {
        let remaining_batch = batch_deadline.saturating_duration_since(Instant::now());
        let wait = remaining_batch.min(per_file_timeout);
        if wait.is_zero() {
          return Err("ExternalToolTimeout: exiftool batch exceeded its deadline".to_string());
        }

        match self.stdout_rx.recv_timeout(wait) {
          Ok(line) if is_ready_marker(&line) => break,
          Ok(line) => {
            current_block.push_str(&line);
            current_block.push('\n');
          }
          Err(RecvTimeoutError::Timeout) => {
            return Err("ExternalToolTimeout: exiftool produced no output in time".to_string());
          }
          Err(RecvTimeoutError::Disconnected) => {
            return Err("ExternalToolFailed: exiftool process exited unexpectedly".to_string());
          }
        }
      }
      per_job_stdout.push(std::mem::take(&mut current_block));
    }

    let mut stderr = String::new();
    while let Ok(line) = self.stderr_rx.try_recv() {
      stderr.push_str(&line);
      stderr.push('\n');
    }

    Ok(BatchOutcome { per_job_stdout, stderr })
  }

  pub fn shutdown(mut self) {
    let _ = writeln!(self.stdin, "-stay_open");
    let _ = writeln!(self.stdin, "False");
    let _ = self.stdin.flush();
    let _ = self.child.wait();
  }
}

fn is_ready_marker(line: &str) -> bool {
  let trimmed = line.trim();
  trimmed == "{ready}" || (trimmed.starts_with("{ready") && trimmed.ends_with('}'))
}

/// Splits a failed batch into paths explicitly named in `stderr` ("offender
/// paths", retried per-file) and the remainder (retried as a smaller batch),
/// per §4.H's split-and-retry policy.
pub fn partition_offenders<'a>(
  jobs: &'a [ExifWriteJob],
  stderr: &str,
) -> (Vec<&'a ExifWriteJob>, Vec<&'a ExifWriteJob>) {
  jobs.iter().partition(|job| {
    let name = job.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    !name.is_empty() && stderr.contains(&name)
  })
}

/// One-shot (non-`stay_open`) invocation for ad-hoc reads, e.g. the
/// `exiftool_exif` date resolver (§4.D item 3). Grounded in the same
/// `Command`-invocation shape as a persistent batch, minus the protocol.
pub fn run_exiftool_oneshot<I, S>(args: I) -> Result<Vec<u8>, String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<std::ffi::OsStr>,
{
  let output = Command::new("exiftool")
    .args(args)
    .output()
    .map_err(|e| format!("ExternalToolFailed: failed to run exiftool: {e}"))?;

  if !output.status.success() {
    return Err(format!(
      "ExternalToolFailed: exiftool exited with {}: {}",
      output.status,
      String::from_utf8_lossy(&output.stderr)
    ));
  }

  Ok(output.stdout)
}

/// Reads every supported date tag for `path` via ExifTool JSON output,
/// returning raw tag name → value pairs for the resolver to parse.
pub fn read_date_tags(path: &Path) -> Result<serde_json::Value, String> {
  let stdout = run_exiftool_oneshot([
    "-json",
    "-DateTimeOriginal",
    "-DateTime",
    "-CreateDate",
    "-DateCreated",
    "-CreationDate",
    "-MediaCreateDate",
    "-TrackCreateDate",
    "-EncodedDate",
    "-MetadataDate",
    "-ModifyDate",
    path.to_str().ok_or("PathResolution: non-UTF8 path")?,
  ])?;

  let mut parsed: Vec<serde_json::Value> =
    serde_json::from_slice(&stdout).map_err(|e| format!("ExifReadFailed: {e}"))?;
  parsed.pop().ok_or_else(|| "ExifReadFailed: empty exiftool response".to_string())
}
