//! Shared integration-test harness for running `spawnstream` as a child
//! process and driving it over stdio or HTTP.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

/// Default timeout for reading a single line from the process.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A running `spawnstream run` process.
///
/// The child process is killed on drop via `kill_on_drop(true)`.
#[allow(clippy::missing_panics_doc)]
pub struct SpawnstreamProcess {
    child: Child,
    stdin: Option<tokio::process::ChildStdin>,
    reader: BufReader<tokio::process::ChildStdout>,
}

impl SpawnstreamProcess {
    /// Starts `spawnstream run --config <config> --quiet <extra...>`.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn(config_path: &Path, extra: &[&str]) -> Self {
        let bin = env!("CARGO_BIN_EXE_spawnstream");
        let mut child = Command::new(bin)
            .args([
                "--quiet",
                "run",
                "--config",
                config_path.to_str().expect("non-UTF-8 config path"),
            ])
            .args(extra)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn spawnstream");

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");

        Self {
            child,
            stdin: Some(stdin),
            reader: BufReader::new(stdout),
        }
    }

    /// Writes one stream entry line to stdin.
    #[allow(clippy::missing_panics_doc)]
    pub async fn send_line(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("failed to write to stdin");
        stdin.flush().await.expect("failed to flush stdin");
    }

    /// Reads one JSON line from stdout.
    ///
    /// Panics on EOF, I/O error, or if nothing arrives within `timeout`.
    #[allow(clippy::missing_panics_doc)]
    pub async fn read_message(&mut self, timeout: Duration) -> Value {
        let mut line = String::new();
        let result = tokio::time::timeout(timeout, async {
            loop {
                line.clear();
                let n = self
                    .reader
                    .read_line(&mut line)
                    .await
                    .expect("read_line I/O error");
                assert!(n > 0, "unexpected EOF from spawnstream");
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    return serde_json::from_str::<Value>(trimmed)
                        .unwrap_or_else(|e| panic!("invalid JSON on stdout: {e}\nline: {line}"));
                }
            }
        })
        .await;
        result.expect("timed out waiting for stdout line")
    }

    /// Closes stdin and waits for the process to exit on its own.
    #[allow(clippy::missing_panics_doc)]
    pub async fn finish(mut self) -> std::process::ExitStatus {
        drop(self.stdin.take());
        tokio::time::timeout(Duration::from_secs(5), self.child.wait())
            .await
            .expect("spawnstream did not exit after stdin closed")
            .expect("wait failed")
    }

    /// Kills the process.
    #[allow(clippy::missing_panics_doc)]
    pub async fn kill(mut self) {
        self.child.kill().await.expect("failed to kill child");
    }

    /// Runs a one-shot command (e.g. `version`) and returns its output.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> Output {
        std::process::Command::new(env!("CARGO_BIN_EXE_spawnstream"))
            .args(args)
            .output()
            .expect("failed to run spawnstream")
    }

    /// Returns the path to a test fixture.
    #[must_use]
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }
}

/// Reads a JSONL events file into values.
#[allow(clippy::missing_panics_doc)]
pub fn read_events(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .expect("events file missing")
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("invalid event line"))
        .collect()
}

/// Types of the events, in order.
#[must_use]
pub fn event_types(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e["type"].as_str().map(str::to_string))
        .collect()
}

/// A localhost port that was free a moment ago.
#[allow(clippy::missing_panics_doc)]
#[must_use]
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}
