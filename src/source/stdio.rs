//! Stdio event source.
//!
//! Reads one stream entry per line (NDJSON) from stdin and writes clear
//! requests to stdout as `{"op":"clear","path":...}` lines, so the process
//! can sit behind any pipe-based relay to the real stream store.

use std::sync::Mutex as StdMutex;

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    DEFAULT_CHANNEL_CAPACITY, EventSource, Result, SourceType, StreamEvent, Subscription,
};
use crate::config::schema::SourceSettings;
use crate::error::SourceError;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// NDJSON source over a reader/writer pair (stdin/stdout by default).
///
/// # Line handling
///
/// - Last line without `\n` is still delivered.
/// - Blank lines are skipped.
/// - Lines that are not valid JSON are delivered as JSON strings, so a bare
///   `3` and a quoted `"3"` behave the same.
/// - Lines longer than `max_message_size` are logged and skipped without
///   buffering more than the limit.
pub struct StdioSource {
    reader: StdMutex<Option<BoxedReader>>,
    writer: Mutex<BoxedWriter>,
    stream_path: String,
    max_message_size: usize,
}

impl StdioSource {
    /// Creates a source over the process's stdin and stdout.
    #[must_use]
    pub fn new(settings: &SourceSettings) -> Self {
        Self::from_io(
            Box::new(tokio::io::stdin()),
            Box::new(tokio::io::stdout()),
            settings,
        )
    }

    /// Creates a source over an arbitrary reader and writer.
    #[must_use]
    pub fn from_io(reader: BoxedReader, writer: BoxedWriter, settings: &SourceSettings) -> Self {
        Self {
            reader: StdMutex::new(Some(reader)),
            writer: Mutex::new(writer),
            stream_path: settings.stream_path.trim_matches('/').to_string(),
            max_message_size: settings.max_message_size,
        }
    }
}

impl std::fmt::Debug for StdioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioSource")
            .field("stream_path", &self.stream_path)
            .field("max_message_size", &self.max_message_size)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl EventSource for StdioSource {
    async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| SourceError::SubscribeFailed("stdin lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| SourceError::SubscribeFailed("stdin already subscribed".to_string()))?;

        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let token = cancel.child_token();
        let task_token = token.clone();
        let limit = self.max_message_size;

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line_no = 0u64;
            loop {
                let line = tokio::select! {
                    () = task_token.cancelled() => break,
                    line = read_bounded_line(&mut reader, limit) => line,
                };
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed; ending stream");
                        break;
                    }
                };
                line_no += 1;

                let text = match line {
                    Line::Complete(text) => text,
                    Line::Oversized(size) => {
                        let err = SourceError::MessageTooLarge { size, limit };
                        warn!(line = line_no, error = %err, "skipping entry");
                        continue;
                    }
                };
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let value = serde_json::from_str(trimmed)
                    .unwrap_or_else(|_| Value::String(trimmed.to_string()));
                let event = StreamEvent::keyed(line_no.to_string(), value);
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(rx, token))
    }

    async fn clear(&self) -> Result<()> {
        let request = json!({ "op": "clear", "path": self.stream_path });
        let serialized = serde_json::to_string(&request)?;
        let mut writer = self.writer.lock().await;
        let written = async {
            writer.write_all(serialized.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        drop(writer);
        written.map_err(|e| SourceError::ClearFailed(e.to_string()))
    }

    fn source_type(&self) -> SourceType {
        SourceType::Stdio
    }

    async fn close(&self) -> Result<()> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}

/// One line read under the size limit.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Complete(String),
    /// Total length of the skipped line, newline excluded.
    Oversized(usize),
}

/// Reads up to and including the next `\n`, copying at most `limit` bytes.
///
/// Returns `Ok(None)` at EOF. An over-long line is drained to its newline
/// and reported as [`Line::Oversized`] with its full length. Invalid UTF-8
/// is replaced lossily.
async fn read_bounded_line<R>(reader: &mut R, limit: usize) -> std::io::Result<Option<Line>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(limit.min(4096));
    let mut overflowed = false;
    let mut total = 0usize;
    let mut saw_any = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if !saw_any {
                return Ok(None);
            }
            break;
        }
        saw_any = true;

        let (chunk_len, found_newline) = available
            .iter()
            .position(|&b| b == b'\n')
            .map_or((available.len(), false), |pos| (pos, true));

        total = total.saturating_add(chunk_len);
        if !overflowed {
            let remaining = limit.saturating_sub(buf.len());
            if chunk_len > remaining {
                overflowed = true;
            } else {
                buf.extend_from_slice(&available[..chunk_len]);
            }
        }

        let consumed = if found_newline { chunk_len + 1 } else { chunk_len };
        reader.consume(consumed);
        if found_newline {
            break;
        }
    }

    if overflowed {
        return Ok(Some(Line::Oversized(total)));
    }
    Ok(Some(Line::Complete(String::from_utf8_lossy(&buf).into_owned())))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::AsyncReadExt;

    use super::*;

    fn settings(max_message_size: usize) -> SourceSettings {
        SourceSettings {
            max_message_size,
            ..SourceSettings::default()
        }
    }

    async fn collect(input: &'static str, limit: usize) -> Vec<StreamEvent> {
        let source = StdioSource::from_io(
            Box::new(input.as_bytes()),
            Box::new(tokio::io::sink()),
            &settings(limit),
        );
        let mut sub = source.subscribe(CancellationToken::new()).await.unwrap();
        let mut events = Vec::new();
        while let Some(event) = sub.next().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn reads_one_entry_per_line() {
        let events = collect("1\n\"2\"\n\n3", 1024).await;
        let values: Vec<_> = events.iter().map(|e| e.value.clone()).collect();
        assert_eq!(values, vec![json!(1), json!("2"), json!(3)]);
        assert_eq!(events[0].key.as_deref(), Some("1"));
        // blank line still advances the line counter
        assert_eq!(events[2].key.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn non_json_lines_become_strings() {
        let events = collect("phase two\n", 1024).await;
        assert_eq!(events[0].value, json!("phase two"));
    }

    #[tokio::test]
    async fn oversized_lines_are_skipped() {
        let events = collect("1234567890\n2\n", 4).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, json!(2));
    }

    #[tokio::test]
    async fn second_subscribe_fails() {
        let source = StdioSource::from_io(
            Box::new(&b""[..]),
            Box::new(tokio::io::sink()),
            &settings(16),
        );
        let _sub = source.subscribe(CancellationToken::new()).await.unwrap();
        assert!(source.subscribe(CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn clear_writes_request_line() {
        let (client, mut server) = tokio::io::duplex(1024);
        let source = StdioSource::from_io(
            Box::new(&b""[..]),
            Box::new(client),
            &SourceSettings {
                stream_path: "/jiggle/stream/".to_string(),
                ..SourceSettings::default()
            },
        );
        source.clear().await.unwrap();
        drop(source);

        let mut out = String::new();
        server.read_to_string(&mut out).await.unwrap();
        let parsed: Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(parsed, json!({"op": "clear", "path": "jiggle/stream"}));
    }

    #[tokio::test]
    async fn bounded_line_reader_reports_oversized_length() {
        let mut reader = BufReader::with_capacity(4, &b"1234567890\n2\n"[..]);
        assert_eq!(
            read_bounded_line(&mut reader, 4).await.unwrap(),
            Some(Line::Oversized(10))
        );
        assert_eq!(
            read_bounded_line(&mut reader, 4).await.unwrap(),
            Some(Line::Complete("2".to_string()))
        );
    }

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn clear_on_closed_stdout_fails() {
        let source = StdioSource::from_io(
            Box::new(&b""[..]),
            Box::new(BrokenPipe),
            &SourceSettings::default(),
        );
        let err = source.clear().await.unwrap_err();
        assert!(matches!(err, SourceError::ClearFailed(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn bounded_line_reader_handles_eof_without_newline() {
        let mut reader = BufReader::new(&b"abc"[..]);
        assert_eq!(
            read_bounded_line(&mut reader, 10).await.unwrap(),
            Some(Line::Complete("abc".to_string()))
        );
        assert_eq!(read_bounded_line(&mut reader, 10).await.unwrap(), None);
    }
}
