//! JSON-lines occurrence feed.
//!
//! Each non-blank line is one occurrence:
//!
//! ```text
//! {"shard": 0, "event": "MessageCreated", "payload": {...}}
//! ```

use serde::Deserialize;
use shardcast_core::{EventHub, ShardId};
use std::io::BufRead;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One line of the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedLine {
    pub shard: u32,
    pub event: String,
    /// Missing payloads decode as `null`.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// What happened to the lines of one feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub submitted: u64,
    pub malformed: u64,
    pub rejected: u64,
}

/// Parse one line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<FeedLine>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Where feed lines come from.
pub enum FeedSource {
    /// An async reader, used for files.
    Reader(Lines<Box<dyn AsyncBufRead + Unpin + Send>>),
    /// Lines forwarded from a dedicated reader thread.
    Thread(mpsc::UnboundedReceiver<std::io::Result<String>>),
}

impl FeedSource {
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let boxed: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(reader);
        FeedSource::Reader(boxed.lines())
    }

    /// Read `reader` on its own OS thread and forward each line.
    ///
    /// The thread is detached: a read that blocks forever does not keep the
    /// runtime from shutting down.
    pub fn spawn_line_reader<R>(reader: R) -> std::io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("feed-reader".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.send(line).is_err() || failed {
                        break;
                    }
                }
            })?;
        Ok(FeedSource::Thread(rx))
    }

    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        match self {
            FeedSource::Reader(lines) => lines.next_line().await,
            FeedSource::Thread(rx) => rx.recv().await.transpose(),
        }
    }
}

/// Open `source` for reading. `-` means stdin, read on a dedicated thread.
pub async fn open(source: &str) -> std::io::Result<FeedSource> {
    if source == "-" {
        return FeedSource::spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    }
    let file = tokio::fs::File::open(Path::new(source)).await?;
    Ok(FeedSource::from_reader(BufReader::new(file)))
}

/// Hand every line of `source` to `hub` until end of input.
///
/// Malformed lines and lines for unknown shards are logged and skipped.
/// `stats` is updated as lines are processed, so it stays meaningful if this
/// future is dropped part-way.
pub async fn feed(
    mut source: FeedSource,
    hub: &EventHub,
    stats: &mut FeedStats,
) -> std::io::Result<()> {
    let mut line_no: u64 = 0;

    while let Some(line) = source.next_line().await? {
        line_no += 1;

        let parsed = match parse_line(&line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping malformed feed line");
                stats.malformed += 1;
                continue;
            }
        };

        let shard = ShardId(parsed.shard);
        match hub.submit_raw(shard, parsed.event, parsed.payload) {
            Ok(()) => {
                debug!(line = line_no, %shard, "Submitted occurrence");
                stats.submitted += 1;
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping feed line");
                stats.rejected += 1;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shardcast_core::DispatchConfig;
    use shardcast_core::events::UnknownEvent;
    use std::sync::Arc;
    use tracing_test::traced_test;

    #[test]
    fn test_parse_line() {
        assert!(parse_line("   ").unwrap().is_none());

        let line = parse_line(r#"{"shard": 1, "event": "Ready"}"#).unwrap().unwrap();
        assert_eq!(line.shard, 1);
        assert_eq!(line.event, "Ready");
        assert!(line.payload.is_null());

        assert!(parse_line("{not json").is_err());
        assert!(parse_line(r#"{"event": "Ready"}"#).is_err());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_feed_skips_bad_lines() {
        let hub = EventHub::new(DispatchConfig::new(2));
        let unknown = Arc::new(Mutex::new(Vec::new()));

        let sink = unknown.clone();
        hub.registry().unknown_event().subscribe(move |e: Arc<UnknownEvent>| {
            sink.lock().push((e.name.clone(), e.shard_id));
            async { Ok(()) }
        });

        let input = concat!(
            "{\"shard\": 0, \"event\": \"SocketOpened\"}\n",
            "\n",
            "garbage\n",
            "{\"shard\": 5, \"event\": \"SocketOpened\"}\n",
            "{\"shard\": 1, \"event\": \"THREAD_CREATE\", \"payload\": {\"id\": \"1\"}}\n",
        );

        let mut stats = FeedStats::default();
        feed(FeedSource::from_reader(input.as_bytes()), &hub, &mut stats)
            .await
            .unwrap();
        hub.shutdown().await;

        assert_eq!(
            stats,
            FeedStats {
                submitted: 2,
                malformed: 1,
                rejected: 1
            }
        );
        assert_eq!(
            *unknown.lock(),
            vec![("THREAD_CREATE".to_string(), Some(ShardId(1)))]
        );
        assert!(logs_contain("Skipping malformed feed line"));
        assert!(logs_contain("shard:5 is not managed by this hub"));
    }

    #[tokio::test]
    async fn test_thread_reader_forwards_every_line() {
        let hub = EventHub::new(DispatchConfig::new(1));
        let reader = std::io::Cursor::new(
            "{\"shard\": 0, \"event\": \"SocketOpened\"}\n\n{\"shard\": 0, \"event\": \"Resumed\"}\n",
        );

        let mut stats = FeedStats::default();
        let source = FeedSource::spawn_line_reader(reader).unwrap();
        feed(source, &hub, &mut stats).await.unwrap();
        hub.shutdown().await;

        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.malformed, 0);
    }

    #[tokio::test]
    async fn test_thread_reader_does_not_block_cancellation() {
        let hub = EventHub::new(DispatchConfig::new(1));
        // A reader that never produces a line, like an idle terminal.
        let (_keep_open, pipe) = std::sync::mpsc::channel::<Vec<u8>>();
        let reader = std::io::BufReader::new(BlockingReader(pipe));

        let mut stats = FeedStats::default();
        let source = FeedSource::spawn_line_reader(reader).unwrap();
        let fed = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            feed(source, &hub, &mut stats),
        )
        .await;

        assert!(fed.is_err());
        assert_eq!(stats, FeedStats::default());
        hub.shutdown().await;
    }

    /// Blocks in `read` until bytes arrive on the channel.
    struct BlockingReader(std::sync::mpsc::Receiver<Vec<u8>>);

    impl std::io::Read for BlockingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.recv() {
                Ok(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }
}
