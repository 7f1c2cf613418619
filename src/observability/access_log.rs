//! Access log: one line per completed request.
//!
//! # Format
//! ```text
//! <addr> [<dd/Mon/yyyy hh:mm:ss ±zzzz>] <method> "<uri>" <status> <bytes> "<referer>" "<user-agent>"
//! ```
//! String fields are written as received, embedded quotes included.

use std::borrow::Cow;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::thread;

use chrono::{DateTime, FixedOffset};
use tokio::sync::mpsc;

/// chrono pattern for the bracketed timestamp.
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y %H:%M:%S %z";

/// One access log line.
#[derive(Debug, Clone)]
pub struct AccessLogEntry<'a> {
    /// Client host, already stripped of port and brackets.
    pub remote_host: &'a str,
    /// When the response completed.
    pub timestamp: DateTime<FixedOffset>,
    pub method: &'a str,
    pub uri: &'a str,
    pub status: u16,
    pub bytes: u64,
    pub referer: Cow<'a, str>,
    pub user_agent: Cow<'a, str>,
}

impl fmt::Display for AccessLogEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} \"{}\" {} {} \"{}\" \"{}\"",
            self.remote_host,
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.method,
            self.uri,
            self.status,
            self.bytes,
            self.referer,
            self.user_agent,
        )
    }
}

/// Reduces a peer address to its host: cut at the last `:` (unless it
/// leads), then trim IPv6 brackets.
pub fn normalize_remote_addr(addr: &str) -> &str {
    let host = match addr.rfind(':') {
        Some(idx) if idx > 0 => &addr[..idx],
        _ => addr,
    };
    host.trim_matches(|c| c == '[' || c == ']')
}

/// Process-wide append-only destination for access log lines.
///
/// Request tasks only format their line and queue it. A dedicated writer
/// thread owns the file and writes each line with a single `write_all`, so
/// lines never interleave and a slow disk never blocks the runtime.
/// Dropping the sink drains the queue and joins the writer.
pub struct AccessLogSink {
    lines: Option<mpsc::UnboundedSender<String>>,
    writer: Option<thread::JoinHandle<()>>,
    destination: String,
}

impl AccessLogSink {
    /// Open `path` for appending, creating it if needed. Falls back to
    /// stdout if the file cannot be opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                tracing::info!(path = %path.display(), "Access log opened");
                Self::from_writer(file, path.display().to_string())
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Cannot open access log, writing to stdout"
                );
                Self::stdout()
            }
        }
    }

    pub fn stdout() -> io::Result<Self> {
        Self::from_writer(io::stdout(), "stdout")
    }

    /// Start the writer thread for `writer`.
    pub fn from_writer(
        writer: impl Write + Send + 'static,
        destination: impl Into<String>,
    ) -> io::Result<Self> {
        let destination = destination.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = thread::Builder::new().name("access-log".to_string()).spawn({
            let destination = destination.clone();
            move || write_lines(writer, rx, &destination)
        })?;
        Ok(Self {
            lines: Some(tx),
            writer: Some(handle),
            destination,
        })
    }

    /// Where lines go: a file path or `stdout`.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn append(&self, entry: &AccessLogEntry<'_>) {
        let line = format!("{}\n", entry);
        let queued = match &self.lines {
            Some(lines) => lines.send(line).is_ok(),
            None => false,
        };
        if !queued {
            tracing::warn!(destination = %self.destination, "Access log writer is gone, line dropped");
        }
    }
}

fn write_lines(
    mut writer: impl Write,
    mut lines: mpsc::UnboundedReceiver<String>,
    destination: &str,
) {
    while let Some(line) = lines.blocking_recv() {
        if let Err(err) = writer.write_all(line.as_bytes()).and_then(|()| writer.flush()) {
            tracing::warn!(destination, error = %err, "Access log write failed");
        }
    }
}

impl Drop for AccessLogSink {
    fn drop(&mut self) {
        // Closing the queue lets the writer finish what is pending and exit.
        self.lines.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::warn!(destination = %self.destination, "Access log writer panicked");
            }
        }
    }
}

impl fmt::Debug for AccessLogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLogSink")
            .field("destination", &self.destination)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    /// A writer whose contents stay readable after it is handed to a sink.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn entry() -> AccessLogEntry<'static> {
        AccessLogEntry {
            remote_host: "203.0.113.5",
            timestamp: FixedOffset::east_opt(2 * 3600)
                .unwrap()
                .with_ymd_and_hms(2024, 3, 7, 9, 5, 1)
                .unwrap(),
            method: "GET",
            uri: "/index.html?x=\"y\"",
            status: 200,
            bytes: 1234,
            referer: Cow::Borrowed(""),
            user_agent: Cow::Borrowed("curl/8.0"),
        }
    }

    #[test]
    fn line_format() {
        assert_eq!(
            entry().to_string(),
            "203.0.113.5 [07/Mar/2024 09:05:01 +0200] GET \"/index.html?x=\"y\"\" 200 1234 \"\" \"curl/8.0\""
        );
    }

    #[test]
    fn remote_addr_normalization() {
        assert_eq!(normalize_remote_addr("203.0.113.5:51000"), "203.0.113.5");
        assert_eq!(normalize_remote_addr("[::1]:9999"), "::1");
        assert_eq!(normalize_remote_addr("localhost"), "localhost");
        assert_eq!(normalize_remote_addr(":80"), ":80");
    }

    #[test]
    fn append_writes_whole_lines() {
        let buf = SharedBuf::default();
        let sink = AccessLogSink::from_writer(buf.clone(), "memory").unwrap();
        sink.append(&entry());
        sink.append(&entry());
        drop(sink);

        let lines = buf.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.starts_with("203.0.113.5 [")));
    }

    #[test]
    fn concurrent_appends_do_not_interleave() {
        let buf = SharedBuf::default();
        let sink = Arc::new(AccessLogSink::from_writer(buf.clone(), "memory").unwrap());
        let expected = entry().to_string();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        sink.append(&entry());
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        drop(sink);

        let lines = buf.lines();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|l| *l == expected));
    }

    #[test]
    fn unopenable_file_falls_back_to_stdout() {
        let sink = AccessLogSink::open(Path::new("/definitely/not/here/access.log")).unwrap();
        assert_eq!(sink.destination(), "stdout");
    }

    #[test]
    fn file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        std::fs::write(&path, "earlier line\n").unwrap();

        let sink = AccessLogSink::open(&path).unwrap();
        sink.append(&entry());
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier line\n203.0.113.5 ["));
    }

    #[test]
    fn append_does_not_wait_for_the_writer() {
        struct Gated {
            gate: Arc<Mutex<()>>,
            out: SharedBuf,
        }

        impl Write for Gated {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                let _open = self.gate.lock().unwrap();
                self.out.write(buf)
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let gate = Arc::new(Mutex::new(()));
        let buf = SharedBuf::default();
        let held = gate.lock().unwrap();
        let writer = Gated {
            gate: Arc::clone(&gate),
            out: buf.clone(),
        };
        let sink = AccessLogSink::from_writer(writer, "gated").unwrap();

        sink.append(&entry());
        sink.append(&entry());
        assert!(buf.lines().is_empty());

        drop(held);
        drop(sink);
        assert_eq!(buf.lines().len(), 2);
    }
}
