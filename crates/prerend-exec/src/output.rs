use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    sync::mpsc::UnboundedSender,
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// Configuration for child process output logging.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    /// Max line length before truncation.
    pub max_line_length: usize,
    /// Log stdout at INFO level (false = DEBUG).
    pub stdout_info: bool,
    /// Log stderr at WARN level (false = DEBUG).
    pub stderr_warn: bool,
    /// Number of recent stderr lines kept for diagnostics.
    pub stderr_tail: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_line_length: 4096,
            stdout_info: true,
            stderr_warn: true,
            stderr_tail: 20,
        }
    }
}

/// Bounded buffer of the most recent stderr lines.
#[derive(Debug, Clone)]
pub struct StderrTail {
    lines: Arc<Mutex<VecDeque<String>>>,
    cap: usize,
}

impl StderrTail {
    pub fn new(cap: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(cap))),
            cap,
        }
    }

    pub fn push(&self, line: String) {
        if self.cap == 0 {
            return;
        }
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == self.cap {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn as_str(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Where a pumped line goes besides the log.
pub(crate) enum Sink {
    Discard,
    /// Feeds the readiness scan until the receiver goes away.
    Lines(UnboundedSender<String>),
    Tail(StderrTail),
}

/// Cut `line` to at most `max` bytes on a char boundary.
pub(crate) fn truncate(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

fn log_line(cfg: &LogConfig, stream: Stream, source: &str, line: &str) {
    let shown = truncate(line, cfg.max_line_length);
    let cut = shown.len() < line.len();
    match stream {
        Stream::Stdout if cfg.stdout_info => {
            info!(source, stream = stream.as_str(), truncated = cut, "{shown}")
        }
        Stream::Stderr if cfg.stderr_warn => {
            warn!(source, stream = stream.as_str(), truncated = cut, "{shown}")
        }
        _ => debug!(source, stream = stream.as_str(), truncated = cut, "{shown}"),
    }
}

/// Read `reader` line by line until EOF, logging each line and handing it to `sink`.
///
/// Bytes are decoded lossily so a stray invalid sequence never stops the pump.
pub(crate) fn spawn_pump<R>(
    reader: R,
    stream: Stream,
    source: String,
    cfg: LogConfig,
    mut sink: Sink,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(source = %source, stream = stream.as_str(), error = %e, "output read failed");
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            log_line(&cfg, stream, &source, line);

            match &sink {
                Sink::Discard => {}
                Sink::Lines(tx) => {
                    if tx.send(line.to_string()).is_err() {
                        sink = Sink::Discard;
                    }
                }
                Sink::Tail(tail) => tail.push(line.to_string()),
            }
        }
        debug!(source = %source, stream = stream.as_str(), "output closed");
    })
}
