//! Cross-thread log sink
//!
//! Socket loops run on their own threads, but anything that displays their
//! output usually has exactly one thread allowed to touch it. A
//! [`ChannelLogSink`] can be cloned into any thread; the paired
//! [`LogConsole`] is drained by the single consumer.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::collections::VecDeque;
use std::time::Duration;

/// Lines a controller console keeps
pub const DEFAULT_MAX_LINES: usize = 200;

/// Anything that accepts log lines from arbitrary threads
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// Producer half; never blocks
#[derive(Debug, Clone)]
pub struct ChannelLogSink {
    tx: Sender<String>,
}

impl LogSink for ChannelLogSink {
    fn log(&self, line: &str) {
        // Consumer gone means nobody is displaying; nothing to do.
        let _ = self.tx.send(line.to_string());
    }
}

/// Single-consumer side holding the most recent `max_lines` lines
#[derive(Debug)]
pub struct LogConsole {
    rx: Receiver<String>,
    lines: VecDeque<String>,
    max_lines: usize,
}

impl LogConsole {
    /// Create a sink/console pair
    pub fn new(max_lines: usize) -> (ChannelLogSink, LogConsole) {
        let (tx, rx) = channel::unbounded();
        let console = LogConsole {
            rx,
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
        };
        (ChannelLogSink { tx }, console)
    }

    /// Move every pending line into the console without blocking
    ///
    /// Returns the number of lines received.
    pub fn pump(&mut self) -> usize {
        let mut received = 0;
        while let Ok(line) = self.rx.try_recv() {
            self.push(line);
            received += 1;
        }
        received
    }

    /// Wait up to `timeout` for at least one line, then drain the rest
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(line) => {
                self.push(line);
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn push(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Newline-joined contents, oldest first
    pub fn text(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
