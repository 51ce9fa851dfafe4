//! Backend output streams: bounded scrollback buffer and the reader threads feeding it.

use crate::session::listing::expand_tabs;
use crate::session::Session;
use log::{debug, warn};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use timeout_readwrite::TimeoutReader;

pub const SCROLLBACK_HIGH_MARK: usize = 8 * 1024;
pub const SCROLLBACK_LOW_MARK: usize = 4 * 1024;
pub const SILENCE_WINDOW: Duration = Duration::from_millis(500);

/// How far back from the end the cursor lands after a truncation.
const TRUNCATE_CURSOR_BACKOFF: usize = 256;
/// Readers wake up this often to check their stop flag.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Scrollback text of the application.
///
/// Once the length exceeds the high mark, the oldest `low_mark` characters are dropped in one go.
#[derive(Debug)]
pub struct OutputBuffer {
    buf: Vec<char>,
    /// Start of the last complete line, the view keeps it visible.
    cursor: usize,
    high_mark: usize,
    low_mark: usize,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(SCROLLBACK_HIGH_MARK, SCROLLBACK_LOW_MARK)
    }
}

impl OutputBuffer {
    pub fn new(high_mark: usize, low_mark: usize) -> Self {
        Self {
            buf: vec![],
            cursor: 0,
            high_mark,
            low_mark: low_mark.min(high_mark),
        }
    }

    pub fn append(&mut self, text: &str) {
        self.buf.extend(expand_tabs(text).chars());

        if self.buf.len() > self.high_mark {
            self.buf.drain(..self.low_mark);
            self.cursor = self.buf.len().saturating_sub(TRUNCATE_CURSOR_BACKOFF);
        }

        let end = self.buf.len().saturating_sub(1);
        let start = self.cursor.min(end);
        if let Some(pos) = self.buf[start..end].iter().rposition(|&c| c == '\n') {
            self.cursor = start + pos + 1;
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn text(&self) -> String {
        self.buf.iter().collect()
    }
}

impl fmt::Write for OutputBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub enum Admission {
    Accept,
    /// Limit exceeded right now, contains the accumulated amount of bytes.
    Silence(usize),
    Drop,
}

/// Output flow control. Once silenced it stays silenced.
pub struct RateLimiter {
    window: Duration,
    limit: usize,
    window_start: Instant,
    bucket: usize,
    silenced: bool,
}

impl RateLimiter {
    pub fn new(window: Duration, limit: usize, now: Instant) -> Self {
        Self {
            window,
            limit,
            window_start: now,
            bucket: 0,
            silenced: false,
        }
    }

    pub fn admit(&mut self, now: Instant, len: usize) -> Admission {
        if self.silenced {
            return Admission::Drop;
        }

        if now.duration_since(self.window_start) > self.window {
            self.window_start = now;
            self.bucket = 0;
        }

        self.bucket += len;
        if self.bucket > self.limit {
            self.silenced = true;
            let amount = self.bucket;
            self.bucket = 0;
            return Admission::Silence(amount);
        }
        Admission::Accept
    }

    pub fn is_silenced(&self) -> bool {
        self.silenced
    }
}

/// Stops a reader thread when dropped.
#[derive(Default)]
pub struct Handle {
    pub(crate) flag: Arc<AtomicBool>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug)]
pub enum StreamType {
    StdErr,
    StdOut,
}

impl StreamType {
    fn name(self) -> &'static str {
        match self {
            StreamType::StdErr => "stderr",
            StreamType::StdOut => "stdout",
        }
    }
}

/// Callback receiving the first stdout line.
pub type ReadySignalHandler = Box<dyn FnOnce(String) + Send>;

pub struct OutputStreamProcessor {
    r#type: StreamType,
}

impl OutputStreamProcessor {
    pub fn new(r#type: StreamType) -> Self {
        Self { r#type }
    }

    /// Start reading `stream` into the session scrollback.
    ///
    /// For stdout the first line goes to `on_ready` and is not displayed, further lines pass
    /// through the rate limiter.
    pub fn run<R>(self, stream: R, session: Session, on_ready: Option<ReadySignalHandler>) -> Handle
    where
        R: Read + AsRawFd + Send + 'static,
    {
        let handle = Handle::default();
        let flag = handle.flag.clone();
        let stream = TimeoutReader::new(stream, READ_TIMEOUT);

        thread::spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut on_ready = on_ready;
            let mut first = matches!(self.r#type, StreamType::StdOut);
            let cfg = session.config();
            let mut limiter = RateLimiter::new(cfg.silence_window, cfg.low_mark, Instant::now());

            let mut line = Vec::new();
            loop {
                if flag.load(Ordering::SeqCst) {
                    return;
                }

                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e)
                        if e.kind() == io::ErrorKind::TimedOut
                            || e.kind() == io::ErrorKind::WouldBlock =>
                    {
                        continue
                    }
                    Err(e) => {
                        session.report(format!("Error reading {}: {e}", self.r#type.name()));
                        break;
                    }
                }

                // a partial line remains in the buffer until its end arrives
                if line.last() != Some(&b'\n') {
                    continue;
                }
                let text = String::from_utf8_lossy(&line)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                line.clear();

                if first {
                    first = false;
                    if let Some(on_ready) = on_ready.take() {
                        on_ready(text);
                    }
                    continue;
                }

                match self.r#type {
                    StreamType::StdErr => session.write_output(&format!("{text}\n")),
                    StreamType::StdOut => match limiter.admit(Instant::now(), text.len()) {
                        Admission::Accept => session.write_output(&format!("{text}\n")),
                        Admission::Silence(amount) => {
                            warn!(target: "output", "debugee output silenced");
                            session.write_output(&format!(
                                "too much output in {}ms ({amount}), output silenced\n",
                                cfg.silence_window.as_millis()
                            ));
                        }
                        Admission::Drop => {}
                    },
                }
            }

            // trailing text without a line end
            if !line.is_empty() && !first {
                session.write_output(&format!("{}\n", String::from_utf8_lossy(&line)));
            }

            if first {
                session.connection_failed("connection failed");
            }
            debug!(target: "output", "{} reader finished", self.r#type.name());
        });

        handle
    }
}

/// Both backend output readers. Dropping it stops them.
pub struct OutputMultiplexer {
    _stdout: Handle,
    _stderr: Option<Handle>,
}

impl OutputMultiplexer {
    pub fn start<O, E>(
        session: &Session,
        stdout: O,
        stderr: Option<E>,
        on_ready: ReadySignalHandler,
    ) -> Self
    where
        O: Read + AsRawFd + Send + 'static,
        E: Read + AsRawFd + Send + 'static,
    {
        let stdout = OutputStreamProcessor::new(StreamType::StdOut).run(
            stdout,
            session.clone(),
            Some(on_ready),
        );
        let stderr = stderr.map(|stderr| {
            OutputStreamProcessor::new(StreamType::StdErr).run(stderr, session.clone(), None)
        });
        Self {
            _stdout: stdout,
            _stderr: stderr,
        }
    }
}
