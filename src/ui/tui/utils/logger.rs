use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Records kept for the logs view, older ones are dropped.
const LOG_CAPACITY: usize = 1000;

#[derive(PartialEq, PartialOrd, Clone, Debug, Eq)]
pub struct TuiLogLine {
    level: Level,
    time: String,
    target: String,
    body: String,
}

impl TuiLogLine {
    pub fn to_line(&self) -> Line<'static> {
        fn fg_for_level(lvl: Level) -> Color {
            match lvl {
                Level::Error => Color::Red,
                Level::Warn => Color::Yellow,
                Level::Info => Color::Green,
                Level::Debug => Color::Magenta,
                Level::Trace => Color::LightBlue,
            }
        }

        Line::from(vec![
            Span::raw(format!("[{} ", self.time)),
            Span::styled(
                self.level.to_string(),
                Style::default().fg(fg_for_level(self.level)),
            ),
            Span::raw(format!(" {}] {}", self.target, self.body)),
        ])
    }
}

/// Shared storage of captured log records.
#[derive(Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<TuiLogLine>>>,
}

impl LogBuffer {
    fn push(&self, line: TuiLogLine) {
        let mut lines = self.lines.lock().unwrap();
        if lines.len() == LOG_CAPACITY {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Last `n` records, oldest first.
    pub fn tail(&self, n: usize) -> Vec<TuiLogLine> {
        let lines = self.lines.lock().unwrap();
        lines.iter().skip(lines.len().saturating_sub(n)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Logger used while the terminal belongs to the application, records go to the logs view.
pub struct TuiLogger {
    inner: env_logger::Logger,
    buffer: LogBuffer,
}

impl Log for TuiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.matches(record) {
            return;
        }

        let ts = Local::now();
        let log = TuiLogLine {
            level: record.level(),
            time: ts.format("%H:%M:%S%.3f").to_string(),
            target: record.target().to_string(),
            body: format!("{}", record.args()),
        };

        self.buffer.push(log);
    }

    fn flush(&self) {}
}

impl TuiLogger {
    pub fn new(buffer: LogBuffer) -> Self {
        Self {
            inner: env_logger::Logger::from_env(env_logger::Env::default().default_filter_or("info")),
            buffer,
        }
    }

    pub fn filter(&self) -> LevelFilter {
        self.inner.filter()
    }
}
