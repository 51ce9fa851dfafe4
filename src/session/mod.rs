//! Debugging session: connection to the debugger server, the current debugging position
//! and everything cached around it.
//!
//! All mutable state lives in a single [`State`] behind one mutex. The lock is held only
//! while state is mutated or copied, never across remote calls or file reads.

pub mod connector;
pub mod dispatch;
mod error;
pub mod input;
pub mod listing;
pub mod output;
pub mod panel;
pub mod refresh;

pub use error::Error;

use crate::client::{AsmFlavour, AsmInstruction, Client};
use crate::session::input::{CommandHistory, CommandLine};
use crate::session::listing::Listing;
use crate::session::output::{OutputBuffer, SCROLLBACK_HIGH_MARK, SCROLLBACK_LOW_MARK, SILENCE_WINDOW};
use crate::session::panel::Panels;
use log::{info, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fmt::Display;
use std::path::PathBuf;
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Session parameters fixed at startup.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Debugger server executable.
    pub backend: PathBuf,
    pub flavour: AsmFlavour,
    pub high_mark: usize,
    pub low_mark: usize,
    pub silence_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: PathBuf::from("dlv"),
            flavour: AsmFlavour::Intel,
            high_mark: SCROLLBACK_HIGH_MARK,
            low_mark: SCROLLBACK_LOW_MARK,
            silence_window: SILENCE_WINDOW,
        }
    }
}

/// Static program information loaded once after connect.
#[derive(Debug, Default, Clone)]
pub struct ProgramInfo {
    pub functions: Vec<String>,
    pub sources: Vec<String>,
    pub types: Vec<String>,
}

/// Instructions of the function containing the current location.
#[derive(Debug, Default, Clone)]
pub struct Disassembly {
    pub instructions: Vec<AsmInstruction>,
    pub recenter: bool,
}

impl Disassembly {
    pub fn clear(&mut self) {
        self.instructions.clear();
        self.recenter = true;
    }
}

pub struct State {
    /// `None` until connected, stays `None` if connection failed.
    pub client: Option<Arc<dyn Client>>,
    pub connection_failed: bool,
    /// A command (or initial program loading) is in flight.
    pub running: bool,
    pub next_in_progress: bool,
    /// -1 if no thread selected.
    pub cur_thread: i64,
    /// -1 if no goroutine selected.
    pub cur_gid: i64,
    pub cur_frame: usize,
    pub listing: Listing,
    pub disassembly: Disassembly,
    pub history: CommandHistory,
    pub command_line: CommandLine,
    pub output: OutputBuffer,
    pub program: ProgramInfo,
    /// Expressions shown in the expressions panel.
    pub expressions: Vec<String>,
    pub quit: bool,
    backend: Option<Child>,
}

impl State {
    fn new(config: &SessionConfig) -> Self {
        Self {
            client: None,
            connection_failed: false,
            running: false,
            next_in_progress: false,
            cur_thread: -1,
            cur_gid: -1,
            cur_frame: 0,
            listing: Listing::default(),
            disassembly: Disassembly::default(),
            history: CommandHistory::default(),
            command_line: CommandLine::default(),
            output: OutputBuffer::new(config.high_mark, config.low_mark),
            program: ProgramInfo::default(),
            expressions: vec![],
            quit: false,
            backend: None,
        }
    }

    pub fn prompt(&self) -> String {
        if self.running {
            return "running".to_string();
        }
        if self.client.is_none() {
            return if self.connection_failed {
                "failed".to_string()
            } else {
                "connecting".to_string()
            };
        }
        if self.cur_thread < 0 {
            return "dlv>".to_string();
        }
        if self.cur_gid < 0 {
            format!("thread {} frame {}>", self.cur_thread, self.cur_frame)
        } else {
            format!("goroutine {} frame {}>", self.cur_gid, self.cur_frame)
        }
    }

    /// Print a line to scrollback and log it.
    pub fn notice(&mut self, msg: impl Display) {
        let msg = msg.to_string();
        warn!(target: "session", "{msg}");
        self.output.append(&msg);
        self.output.append("\n");
    }

    /// Forget the current position after a failure.
    pub fn reset_position(&mut self) {
        self.cur_thread = -1;
        self.cur_gid = -1;
        self.cur_frame = 0;
    }
}

struct Shared {
    state: Mutex<State>,
    changed: AtomicBool,
    panels: Panels,
    config: SessionConfig,
}

/// Handle to the one debugging session of the process. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    pub fn new(config: SessionConfig, panels: Panels) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::new(&config)),
                changed: AtomicBool::new(true),
                panels,
                config,
            }),
        }
    }

    /// Lock the state. A lock poisoned by a panicked command thread is recovered.
    pub fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn panels(&self) -> &Panels {
        &self.shared.panels
    }

    pub fn client(&self) -> Option<Arc<dyn Client>> {
        self.lock().client.clone()
    }

    /// Ask the view to redraw.
    pub fn mark_changed(&self) {
        self.shared.changed.store(true, Ordering::SeqCst);
    }

    /// Return true if something changed since the last call.
    pub fn take_changed(&self) -> bool {
        self.shared.changed.swap(false, Ordering::SeqCst)
    }

    pub fn write_output(&self, text: &str) {
        self.lock().output.append(text);
        self.mark_changed();
    }

    /// Print a line to scrollback and log it.
    pub fn report(&self, msg: impl Display) {
        self.lock().notice(msg);
        self.mark_changed();
    }

    /// Report an unrecoverable connection problem, the prompt switches to "failed".
    pub fn connection_failed(&self, msg: impl Display) {
        let mut state = self.lock();
        state.connection_failed = true;
        state.notice(msg);
        drop(state);
        self.mark_changed();
    }

    pub fn prompt(&self) -> String {
        self.lock().prompt()
    }

    pub(crate) fn set_backend(&self, child: Child) {
        self.lock().backend = Some(child);
    }

    /// Pid of a locally spawned debugger server.
    pub fn backend_pid(&self) -> Option<u32> {
        self.lock().backend.as_ref().map(Child::id)
    }

    /// Interrupt a locally spawned server, it is not waited for.
    pub fn shutdown(&self) {
        let backend = self.lock().backend.take();
        if let Some(child) = backend {
            info!(target: "session", "interrupt debugger server {}", child.id());
            if let Err(e) = kill(Pid::from_raw(child.id() as i32), Signal::SIGINT) {
                warn!(target: "session", "interrupt debugger server: {e}");
            }
        }
    }
}
