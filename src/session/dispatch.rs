//! Execution of user commands against the shared session.
//!
//! Every submitted command runs on its own thread. The session lock is taken only to
//! record results, remote calls are issued without it.

use crate::client::{Breakpoint, Client, DebuggerState, EvalScope, LoadConfig};
use crate::session::input::Recall;
use crate::session::panel::PanelKind;
use crate::session::refresh::{ClearPolicy, FrameTarget, Refresher};
use crate::session::{Error, Session};
use crate::ui::command::{BreakpointIdentity, Command, FrameCommand};
use log::{debug, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const HELP: &str = "\
continue, c              run until breakpoint or program termination
next, n                  step over to next source line
step, s                  single step through program
stepout, so              step out of the current function
restart, r               restart the process
break, b <file:line|fn>  set a breakpoint
clear <id>               delete a breakpoint
thread, tr <id>          switch to the specified thread
goroutine, gr <id>       switch to the specified goroutine
frame <n>, up, down      select a stack frame
print, p <expr>          evaluate an expression
display <expr>           add an expression to the expressions panel
undisplay <n>            remove an expression from the expressions panel
help, h                  show this help
exit, quit, q            exit the debugger
";

/// Gives the command line back to the user however a command ends.
struct IdleGuard<'a>(&'a Session);

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        let mut st = self.0.lock();
        st.running = false;
        st.command_line.read_only = false;
        drop(st);
        self.0.mark_changed();
    }
}

pub struct Dispatcher {
    session: Session,
}

impl Dispatcher {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn prompt(&self) -> String {
        self.session.prompt()
    }

    /// Submit the content of the command line.
    pub fn submit_command_line(&self) -> Option<JoinHandle<()>> {
        let text = {
            let mut st = self.session.lock();
            if st.running || st.command_line.read_only {
                return None;
            }
            st.command_line.take()
        };
        self.submit(&text)
    }

    /// Record `text` in history, echo it and execute it in background.
    ///
    /// An empty text repeats the last command. Nothing happens while another command runs.
    pub fn submit(&self, text: &str) -> Option<JoinHandle<()>> {
        let cmd = {
            let mut st = self.session.lock();
            if st.running {
                return None;
            }

            let cmd = if text.trim().is_empty() {
                st.history.last()?.to_string()
            } else {
                st.history.push(text);
                text.to_string()
            };
            st.history.reset_cursor();

            let echo = format!("{} {cmd}\n", st.prompt());
            st.output.append(&echo);
            st.running = true;
            st.command_line.read_only = true;
            cmd
        };
        self.session.mark_changed();
        debug!(target: "session", "submit {cmd:?}");

        let session = self.session.clone();
        Some(thread::spawn(move || {
            let _idle = IdleGuard(&session);
            if let Err(e) = execute(&session, &cmd) {
                session.report(format!("Command failed: {e}"));
            }
        }))
    }

    pub fn recall_previous(&self) {
        let mut st = self.session.lock();
        let st = &mut *st;
        if st.command_line.read_only {
            return;
        }
        match st.history.recall_previous() {
            Recall::Entry(entry) => st.command_line.set(entry),
            Recall::Blank => st.command_line.clear(),
        }
    }

    pub fn recall_next(&self) {
        let mut st = self.session.lock();
        let st = &mut *st;
        if st.command_line.read_only {
            return;
        }
        match st.history.recall_next() {
            Recall::Entry(entry) => st.command_line.set(entry),
            Recall::Blank => st.command_line.clear(),
        }
    }

    /// Ask the server to stop a running command. Does nothing when idle.
    pub fn interrupt(&self) -> Option<JoinHandle<()>> {
        let client = {
            let st = self.session.lock();
            if !st.running {
                return None;
            }
            st.client.clone()?
        };
        info!(target: "session", "manual stop requested");

        let session = self.session.clone();
        Some(thread::spawn(move || {
            if let Err(e) = client.halt() {
                session.report(format!("Request manual stop failed: {e}"));
            }
            if let Err(e) = client.cancel_next() {
                session.report(format!("Could not cancel next operation: {e}"));
            }
        }))
    }
}

fn client(session: &Session) -> Result<Arc<dyn Client>, Error> {
    session.client().ok_or(Error::NotConnected)
}

fn refresh(
    session: &Session,
    target: FrameTarget,
    policy: ClearPolicy,
    state: Option<DebuggerState>,
) {
    Refresher::new(session).refresh(target, policy, state);
}

fn scope(session: &Session) -> EvalScope {
    let st = session.lock();
    EvalScope::new(st.cur_gid, st.cur_frame)
}

fn describe(bp: &Breakpoint) -> String {
    if bp.function_name.is_empty() {
        format!("{}:{}", bp.file, bp.line)
    } else {
        format!("{} ({}:{})", bp.function_name, bp.file, bp.line)
    }
}

/// Parse and run one command, then refresh the session accordingly.
fn execute(session: &Session, text: &str) -> Result<(), Error> {
    let command = Command::parse(text).map_err(Error::Command)?;

    match command {
        Command::Continue => {
            let state = client(session)?
                .r#continue()
                .map_err(Error::rpc("Continue()"))?;
            if state.exited {
                session.report(format!(
                    "Process has exited with status {}",
                    state.exit_status
                ));
            }
            refresh(session, FrameTarget::FirstUserFrame, ClearPolicy::OnStop, Some(state));
        }
        Command::Next | Command::Step | Command::StepOut => {
            let client = client(session)?;
            let state = match command {
                Command::Next => client.next().map_err(Error::rpc("Next()"))?,
                Command::Step => client.step().map_err(Error::rpc("Step()"))?,
                _ => client.step_out().map_err(Error::rpc("StepOut()"))?,
            };
            refresh(session, FrameTarget::ZeroFrame, ClearPolicy::OnStop, Some(state));
        }
        Command::Restart => {
            client(session)?.restart().map_err(Error::rpc("Restart()"))?;
            session.write_output("Process restarted\n");
            refresh(session, FrameTarget::ZeroFrame, ClearPolicy::OnStop, None);
        }
        Command::Break(identity) => {
            let request = match identity {
                BreakpointIdentity::Line(file, line) => Breakpoint {
                    file,
                    line,
                    ..Default::default()
                },
                BreakpointIdentity::Function(name) => Breakpoint {
                    function_name: name,
                    ..Default::default()
                },
            };
            let bp = client(session)?
                .create_breakpoint(&request)
                .map_err(Error::rpc("CreateBreakpoint()"))?;
            session.write_output(&format!("Breakpoint {} set at {}\n", bp.id, describe(&bp)));
            refresh(session, FrameTarget::SameFrame, ClearPolicy::OnBreakpointChange, None);
        }
        Command::Clear(id) => {
            let bp = client(session)?
                .clear_breakpoint(id)
                .map_err(Error::rpc("ClearBreakpoint()"))?;
            session.write_output(&format!("Breakpoint {} cleared at {}\n", bp.id, describe(&bp)));
            refresh(session, FrameTarget::SameFrame, ClearPolicy::OnBreakpointChange, None);
        }
        Command::Thread(id) => {
            let state = client(session)?
                .switch_thread(id)
                .map_err(Error::rpc("SwitchThread()"))?;
            refresh(session, FrameTarget::ZeroFrame, ClearPolicy::OnGoroutineSwitch, Some(state));
        }
        Command::Goroutine(id) => {
            let state = client(session)?
                .switch_goroutine(id)
                .map_err(Error::rpc("SwitchGoroutine()"))?;
            refresh(
                session,
                FrameTarget::FirstUserFrame,
                ClearPolicy::OnGoroutineSwitch,
                Some(state),
            );
        }
        Command::Frame(cmd) => {
            client(session)?;
            {
                let mut st = session.lock();
                st.cur_frame = match cmd {
                    FrameCommand::Switch(num) => num,
                    FrameCommand::Up => st.cur_frame + 1,
                    FrameCommand::Down => st.cur_frame.saturating_sub(1),
                };
            }
            refresh(session, FrameTarget::SameFrame, ClearPolicy::OnFrameSwitch, None);
        }
        Command::Print(expr) => {
            let client = client(session)?;
            let var = client
                .eval(scope(session), &expr, &LoadConfig::default())
                .map_err(Error::rpc("Eval()"))?;
            session.write_output(&format!("{expr} = {}\n", var.single_line()));
            refresh(session, FrameTarget::SameFrame, ClearPolicy::OnFrameSwitch, None);
        }
        Command::Display(expr) => {
            session.lock().expressions.push(expr);
            session.panels().clear(PanelKind::Expressions);
        }
        Command::Undisplay(num) => {
            {
                let mut st = session.lock();
                if num >= st.expressions.len() {
                    return Err(Error::Command(format!("no display expression {num}")));
                }
                st.expressions.remove(num);
            }
            session.panels().clear(PanelKind::Expressions);
        }
        Command::Help(_) => session.write_output(HELP),
        Command::Exit => {
            session.lock().quit = true;
            session.mark_changed();
        }
    }

    Ok(())
}
