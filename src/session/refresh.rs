//! Synchronization of the local view with the authoritative server state.

use crate::client::{Client, DebuggerState, EvalScope, Location, Stackframe};
use crate::session::listing::{breakpoints_by_line, build_listing};
use crate::session::panel::PanelKind;
use crate::session::{Error, Session};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use strum_macros::Display;

/// Frames of functions from this package are internal, unless exported.
const RUNTIME_PREFIX: &str = "runtime.";
/// Stack depth inspected when looking for the first user frame.
const USER_FRAME_SEARCH_DEPTH: usize = 20;

/// Which stack frame becomes current after a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FrameTarget {
    ZeroFrame,
    SameFrame,
    FirstUserFrame,
}

/// Which panel caches are dropped after a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ClearPolicy {
    OnFrameSwitch,
    OnGoroutineSwitch,
    OnStop,
    OnBreakpointChange,
}

impl ClearPolicy {
    pub fn panels(self) -> &'static [PanelKind] {
        match self {
            ClearPolicy::OnFrameSwitch => &[PanelKind::Locals, PanelKind::Expressions],
            ClearPolicy::OnGoroutineSwitch => &[
                PanelKind::Locals,
                PanelKind::Expressions,
                PanelKind::Stack,
                PanelKind::Registers,
            ],
            ClearPolicy::OnStop => &[
                PanelKind::Locals,
                PanelKind::Expressions,
                PanelKind::Registers,
                PanelKind::Goroutines,
                PanelKind::Stack,
                PanelKind::Threads,
                PanelKind::Globals,
                PanelKind::Breakpoints,
            ],
            ClearPolicy::OnBreakpointChange => &[PanelKind::Breakpoints],
        }
    }
}

/// Current frame and location chosen for a refresh.
#[derive(Debug, PartialEq)]
pub struct Position {
    pub frame: usize,
    pub location: Option<Location>,
}

fn zero_frame_location(state: &DebuggerState) -> Option<Location> {
    match (&state.selected_goroutine, &state.current_thread) {
        (Some(g), Some(thread)) if g.thread_id == thread.id => Some(thread.location()),
        (Some(g), _) => Some(g.current_loc.clone()),
        (None, Some(thread)) => Some(thread.location()),
        (None, None) => None,
    }
}

/// Return true for functions a user cares about.
/// Exported runtime functions (`runtime.Breakpoint`) count as user functions.
pub fn is_user_function(name: &str) -> bool {
    match name.strip_prefix(RUNTIME_PREFIX) {
        None => true,
        Some(rest) => rest.chars().next().is_some_and(|c| c.is_ascii_uppercase()),
    }
}

/// Index of the first frame of a user function, 0 if there is none.
pub fn first_user_frame(frames: &[Stackframe]) -> usize {
    frames
        .iter()
        .position(|frame| {
            frame
                .location
                .function
                .as_ref()
                .is_some_and(|f| is_user_function(&f.name))
        })
        .unwrap_or(0)
}

/// Choose the current frame and its location.
pub fn resolve_position(
    client: &dyn Client,
    state: &DebuggerState,
    target: FrameTarget,
    goroutine_id: i64,
    prev_frame: usize,
) -> Result<Position, Error> {
    match target {
        FrameTarget::ZeroFrame => Ok(Position {
            frame: 0,
            location: zero_frame_location(state),
        }),
        FrameTarget::SameFrame => {
            let frames = client
                .stacktrace(goroutine_id, prev_frame + 1, None)
                .map_err(Error::rpc("Stacktrace()"))?;
            let frame = if prev_frame >= frames.len() { 0 } else { prev_frame };
            Ok(Position {
                frame,
                location: frames.get(frame).map(|f| f.location.clone()),
            })
        }
        FrameTarget::FirstUserFrame => {
            let frames = client
                .stacktrace(goroutine_id, USER_FRAME_SEARCH_DEPTH, None)
                .map_err(Error::rpc("Stacktrace()"))?;
            if frames.is_empty() {
                return resolve_position(
                    client,
                    state,
                    FrameTarget::ZeroFrame,
                    goroutine_id,
                    prev_frame,
                );
            }
            let frame = first_user_frame(&frames);
            Ok(Position {
                frame,
                location: Some(frames[frame].location.clone()),
            })
        }
    }
}

/// Marks the view as changed however refresh ends.
struct RedrawGuard<'a>(&'a Session);

impl Drop for RedrawGuard<'_> {
    fn drop(&mut self) {
        self.0.mark_changed();
    }
}

pub struct Refresher<'a> {
    session: &'a Session,
}

impl<'a> Refresher<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Recompute the current position, listing and disassembly from the server state.
    ///
    /// `state` is used instead of asking the server when a command already returned it.
    /// A failure resets the current position and is reported to scrollback.
    pub fn refresh(&self, target: FrameTarget, policy: ClearPolicy, state: Option<DebuggerState>) {
        let _redraw = RedrawGuard(self.session);
        debug!(target: "session", "refresh: frame {target}, clear {policy}");

        if let Err(err) = self.try_refresh(target, policy, state) {
            let mut st = self.session.lock();
            st.reset_position();
            st.notice(format!("Error refreshing state {err}"));
        }
    }

    fn try_refresh(
        &self,
        target: FrameTarget,
        policy: ClearPolicy,
        state: Option<DebuggerState>,
    ) -> Result<(), Error> {
        let client = self.session.client().ok_or(Error::NotConnected)?;

        let state = match state {
            Some(state) => state,
            None => client.get_state().map_err(Error::rpc("GetState()"))?,
        };

        let cur_thread = state.current_thread.as_ref().map(|t| t.id).unwrap_or(-1);
        let cur_gid = match &state.selected_goroutine {
            Some(g) if g.id > 0 => g.id,
            _ => -1,
        };
        let prev_frame = if cur_thread < 0 {
            0
        } else {
            self.session.lock().cur_frame
        };

        let position = resolve_position(client.as_ref(), &state, target, cur_gid, prev_frame)?;

        let location = {
            let mut st = self.session.lock();
            st.next_in_progress = state.next_in_progress;
            st.cur_thread = cur_thread;
            st.cur_gid = cur_gid;
            st.cur_frame = position.frame;

            for &kind in policy.panels() {
                self.session.panels().clear(kind);
            }

            st.listing.clear();
            st.disassembly.clear();
            match position.location {
                Some(location) => location,
                None => return Ok(()),
            }
        };

        let scope = EvalScope::new(cur_gid, position.frame);
        let instructions = client
            .disassemble_pc(scope, location.pc, self.session.config().flavour)
            .map_err(Error::rpc("DisassemblePC()"))?;
        self.session.lock().disassembly.instructions = instructions;

        let breakpoints = client
            .list_breakpoints()
            .map_err(Error::rpc("ListBreakpoints()"))?;
        let breakpoints = breakpoints_by_line(&breakpoints, &location.file);

        // listing stays empty if the source is unreadable
        let file = File::open(&location.file).map_err(Error::file_access(&location.file))?;
        let lines = build_listing(BufReader::new(file), location.line, &breakpoints)
            .map_err(Error::file_access(&location.file))?;

        let mut st = self.session.lock();
        st.listing.file = location.file;
        st.listing.lines = lines;
        Ok(())
    }
}
