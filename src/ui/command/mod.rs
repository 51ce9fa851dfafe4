//! Commands a user types into the command line.
//!
//! Command is a some sort of request to the debugger server that defines an action and a
//! list of input arguments. Execution lives in [`crate::session::dispatch`].

pub mod parser;

/// Place where a new breakpoint is set.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakpointIdentity {
    Line(String, usize),
    Function(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameCommand {
    Switch(usize),
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Continue,
    Next,
    Step,
    StepOut,
    Restart,
    Break(BreakpointIdentity),
    Clear(i64),
    Thread(i64),
    Goroutine(i64),
    Frame(FrameCommand),
    Print(String),
    Display(String),
    Undisplay(usize),
    Help(Option<String>),
    Exit,
}
