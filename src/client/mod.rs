//! Remote debugger interface.
//!
//! The session core talks to the debugger server only through the [`Client`] trait.
//! [`rpc2::RpcClient`] is the production implementation speaking delve's JSON-RPC dialect.

pub mod api;
mod error;
pub mod rpc2;

pub use api::{
    AsmFlavour, AsmInstruction, Breakpoint, DebuggerState, EvalScope, Function, Goroutine,
    LoadConfig, Location, Register, Stackframe, Thread, Variable,
};
pub use error::{Error, Result};

/// Operations of the debugger server consumed by the application.
///
/// Every method blocks until the server answers, there is no local timeout.
/// Implementations must tolerate concurrent calls: [`Client::halt`] is issued while
/// another thread waits on [`Client::r#continue`].
pub trait Client: Send + Sync {
    fn get_state(&self) -> Result<DebuggerState>;

    fn stacktrace(
        &self,
        goroutine_id: i64,
        depth: usize,
        cfg: Option<&LoadConfig>,
    ) -> Result<Vec<Stackframe>>;

    fn list_breakpoints(&self) -> Result<Vec<Breakpoint>>;

    fn disassemble_pc(
        &self,
        scope: EvalScope,
        pc: u64,
        flavour: AsmFlavour,
    ) -> Result<Vec<AsmInstruction>>;

    fn list_functions(&self, filter: &str) -> Result<Vec<String>>;

    fn list_sources(&self, filter: &str) -> Result<Vec<String>>;

    fn list_types(&self, filter: &str) -> Result<Vec<String>>;

    /// Request a stop of a running debugee.
    fn halt(&self) -> Result<DebuggerState>;

    /// Abandon an in progress next/step/stepout operation.
    fn cancel_next(&self) -> Result<()>;

    // --------------------------------- execution control -----------------------------------------

    fn r#continue(&self) -> Result<DebuggerState>;

    fn next(&self) -> Result<DebuggerState>;

    fn step(&self) -> Result<DebuggerState>;

    fn step_out(&self) -> Result<DebuggerState>;

    fn restart(&self) -> Result<()>;

    fn switch_thread(&self, thread_id: i64) -> Result<DebuggerState>;

    fn switch_goroutine(&self, goroutine_id: i64) -> Result<DebuggerState>;

    // --------------------------------- breakpoints -----------------------------------------------

    fn create_breakpoint(&self, breakpoint: &Breakpoint) -> Result<Breakpoint>;

    fn clear_breakpoint(&self, id: i64) -> Result<Breakpoint>;

    // --------------------------------- inspection ------------------------------------------------

    fn eval(&self, scope: EvalScope, expr: &str, cfg: &LoadConfig) -> Result<Variable>;

    fn list_local_vars(&self, scope: EvalScope, cfg: &LoadConfig) -> Result<Vec<Variable>>;

    fn list_function_args(&self, scope: EvalScope, cfg: &LoadConfig) -> Result<Vec<Variable>>;

    fn list_package_vars(&self, filter: &str, cfg: &LoadConfig) -> Result<Vec<Variable>>;

    fn list_registers(&self, thread_id: i64) -> Result<Vec<Register>>;

    fn list_goroutines(&self) -> Result<Vec<Goroutine>>;

    fn list_threads(&self) -> Result<Vec<Thread>>;
}
