use dlvtui::client::{
    self, AsmFlavour, AsmInstruction, Breakpoint, Client, DebuggerState, EvalScope, Function,
    Goroutine, LoadConfig, Location, Register, Stackframe, Thread, Variable,
};
use dlvtui::session::panel::{PanelCache, PanelKind, Panels};
use dlvtui::session::{Session, SessionConfig};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use strum::IntoEnumIterator;

/// Server answers used by [`FakeClient`].
#[derive(Default, Clone)]
pub struct Script {
    pub state: DebuggerState,
    pub frames: Vec<Stackframe>,
    pub breakpoints: Vec<Breakpoint>,
    pub instructions: Vec<AsmInstruction>,
    pub sources: Vec<String>,
    /// Names of calls answering with an error.
    pub failing: HashSet<&'static str>,
    /// `Continue` waits for `Halt`.
    pub block_continue: bool,
}

/// Scripted debugger server recording every call.
#[derive(Default)]
pub struct FakeClient {
    pub script: Mutex<Script>,
    calls: Mutex<Vec<String>>,
    halted: (Mutex<bool>, Condvar),
}

impl FakeClient {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| *c == name).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, name: &'static str) -> client::Result<Script> {
        self.calls.lock().unwrap().push(name.to_string());
        let script = self.script.lock().unwrap().clone();
        if script.failing.contains(name) {
            return Err(client::Error::Remote(format!("{name} failed")));
        }
        Ok(script)
    }
}

impl Client for FakeClient {
    fn get_state(&self) -> client::Result<DebuggerState> {
        Ok(self.record("GetState")?.state)
    }

    fn stacktrace(
        &self,
        _goroutine_id: i64,
        depth: usize,
        _cfg: Option<&LoadConfig>,
    ) -> client::Result<Vec<Stackframe>> {
        let frames = self.record("Stacktrace")?.frames;
        Ok(frames.into_iter().take(depth).collect())
    }

    fn list_breakpoints(&self) -> client::Result<Vec<Breakpoint>> {
        Ok(self.record("ListBreakpoints")?.breakpoints)
    }

    fn disassemble_pc(
        &self,
        _scope: EvalScope,
        _pc: u64,
        _flavour: AsmFlavour,
    ) -> client::Result<Vec<AsmInstruction>> {
        Ok(self.record("DisassemblePC")?.instructions)
    }

    fn list_functions(&self, _filter: &str) -> client::Result<Vec<String>> {
        self.record("ListFunctions")?;
        Ok(vec!["main.main".to_string()])
    }

    fn list_sources(&self, _filter: &str) -> client::Result<Vec<String>> {
        Ok(self.record("ListSources")?.sources)
    }

    fn list_types(&self, _filter: &str) -> client::Result<Vec<String>> {
        self.record("ListTypes")?;
        Ok(vec!["main.Point".to_string()])
    }

    fn halt(&self) -> client::Result<DebuggerState> {
        let result = self.record("Halt");
        let (lock, cvar) = &self.halted;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
        Ok(result?.state)
    }

    fn cancel_next(&self) -> client::Result<()> {
        self.record("CancelNext")?;
        Ok(())
    }

    fn r#continue(&self) -> client::Result<DebuggerState> {
        let script = self.record("Continue")?;
        if script.block_continue {
            let (lock, cvar) = &self.halted;
            let mut halted = lock.lock().unwrap();
            while !*halted {
                halted = cvar.wait(halted).unwrap();
            }
        }
        Ok(script.state)
    }

    fn next(&self) -> client::Result<DebuggerState> {
        Ok(self.record("Next")?.state)
    }

    fn step(&self) -> client::Result<DebuggerState> {
        Ok(self.record("Step")?.state)
    }

    fn step_out(&self) -> client::Result<DebuggerState> {
        Ok(self.record("StepOut")?.state)
    }

    fn restart(&self) -> client::Result<()> {
        self.record("Restart")?;
        Ok(())
    }

    fn switch_thread(&self, thread_id: i64) -> client::Result<DebuggerState> {
        let mut state = self.record("SwitchThread")?.state;
        if let Some(thread) = state.current_thread.as_mut() {
            thread.id = thread_id;
        }
        Ok(state)
    }

    fn switch_goroutine(&self, goroutine_id: i64) -> client::Result<DebuggerState> {
        let mut state = self.record("SwitchGoroutine")?.state;
        if let Some(g) = state.selected_goroutine.as_mut() {
            g.id = goroutine_id;
        }
        Ok(state)
    }

    fn create_breakpoint(&self, breakpoint: &Breakpoint) -> client::Result<Breakpoint> {
        self.record("CreateBreakpoint")?;
        let mut script = self.script.lock().unwrap();
        let bp = Breakpoint {
            id: script.breakpoints.len() as i64 + 1,
            ..breakpoint.clone()
        };
        script.breakpoints.push(bp.clone());
        Ok(bp)
    }

    fn clear_breakpoint(&self, id: i64) -> client::Result<Breakpoint> {
        self.record("ClearBreakpoint")?;
        let mut script = self.script.lock().unwrap();
        let idx = script
            .breakpoints
            .iter()
            .position(|bp| bp.id == id)
            .ok_or_else(|| client::Error::Remote(format!("no breakpoint with id {id}")))?;
        Ok(script.breakpoints.remove(idx))
    }

    fn eval(&self, _scope: EvalScope, expr: &str, _cfg: &LoadConfig) -> client::Result<Variable> {
        self.record("Eval")?;
        Ok(Variable {
            name: expr.to_string(),
            r#type: "int".to_string(),
            value: "42".to_string(),
            ..Default::default()
        })
    }

    fn list_local_vars(
        &self,
        _scope: EvalScope,
        _cfg: &LoadConfig,
    ) -> client::Result<Vec<Variable>> {
        self.record("ListLocalVars")?;
        Ok(vec![])
    }

    fn list_function_args(
        &self,
        _scope: EvalScope,
        _cfg: &LoadConfig,
    ) -> client::Result<Vec<Variable>> {
        self.record("ListFunctionArgs")?;
        Ok(vec![])
    }

    fn list_package_vars(&self, _filter: &str, _cfg: &LoadConfig) -> client::Result<Vec<Variable>> {
        self.record("ListPackageVars")?;
        Ok(vec![])
    }

    fn list_registers(&self, _thread_id: i64) -> client::Result<Vec<Register>> {
        self.record("ListRegisters")?;
        Ok(vec![])
    }

    fn list_goroutines(&self) -> client::Result<Vec<Goroutine>> {
        self.record("ListGoroutines")?;
        Ok(vec![])
    }

    fn list_threads(&self) -> client::Result<Vec<Thread>> {
        self.record("ListThreads")?;
        Ok(vec![])
    }
}

/// Panel cache remembering when it was cleared.
struct RecordingCache {
    kind: PanelKind,
    cleared: Arc<Mutex<Vec<PanelKind>>>,
}

impl PanelCache for RecordingCache {
    fn clear(&self) {
        self.cleared.lock().unwrap().push(self.kind);
    }
}

#[derive(Clone, Default)]
pub struct ClearLog(Arc<Mutex<Vec<PanelKind>>>);

impl ClearLog {
    /// Panels cleared since the last call.
    pub fn take(&self) -> BTreeSet<PanelKind> {
        self.0.lock().unwrap().drain(..).collect()
    }
}

pub fn session_with(config: SessionConfig) -> (Session, ClearLog) {
    let log = ClearLog::default();
    let mut panels = Panels::default();
    for kind in PanelKind::iter() {
        panels.register(
            kind,
            Arc::new(RecordingCache {
                kind,
                cleared: log.0.clone(),
            }),
        );
    }
    (Session::new(config, panels), log)
}

/// Session already connected to `client`.
pub fn connected_session(client: Arc<FakeClient>) -> (Session, ClearLog) {
    let (session, log) = session_with(SessionConfig::default());
    session.lock().client = Some(client as Arc<dyn Client>);
    (session, log)
}

pub fn location(file: &str, line: usize, function: &str) -> Location {
    Location {
        pc: 0x4a0000 + line as u64,
        file: file.to_string(),
        line,
        function: Some(Function {
            name: function.to_string(),
            value: 0x4a0000,
        }),
    }
}

pub fn frame(file: &str, line: usize, function: &str) -> Stackframe {
    Stackframe {
        location: location(file, line, function),
        ..Default::default()
    }
}

/// Stopped state with thread `thread_id` running goroutine `gid` at `loc`.
pub fn stopped_at(thread_id: i64, gid: i64, loc: &Location) -> DebuggerState {
    DebuggerState {
        current_thread: Some(Thread {
            id: thread_id,
            pc: loc.pc,
            file: loc.file.clone(),
            line: loc.line,
            function: loc.function.clone(),
            goroutine_id: gid,
        }),
        selected_goroutine: (gid > 0).then(|| Goroutine {
            id: gid,
            current_loc: loc.clone(),
            user_current_loc: loc.clone(),
            thread_id,
        }),
        ..Default::default()
    }
}

/// Go source file written under the temporary directory, removed on drop.
pub struct SourceFile {
    pub path: PathBuf,
}

impl SourceFile {
    pub fn new(name: &str, content: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "dlvtui-{}-{:?}-{name}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::write(&path, content).unwrap();
        Self { path }
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

impl Drop for SourceFile {
    fn drop(&mut self) {
        _ = std::fs::remove_file(&self.path);
    }
}

pub const MAIN_GO: &str = "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(\"hello\")\n}\n";

/// Wait until `cond` holds, panic after a few seconds.
pub fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let start = Instant::now();
    while !cond() {
        if start.elapsed() > Duration::from_secs(5) {
            panic!("timeout waiting for {what}");
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}
