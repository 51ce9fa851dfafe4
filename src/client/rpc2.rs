//! JSON-RPC client for delve's `rpc2` service.
//!
//! Requests are newline separated JSON objects `{"method", "params": [args], "id"}`.
//! Responses may arrive out of order, a background reader thread routes them to the
//! waiting caller by id.

use crate::client::api::null_as_default;
use crate::client::{
    AsmFlavour, AsmInstruction, Breakpoint, Client, DebuggerState, Error, EvalScope, Goroutine,
    LoadConfig, Register, Result, Stackframe, Thread, Variable,
};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

type PendingCalls = Arc<Mutex<Option<HashMap<u64, Sender<Result<Value>>>>>>;

#[derive(Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Value,
}

pub struct RpcClient {
    stream: Mutex<TcpStream>,
    /// `None` once the connection is closed.
    pending: PendingCalls,
    seq: AtomicU64,
}

impl RpcClient {
    /// Connect to a server listening at `addr`.
    pub fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);

        let pending: PendingCalls = Arc::new(Mutex::new(Some(HashMap::new())));
        {
            let pending = pending.clone();
            thread::spawn(move || Self::read_responses(reader, pending));
        }

        debug!(target: "rpc", "connected to {addr}");
        Ok(Self {
            stream: Mutex::new(stream),
            pending,
            seq: AtomicU64::new(0),
        })
    }

    fn read_responses(mut reader: BufReader<TcpStream>, pending: PendingCalls) {
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(target: "rpc", "read response: {e}");
                    break;
                }
            }
            if line.trim().is_empty() {
                continue;
            }

            let resp: Response = match serde_json::from_str(&line) {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(target: "rpc", "skip malformed response: {e}");
                    continue;
                }
            };

            let result = match resp.error {
                Value::Null => Ok(resp.result),
                Value::String(msg) => Err(Error::Remote(msg)),
                other => Err(Error::Remote(other.to_string())),
            };

            let waiter = pending
                .lock()
                .unwrap()
                .as_mut()
                .and_then(|calls| calls.remove(&resp.id));
            match waiter {
                Some(tx) => {
                    _ = tx.send(result);
                }
                None => warn!(target: "rpc", "response for unknown call {}", resp.id),
            }
        }

        // dropping senders wakes up every caller still waiting
        pending.lock().unwrap().take();
        debug!(target: "rpc", "connection closed");
    }

    fn call<A: Serialize, R: DeserializeOwned>(&self, method: &str, args: A) -> Result<R> {
        let id = self.seq.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = channel();
        match self.pending.lock().unwrap().as_mut() {
            Some(calls) => calls.insert(id, tx),
            None => return Err(Error::Disconnected),
        };

        let request = json!({
            "method": format!("RPCServer.{method}"),
            "params": [args],
            "id": id,
        });
        let mut payload = serde_json::to_vec(&request)?;
        payload.push(b'\n');

        let written = {
            let mut stream = self.stream.lock().unwrap();
            stream.write_all(&payload).and_then(|_| stream.flush())
        };
        if let Err(e) = written {
            if let Some(calls) = self.pending.lock().unwrap().as_mut() {
                calls.remove(&id);
            }
            return Err(e.into());
        }

        let value = rx.recv().map_err(|_| Error::Disconnected)??;
        Ok(serde_json::from_value(value)?)
    }

    fn command(&self, name: &str, thread_id: i64, goroutine_id: i64) -> Result<DebuggerState> {
        #[derive(Deserialize)]
        struct Out {
            #[serde(rename = "State")]
            state: DebuggerState,
        }

        let mut args = json!({ "name": name });
        if thread_id != 0 {
            args["threadID"] = json!(thread_id);
        }
        if goroutine_id != 0 {
            args["goroutineID"] = json!(goroutine_id);
        }
        let out: Out = self.call("Command", args)?;
        Ok(out.state)
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        if let Ok(stream) = self.stream.lock() {
            _ = stream.shutdown(Shutdown::Both);
        }
    }
}

macro_rules! output {
    ($name: ident { $field: ident : $ty: ty = $key: tt }) => {
        #[derive(Deserialize)]
        struct $name {
            #[serde(rename = $key, default, deserialize_with = "null_as_default")]
            $field: $ty,
        }
    };
}

impl Client for RpcClient {
    fn get_state(&self) -> Result<DebuggerState> {
        #[derive(Deserialize)]
        struct Out {
            #[serde(rename = "State")]
            state: DebuggerState,
        }
        let out: Out = self.call("State", json!({ "NonBlocking": false }))?;
        Ok(out.state)
    }

    fn stacktrace(
        &self,
        goroutine_id: i64,
        depth: usize,
        cfg: Option<&LoadConfig>,
    ) -> Result<Vec<Stackframe>> {
        output!(Out { locations: Vec<Stackframe> = "Locations" });
        let out: Out = self.call(
            "Stacktrace",
            json!({ "Id": goroutine_id, "Depth": depth, "Full": cfg.is_some(), "Cfg": cfg }),
        )?;
        Ok(out.locations)
    }

    fn list_breakpoints(&self) -> Result<Vec<Breakpoint>> {
        output!(Out { breakpoints: Vec<Breakpoint> = "Breakpoints" });
        let out: Out = self.call("ListBreakpoints", json!({ "All": false }))?;
        Ok(out.breakpoints)
    }

    fn disassemble_pc(
        &self,
        scope: EvalScope,
        pc: u64,
        flavour: AsmFlavour,
    ) -> Result<Vec<AsmInstruction>> {
        output!(Out { instructions: Vec<AsmInstruction> = "Disassemble" });
        let out: Out = self.call(
            "Disassemble",
            json!({ "Scope": scope, "StartPC": pc, "EndPC": 0, "Flavour": flavour }),
        )?;
        Ok(out.instructions)
    }

    fn list_functions(&self, filter: &str) -> Result<Vec<String>> {
        output!(Out { funcs: Vec<String> = "Funcs" });
        let out: Out = self.call("ListFunctions", json!({ "Filter": filter }))?;
        Ok(out.funcs)
    }

    fn list_sources(&self, filter: &str) -> Result<Vec<String>> {
        output!(Out { sources: Vec<String> = "Sources" });
        let out: Out = self.call("ListSources", json!({ "Filter": filter }))?;
        Ok(out.sources)
    }

    fn list_types(&self, filter: &str) -> Result<Vec<String>> {
        output!(Out { types: Vec<String> = "Types" });
        let out: Out = self.call("ListTypes", json!({ "Filter": filter }))?;
        Ok(out.types)
    }

    fn halt(&self) -> Result<DebuggerState> {
        self.command("halt", 0, 0)
    }

    fn cancel_next(&self) -> Result<()> {
        let _: Value = self.call("CancelNext", json!({}))?;
        Ok(())
    }

    fn r#continue(&self) -> Result<DebuggerState> {
        self.command("continue", 0, 0)
    }

    fn next(&self) -> Result<DebuggerState> {
        self.command("next", 0, 0)
    }

    fn step(&self) -> Result<DebuggerState> {
        self.command("step", 0, 0)
    }

    fn step_out(&self) -> Result<DebuggerState> {
        self.command("stepOut", 0, 0)
    }

    fn restart(&self) -> Result<()> {
        let _: Value = self.call(
            "Restart",
            json!({ "Position": "", "ResetArgs": false, "NewArgs": [], "Rebuild": false }),
        )?;
        Ok(())
    }

    fn switch_thread(&self, thread_id: i64) -> Result<DebuggerState> {
        self.command("switchThread", thread_id, 0)
    }

    fn switch_goroutine(&self, goroutine_id: i64) -> Result<DebuggerState> {
        self.command("switchGoroutine", 0, goroutine_id)
    }

    fn create_breakpoint(&self, breakpoint: &Breakpoint) -> Result<Breakpoint> {
        output!(Out { breakpoint: Breakpoint = "Breakpoint" });
        let out: Out = self.call("CreateBreakpoint", json!({ "Breakpoint": breakpoint }))?;
        Ok(out.breakpoint)
    }

    fn clear_breakpoint(&self, id: i64) -> Result<Breakpoint> {
        output!(Out { breakpoint: Breakpoint = "Breakpoint" });
        let out: Out = self.call("ClearBreakpoint", json!({ "Id": id, "Name": "" }))?;
        Ok(out.breakpoint)
    }

    fn eval(&self, scope: EvalScope, expr: &str, cfg: &LoadConfig) -> Result<Variable> {
        output!(Out { variable: Variable = "Variable" });
        let out: Out = self.call(
            "Eval",
            json!({ "Scope": scope, "Expr": expr, "Cfg": cfg }),
        )?;
        Ok(out.variable)
    }

    fn list_local_vars(&self, scope: EvalScope, cfg: &LoadConfig) -> Result<Vec<Variable>> {
        output!(Out { variables: Vec<Variable> = "Variables" });
        let out: Out = self.call("ListLocalVars", json!({ "Scope": scope, "Cfg": cfg }))?;
        Ok(out.variables)
    }

    fn list_function_args(&self, scope: EvalScope, cfg: &LoadConfig) -> Result<Vec<Variable>> {
        output!(Out { args: Vec<Variable> = "Args" });
        let out: Out = self.call("ListFunctionArgs", json!({ "Scope": scope, "Cfg": cfg }))?;
        Ok(out.args)
    }

    fn list_package_vars(&self, filter: &str, cfg: &LoadConfig) -> Result<Vec<Variable>> {
        output!(Out { variables: Vec<Variable> = "Variables" });
        let out: Out = self.call("ListPackageVars", json!({ "Filter": filter, "Cfg": cfg }))?;
        Ok(out.variables)
    }

    fn list_registers(&self, thread_id: i64) -> Result<Vec<Register>> {
        output!(Out { regs: Vec<Register> = "Regs" });
        let out: Out = self.call(
            "ListRegisters",
            json!({ "ThreadID": thread_id, "IncludeFp": false }),
        )?;
        Ok(out.regs)
    }

    fn list_goroutines(&self) -> Result<Vec<Goroutine>> {
        output!(Out { goroutines: Vec<Goroutine> = "Goroutines" });
        let out: Out = self.call("ListGoroutines", json!({ "Start": 0, "Count": 0 }))?;
        Ok(out.goroutines)
    }

    fn list_threads(&self) -> Result<Vec<Thread>> {
        output!(Out { threads: Vec<Thread> = "Threads" });
        let out: Out = self.call("ListThreads", json!({}))?;
        Ok(out.threads)
    }
}
