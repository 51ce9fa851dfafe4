//! Start of the debugger server and connection to it.

use crate::client::rpc2::RpcClient;
use crate::client::{self, Client};
use crate::muted_error;
use crate::session::output::OutputMultiplexer;
use crate::session::refresh::{ClearPolicy, FrameTarget, Refresher};
use crate::session::{Error, Session};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread;

/// First line the server prints on its stdout.
pub const READY_PREFIX: &str = "API server listening at: ";
pub const CONNECT_VERB: &str = "connect";

/// How to obtain a debugger server.
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchMode {
    /// Connect to an already running server.
    Attach(String),
    /// Run a headless server, `args` are forwarded after `--headless`.
    Spawn { backend: PathBuf, args: Vec<String> },
}

impl LaunchMode {
    pub fn from_args(backend: impl Into<PathBuf>, args: &[String]) -> Self {
        match args {
            [verb, addr] if verb == CONNECT_VERB => LaunchMode::Attach(addr.clone()),
            _ => LaunchMode::Spawn {
                backend: backend.into(),
                args: args.to_vec(),
            },
        }
    }
}

/// Result of [`start`].
pub enum Launched {
    /// Address is known, nothing was spawned.
    Attached(String),
    /// Server process is running, the address comes with its first stdout line.
    Spawned {
        process: Child,
        stdout: ChildStdout,
        stderr: ChildStderr,
    },
}

/// Resolve a bare executable name through `PATH`.
fn resolve_backend(backend: &Path) -> PathBuf {
    if backend.components().count() > 1 {
        return backend.to_path_buf();
    }
    muted_error!(which::which(backend)).unwrap_or_else(|| backend.to_path_buf())
}

/// Start the server (or take the address verbatim when attaching).
pub fn start(mode: &LaunchMode) -> Result<Launched, Error> {
    match mode {
        LaunchMode::Attach(addr) => Ok(Launched::Attached(addr.clone())),
        LaunchMode::Spawn { backend, args } => {
            let backend = resolve_backend(backend);
            info!(target: "session", "start {} --headless {}", backend.display(), args.join(" "));

            let mut process = Command::new(&backend)
                .arg("--headless")
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(Error::Spawn)?;

            let (Some(stdout), Some(stderr)) = (process.stdout.take(), process.stderr.take())
            else {
                return Err(Error::Spawn(std::io::Error::other("output is not captured")));
            };

            Ok(Launched::Spawned {
                process,
                stdout,
                stderr,
            })
        }
    }
}

/// Extract the server address from its ready line.
pub fn parse_ready_signal(line: &str) -> Result<String, Error> {
    line.strip_prefix(READY_PREFIX)
        .map(|addr| addr.trim().to_string())
        .filter(|addr| !addr.is_empty())
        .ok_or_else(|| Error::ProtocolParse(line.to_string()))
}

pub struct Connector<'a> {
    session: &'a Session,
}

impl<'a> Connector<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Connect over JSON-RPC and install the client.
    pub fn connect(&self, addr: &str) {
        info!(target: "session", "connect to {addr}");
        let client = RpcClient::connect(addr).map(|c| Arc::new(c) as Arc<dyn Client>);
        self.install(client);
    }

    /// Install a freshly built client, load program metadata and refresh the position.
    ///
    /// On failure the session stays without a client and every command fails with
    /// [`Error::NotConnected`].
    pub fn install(&self, client: client::Result<Arc<dyn Client>>) {
        let client = match client {
            Ok(client) => client,
            Err(e) => {
                self.session.connection_failed(Error::Connect(e));
                return;
            }
        };

        {
            let mut st = self.session.lock();
            st.client = Some(client.clone());
            st.running = true;
            st.output.append("Loading program info...");
        }
        self.session.mark_changed();

        let functions = client.list_functions("").map_err(|e| {
            self.session.report(format!("Could not list functions: {e}"));
        });
        let sources = client.list_sources("").map_err(|e| {
            self.session.report(format!("Could not list sources: {e}"));
        });
        let types = client.list_types("").map_err(|e| {
            self.session.report(format!("Could not list types: {e}"));
        });

        {
            let mut st = self.session.lock();
            st.program.functions = functions.unwrap_or_default();
            st.program.sources = sources.unwrap_or_default();
            st.program.types = types.unwrap_or_default();
            st.output.append("done\n");
            st.running = false;
            debug!(
                target: "session",
                "program info: {} functions, {} sources, {} types",
                st.program.functions.len(),
                st.program.sources.len(),
                st.program.types.len()
            );
        }

        Refresher::new(self.session).refresh(FrameTarget::ZeroFrame, ClearPolicy::OnStop, None);
    }
}

/// Running session plumbing, dropping it stops the output readers.
pub struct Launch {
    _output: Option<OutputMultiplexer>,
}

/// Start or attach according to `mode` and connect in background.
///
/// A spawn failure is reported into the session scrollback and returned.
pub fn launch(session: &Session, mode: &LaunchMode) -> Result<Launch, Error> {
    let launched = match start(mode) {
        Ok(launched) => launched,
        Err(e) => {
            session.connection_failed(&e);
            return Err(e);
        }
    };

    match launched {
        Launched::Attached(addr) => {
            let session = session.clone();
            thread::spawn(move || Connector::new(&session).connect(&addr));
            Ok(Launch { _output: None })
        }
        Launched::Spawned {
            process,
            stdout,
            stderr,
        } => {
            session.set_backend(process);

            let on_ready_session = session.clone();
            let on_ready = Box::new(move |line: String| match parse_ready_signal(&line) {
                Ok(addr) => {
                    let session = on_ready_session;
                    thread::spawn(move || Connector::new(&session).connect(&addr));
                }
                Err(e) => on_ready_session.connection_failed(e),
            });

            let output = OutputMultiplexer::start(session, stdout, Some(stderr), on_ready);
            Ok(Launch {
                _output: Some(output),
            })
        }
    }
}
