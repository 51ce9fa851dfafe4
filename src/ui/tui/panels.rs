//! Inspection panels: background loaders behind the session's panel caches.

use crate::client::{self, Client, EvalScope, LoadConfig, Location};
use crate::session::panel::{AsyncLoad, PanelKind, Panels};
use crate::session::Session;
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use strum::IntoEnumIterator;

/// Frames shown in the stack panel.
const STACK_DEPTH: usize = 50;

pub type PanelLines = Vec<String>;

/// Position the panels are loaded for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelScope {
    pub thread: i64,
    pub goroutine: i64,
    pub frame: usize,
    pub expressions: Vec<String>,
}

impl PanelScope {
    fn eval_scope(&self) -> EvalScope {
        EvalScope::new(self.goroutine, self.frame)
    }
}

/// Caches of all inspection panels.
#[derive(Clone)]
pub struct PanelSet {
    caches: BTreeMap<PanelKind, Arc<AsyncLoad<PanelLines>>>,
}

impl Default for PanelSet {
    fn default() -> Self {
        Self {
            caches: PanelKind::iter()
                .map(|kind| (kind, Arc::new(AsyncLoad::default())))
                .collect(),
        }
    }
}

impl PanelSet {
    /// Caches as seen by the session.
    pub fn registry(&self) -> Panels {
        let mut panels = Panels::default();
        for (kind, cache) in &self.caches {
            panels.register(*kind, cache.clone());
        }
        panels
    }

    /// Loaded content of a panel, starts a background load if the panel is stale.
    pub fn lines(&self, kind: PanelKind, session: &Session) -> Option<PanelLines> {
        let cache = self.caches.get(&kind)?;
        if let Some(lines) = cache.get() {
            return Some(lines);
        }

        let (client, scope) = {
            let st = session.lock();
            if st.running {
                return None;
            }
            let client = st.client.clone()?;
            let scope = PanelScope {
                thread: st.cur_thread,
                goroutine: st.cur_gid,
                frame: st.cur_frame,
                expressions: st.expressions.clone(),
            };
            (client, scope)
        };

        let generation = cache.begin_load()?;
        debug!(target: "tui", "load {kind} panel");

        let cache = cache.clone();
        let session = session.clone();
        thread::spawn(move || {
            let lines = load(kind, client.as_ref(), &scope)
                .unwrap_or_else(|e| vec![format!("error: {e}")]);
            cache.finish_load(generation, lines);
            session.mark_changed();
        });
        None
    }
}

fn describe_location(loc: &Location) -> String {
    let function = loc.function.as_ref().map(|f| f.name.as_str()).unwrap_or("?");
    format!("{function} at {}:{}", loc.file, loc.line)
}

fn marker(current: bool) -> &'static str {
    if current {
        "* "
    } else {
        "  "
    }
}

/// Fetch panel content from the server.
pub fn load(kind: PanelKind, client: &dyn Client, scope: &PanelScope) -> client::Result<PanelLines> {
    let cfg = LoadConfig::default();

    let lines = match kind {
        PanelKind::Locals => {
            let args = client.list_function_args(scope.eval_scope(), &cfg)?;
            let locals = client.list_local_vars(scope.eval_scope(), &cfg)?;
            args.iter()
                .chain(locals.iter())
                .map(|var| format!("{} = {}", var.name, var.single_line()))
                .collect()
        }
        PanelKind::Registers => {
            if scope.thread < 0 {
                return Ok(vec![]);
            }
            client
                .list_registers(scope.thread)?
                .into_iter()
                .map(|reg| format!("{:>8} = {}", reg.name, reg.value))
                .collect()
        }
        PanelKind::Goroutines => client
            .list_goroutines()?
            .into_iter()
            .map(|g| {
                format!(
                    "{}{} {}",
                    marker(g.id == scope.goroutine),
                    g.id,
                    describe_location(&g.user_current_loc)
                )
            })
            .collect(),
        PanelKind::Stack => client
            .stacktrace(scope.goroutine, STACK_DEPTH, None)?
            .into_iter()
            .enumerate()
            .map(|(i, frame)| {
                format!(
                    "{}{i} {}",
                    marker(i == scope.frame),
                    describe_location(&frame.location)
                )
            })
            .collect(),
        PanelKind::Threads => client
            .list_threads()?
            .into_iter()
            .map(|t| {
                format!(
                    "{}{} {}",
                    marker(t.id == scope.thread),
                    t.id,
                    describe_location(&t.location())
                )
            })
            .collect(),
        PanelKind::Globals => client
            .list_package_vars("", &cfg)?
            .into_iter()
            .map(|var| format!("{} = {}", var.name, var.single_line()))
            .collect(),
        PanelKind::Breakpoints => client
            .list_breakpoints()?
            .into_iter()
            .map(|bp| {
                let place = if bp.function_name.is_empty() {
                    format!("{}:{}", bp.file, bp.line)
                } else {
                    format!("{} {}:{}", bp.function_name, bp.file, bp.line)
                };
                format!("{} at {place} ({} hits)", bp.id, bp.total_hit_count)
            })
            .collect(),
        PanelKind::Expressions => scope
            .expressions
            .iter()
            .enumerate()
            .map(|(i, expr)| match client.eval(scope.eval_scope(), expr, &cfg) {
                Ok(var) => format!("{i}: {expr} = {}", var.single_line()),
                Err(e) => format!("{i}: {expr} = error: {e}"),
            })
            .collect(),
    };

    Ok(lines)
}
