use anyhow::Context;
use clap::Parser;
use dlvtui::client::AsmFlavour;
use dlvtui::session::connector::{self, LaunchMode};
use dlvtui::session::Session;
use dlvtui::ui::config::{self, FileConfig, UIConfig};
use dlvtui::ui::tui::panels::PanelSet;
use dlvtui::ui::tui::utils::logger::{LogBuffer, TuiLogger};
use dlvtui::ui::tui::TuiApplication;
use log::error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Debugger server executable.
    #[arg(long, env = "DLVTUI_BACKEND", default_value = "dlv")]
    backend: PathBuf,

    /// Settings file [default: ~/.config/dlvtui/config.toml].
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disassembly syntax: intel, gnu or go.
    #[arg(long)]
    flavour: Option<AsmFlavour>,

    /// `connect <address>` to attach to a running server, otherwise a delve command
    /// (debug, exec, test, attach...) with its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // the terminal belongs to the interface, logs go to the logs view
    let logs = LogBuffer::default();
    let logger = TuiLogger::new(logs.clone());
    let filter = logger.filter();
    log::set_boxed_logger(Box::new(logger)).context("install logger")?;
    log::set_max_level(filter);

    let file = FileConfig::from_file(args.config.as_deref()).unwrap_or_default();
    config::set(UIConfig::new(args.backend, args.flavour, file));
    let cfg = config::current();

    let panels = PanelSet::default();
    let session = Session::new(cfg.session_config(), panels.registry());

    let mode = LaunchMode::from_args(&cfg.backend, &args.args);
    let launch = match connector::launch(&session, &mode) {
        Ok(launch) => Some(launch),
        Err(e) => {
            // the failure is shown in the scrollback, the interface still starts
            error!(target: "session", "{e}, fatal: {}", e.is_fatal());
            None
        }
    };

    let result = TuiApplication::new(session.clone(), panels, logs)
        .run()
        .context("terminal interface");

    session.shutdown();
    drop(launch);
    result
}
