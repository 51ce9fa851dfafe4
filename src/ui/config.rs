use crate::client::AsmFlavour;
use crate::session::output::{SCROLLBACK_HIGH_MARK, SCROLLBACK_LOW_MARK, SILENCE_WINDOW};
use crate::session::SessionConfig;
use crate::{muted_error, weak_error};
use log::{error, warn};
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

/// Optional settings file, every key may be omitted.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub disassembly_flavour: Option<String>,
    pub scrollback_high_mark: Option<usize>,
    pub scrollback_low_mark: Option<usize>,
    pub silence_window_ms: Option<u64>,
}

impl FileConfig {
    const DEFAULT_PATH: &'static str = ".config/dlvtui/config.toml";

    /// Load settings from file. Return [`None`] on errors.
    ///
    /// A missing file at the default location is not an error.
    pub fn from_file(path: Option<&Path>) -> Option<Self> {
        let data = match path {
            None => {
                let path = home::home_dir()?.join(Self::DEFAULT_PATH);
                muted_error!(read_to_string(path))?
            }
            Some(path) => match read_to_string(path) {
                Ok(data) => data,
                Err(err) => {
                    error!(target: "tui", "Error while load config file {}: {err}", path.display());
                    return None;
                }
            },
        };

        weak_error!(toml::from_str(&data), "Error while parse config file:")
    }
}

/// Application user interface config.
#[derive(Debug, Clone)]
pub struct UIConfig {
    /// Debugger server executable.
    pub backend: PathBuf,
    /// Syntax of disassembled instructions.
    pub flavour: AsmFlavour,
    pub scrollback_high_mark: usize,
    pub scrollback_low_mark: usize,
    /// Output flow control window.
    pub silence_window: Duration,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            backend: PathBuf::from("dlv"),
            flavour: AsmFlavour::Intel,
            scrollback_high_mark: SCROLLBACK_HIGH_MARK,
            scrollback_low_mark: SCROLLBACK_LOW_MARK,
            silence_window: SILENCE_WINDOW,
        }
    }
}

impl UIConfig {
    /// Merge file settings over defaults, command line `flavour` wins over the file.
    pub fn new(backend: PathBuf, flavour: Option<AsmFlavour>, file: FileConfig) -> Self {
        let mut cfg = UIConfig {
            backend,
            ..Default::default()
        };

        if let Some(flavour) = file.disassembly_flavour.as_deref() {
            match AsmFlavour::from_str(flavour) {
                Ok(flavour) => cfg.flavour = flavour,
                Err(_) => warn!(target: "tui", "unknown disassembly flavour {flavour:?}, ignored"),
            }
        }
        if let Some(flavour) = flavour {
            cfg.flavour = flavour;
        }

        let high = file.scrollback_high_mark.unwrap_or(cfg.scrollback_high_mark);
        let low = file.scrollback_low_mark.unwrap_or(cfg.scrollback_low_mark);
        if low == 0 || low >= high {
            warn!(target: "tui", "scrollback low mark must be in (0, {high}), defaults are used");
        } else {
            cfg.scrollback_high_mark = high;
            cfg.scrollback_low_mark = low;
        }

        if let Some(ms) = file.silence_window_ms.filter(|&ms| ms > 0) {
            cfg.silence_window = Duration::from_millis(ms);
        }

        cfg
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            backend: self.backend.clone(),
            flavour: self.flavour,
            high_mark: self.scrollback_high_mark,
            low_mark: self.scrollback_low_mark,
            silence_window: self.silence_window,
        }
    }
}

/// Read-only ui configuration (set only once, at application start).
static CONFIG: OnceLock<UIConfig> = OnceLock::new();

/// Set initial configuration.
pub fn set(config: UIConfig) {
    if CONFIG.set(config).is_err() {
        warn!(target: "tui", "ui config already set");
    }
}

/// Return application ui config.
pub fn current() -> &'static UIConfig {
    CONFIG.get_or_init(UIConfig::default)
}
