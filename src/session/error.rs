use crate::client;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- connection errors -----------------------------------------
    #[error("could not start debugger server: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("could not connect: {0}")]
    Connect(#[source] client::Error),
    #[error("could not parse connection string: {0:?}")]
    ProtocolParse(String),
    #[error("not connected")]
    NotConnected,

    // --------------------------------- runtime errors --------------------------------------------
    #[error("{op}: {source}")]
    Rpc {
        op: &'static str,
        source: client::Error,
    },
    #[error("{}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0}")]
    Command(String),
}

impl Error {
    /// Wrap a failed remote call, `op` names the call in user notices.
    pub fn rpc(op: &'static str) -> impl FnOnce(client::Error) -> Error {
        move |source| Error::Rpc { op, source }
    }

    pub fn file_access(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::FileAccess { path, source }
    }

    /// Return a hint to an interface - continue working after error or give up the session.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Spawn(_) => true,
            Error::Connect(_) => false,
            Error::ProtocolParse(_) => false,
            Error::NotConnected => false,
            Error::Rpc { .. } => false,
            Error::FileAccess { .. } => false,
            Error::Command(_) => false,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "session", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "session", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}
