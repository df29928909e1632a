use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn not_implemented(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::NotImplemented {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn unavailable(facility: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Unavailable {
                facility: facility.into(),
                source,
            }
            .into(),
        )
    }

    pub fn interrupted() -> Error {
        Error(ErrorKind::Interrupted.into())
    }

    pub fn worker_lost() -> Error {
        Error(ErrorKind::WorkerLost.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    /// I/O error whose context is the path being operated on.
    pub fn io_at(path: impl AsRef<Path>, source: std::io::Error) -> Error {
        Error::io(path.as_ref().display().to_string(), source)
    }

    pub fn invalid_config(element: impl Into<String>, source: serde_json::Error) -> Error {
        Error(
            ErrorKind::InvalidConfig {
                element: element.into(),
                source,
            }
            .into(),
        )
    }

    pub fn not_a_directory(path: impl Into<PathBuf>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::NotADirectory {
                path: path.into(),
                source,
            }
            .into(),
        )
    }

    /// Returns true for the cancellation raised by an interruptible wait.
    pub fn is_interrupted(&self) -> bool {
        matches!(self.kind(), ErrorKind::Interrupted)
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("not yet implemented: {message}")]
    NotImplemented { message: String },

    #[error("{facility} is not available: {source}")]
    Unavailable {
        facility: String,
        source: std::io::Error,
    },

    #[error("interrupted while waiting for a task result")]
    Interrupted,

    #[error("worker dropped the task before producing a result")]
    WorkerLost,

    #[error("'{}' exists and is not a directory: {source}", path.display())]
    NotADirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration '{element}': {source}")]
    InvalidConfig {
        element: String,
        source: serde_json::Error,
    },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::invalid_config("", e)
    }
}
