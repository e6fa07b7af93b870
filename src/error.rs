use std::fmt;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Which side of a transfer a path lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Coarse classification of an [`Error`], independent of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BrokenLink,
    AlreadyExists,
    WrongType,
    DirectoryNotEmpty,
    InvalidArgument,
    InvalidData,
    ConnectionFailure,
    Transport,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{side} file {path} not found")]
    NotFound { side: Side, path: String },

    #[error("{side} file {path} is a broken symlink")]
    BrokenLink { side: Side, path: String },

    #[error("{side} destination file {path} exists")]
    AlreadyExists { side: Side, path: String },

    #[error("{side} file {path} is a directory")]
    IsADirectory { side: Side, path: String },

    #[error("{side} file {path} is not a directory")]
    NotADirectory { side: Side, path: String },

    #[error("cannot overwrite {side} {} {target} with {} {source_path}", target_kind(.target_is_dir), source_kind(.target_is_dir))]
    Overwrite {
        side: Side,
        source_path: String,
        target: String,
        target_is_dir: bool,
    },

    #[error("cannot {verb} more than 1 file to {} {target}", destination_desc(.target_exists))]
    TooManySources {
        verb: &'static str,
        target: String,
        target_exists: bool,
    },

    #[error("{side} folder {path} is not empty")]
    NotEmpty { side: Side, path: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cannot decode {path} as {encoding}")]
    Transcode { path: String, encoding: String },

    #[error("{backend} connection to {host} failed: {reason}")]
    ConnectionFailure {
        backend: &'static str,
        host: String,
        reason: String,
    },

    #[error("{backend}: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn target_kind(target_is_dir: &bool) -> &'static str {
    if *target_is_dir {
        "directory"
    } else {
        "non-directory"
    }
}

fn source_kind(target_is_dir: &bool) -> &'static str {
    target_kind(&!*target_is_dir)
}

fn destination_desc(target_exists: &bool) -> &'static str {
    if *target_exists {
        "non-directory"
    } else {
        "non-existent location"
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::BrokenLink { .. } => ErrorKind::BrokenLink,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::IsADirectory { .. } | Self::NotADirectory { .. } | Self::Overwrite { .. } => {
                ErrorKind::WrongType
            }
            Self::TooManySources { target_exists, .. } => {
                if *target_exists {
                    ErrorKind::WrongType
                } else {
                    ErrorKind::NotFound
                }
            }
            Self::NotEmpty { .. } => ErrorKind::DirectoryNotEmpty,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Transcode { .. } => ErrorKind::InvalidData,
            Self::ConnectionFailure { .. } => ErrorKind::ConnectionFailure,
            Self::Backend { .. } | Self::Io(_) => ErrorKind::Transport,
        }
    }

    /// Path the error is about, when it concerns a single path.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::NotFound { path, .. }
            | Self::BrokenLink { path, .. }
            | Self::AlreadyExists { path, .. }
            | Self::IsADirectory { path, .. }
            | Self::NotADirectory { path, .. }
            | Self::NotEmpty { path, .. }
            | Self::Transcode { path, .. } => Some(path.as_str()),
            Self::Overwrite { target, .. } | Self::TooManySources { target, .. } => Some(target.as_str()),
            _ => None,
        }
    }

    pub(crate) fn backend(backend: &'static str, err: impl fmt::Display) -> Self {
        Self::Backend {
            backend,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_sources_distinguishes_destination() {
        let existing = Error::TooManySources {
            verb: "move",
            target: "/dst".to_string(),
            target_exists: true,
        };
        let missing = Error::TooManySources {
            verb: "move",
            target: "/dst".to_string(),
            target_exists: false,
        };

        assert_eq!(
            existing.to_string(),
            "cannot move more than 1 file to non-directory /dst"
        );
        assert_eq!(
            missing.to_string(),
            "cannot move more than 1 file to non-existent location /dst"
        );
        assert_eq!(existing.kind(), ErrorKind::WrongType);
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_overwrite_message() {
        let err = Error::Overwrite {
            side: Side::Remote,
            source_path: "/a/x".to_string(),
            target: "/b/x".to_string(),
            target_is_dir: true,
        };
        assert_eq!(
            err.to_string(),
            "cannot overwrite remote directory /b/x with non-directory /a/x"
        );
        assert_eq!(err.kind(), ErrorKind::WrongType);
        assert_eq!(err.path(), Some("/b/x"));
    }

    #[test]
    fn test_io_is_transport() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.path().is_none());
    }
}
