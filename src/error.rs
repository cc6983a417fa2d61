use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShellError>;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("terminal mode: {0}")]
    Termios(#[source] Errno),

    #[error("fork: {0}")]
    Fork(#[source] Errno),

    #[error("waitpid: {0}")]
    Wait(#[source] Errno),

    #[error("signal setup: {0}")]
    Signal(#[source] Errno),

    #[error("{0}: argument contains a NUL byte")]
    BadArgument(String),

    #[error("{}: {source}", .path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("expected filename after '>'")]
    MissingTarget,

    #[error("missing command")]
    MissingCommand,

    #[error("HOME environment variable not set")]
    HomeNotSet,

    #[error("cd: {}: {source}", .path.display())]
    Chdir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_path() {
        let err = ShellError::Chdir {
            path: PathBuf::from("/does/not/exist"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("cd: /does/not/exist: "));
        assert_eq!(ShellError::Usage("cd [dir]").to_string(), "usage: cd [dir]");
    }
}
