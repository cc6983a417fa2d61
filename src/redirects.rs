use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::unistd::{dup2_stdin, dup2_stdout};
use tracing::{debug, warn};

use crate::error::{Result, ShellError};

/// Output target and background marker pulled out of a token list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub argv: Vec<String>,
    pub output: Option<PathBuf>,
    pub background: bool,
}

impl Redirection {
    /// Strips every `> target` pair (the last target wins), then a trailing
    /// `&` token or a `&` glued to the final token.
    pub fn extract(tokens: Vec<String>) -> Result<Self> {
        let mut argv = Vec::with_capacity(tokens.len());
        let mut output = None;

        let mut tokens = tokens.into_iter();
        while let Some(token) = tokens.next() {
            if token == ">" {
                match tokens.next() {
                    Some(target) => output = Some(PathBuf::from(target)),
                    None => return Err(ShellError::MissingTarget),
                }
            } else {
                argv.push(token);
            }
        }

        let mut background = false;
        if argv.last().is_some_and(|t| t == "&") {
            argv.pop();
            background = true;
        } else if let Some(last) = argv.last_mut() {
            if last.ends_with('&') {
                last.pop();
                background = true;
                if last.is_empty() {
                    argv.pop();
                }
            }
        }

        if argv.is_empty() {
            return Err(ShellError::MissingCommand);
        }

        Ok(Redirection {
            argv,
            output,
            background,
        })
    }
}

/// Saves stdin/stdout, optionally points stdout at a file, and puts the
/// originals back when dropped whatever happened in between.
pub struct StdioGuard {
    saved_stdin: OwnedFd,
    saved_stdout: OwnedFd,
    redirected: bool,
}

impl StdioGuard {
    pub fn redirect(output: Option<&Path>) -> Result<Self> {
        io::stdout().flush()?;
        let mut guard = StdioGuard {
            // close-on-exec copies, so children never inherit them
            saved_stdin: io::stdin().as_fd().try_clone_to_owned()?,
            saved_stdout: io::stdout().as_fd().try_clone_to_owned()?,
            redirected: false,
        };

        if let Some(path) = output {
            let file = open_target(path)?;
            dup2_stdout(&file).map_err(io::Error::from)?;
            guard.redirected = true;
            debug!(path = %path.display(), "stdout redirected");
        }

        Ok(guard)
    }

    pub fn is_redirected(&self) -> bool {
        self.redirected
    }
}

impl Drop for StdioGuard {
    fn drop(&mut self) {
        let _ = io::stdout().flush();
        if let Err(e) = dup2_stdin(&self.saved_stdin) {
            warn!(fd = "stdin", error = %e, "failed to restore descriptor");
        }
        if let Err(e) = dup2_stdout(&self.saved_stdout) {
            warn!(fd = "stdout", error = %e, "failed to restore descriptor");
        }
    }
}

/// Creates or truncates `path` for writing with mode 0666 (before umask).
pub fn open_target(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o666)
        .open(path)
        .map_err(|source| ShellError::Redirect {
            path: path.to_path_buf(),
            source,
        })
}
