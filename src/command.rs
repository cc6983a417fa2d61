use std::env;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{Result, ShellError};
use crate::history::History;
use crate::jobs::JobTable;

pub const FAREWELL: &str = "Exiting shell. Goodbye.";

/// Splits a submitted line into arguments on runs of whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Commands run inside the shell process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    Cd(Option<String>),
    Pwd,
    Exit,
    Jobs,
    History,
}

/// Whether the shell keeps reading after a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

impl Builtin {
    /// Recognises a builtin by its first token. `cd` with more than one
    /// argument is a usage error rather than an external command.
    pub fn parse(tokens: &[String]) -> Option<Result<Self>> {
        let (cmd, args) = tokens.split_first()?;
        let builtin = match cmd.as_str() {
            "cd" => match args {
                [] => Ok(Builtin::Cd(None)),
                [dir] => Ok(Builtin::Cd(Some(dir.clone()))),
                _ => Err(ShellError::Usage("cd [dir]")),
            },
            "pwd" => Ok(Builtin::Pwd),
            "exit" => Ok(Builtin::Exit),
            "jobs" => Ok(Builtin::Jobs),
            "history" => Ok(Builtin::History),
            _ => return None,
        };
        Some(builtin)
    }

    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        jobs: &JobTable,
        history: &History,
    ) -> Result<Flow> {
        match self {
            Builtin::Cd(dir) => {
                let target = cd_target(dir.as_deref(), env::var("HOME").ok())?;
                env::set_current_dir(&target)
                    .map_err(|source| ShellError::Chdir { path: target, source })?;
            }

            Builtin::Pwd => {
                let cwd = env::current_dir()?;
                writeln!(out, "{}", cwd.display())?;
            }

            Builtin::Exit => {
                writeln!(out, "{}", FAREWELL)?;
                return Ok(Flow::Exit);
            }

            Builtin::Jobs => {
                for job in jobs.list_jobs() {
                    writeln!(out, "[{}]\trunning\t{}", job.number, job.command)?;
                }
            }

            Builtin::History => {
                for line in history.list() {
                    writeln!(out, "{}", line)?;
                }
            }
        }
        out.flush()?;
        Ok(Flow::Continue)
    }
}

/// `cd` with no argument or `~` goes to `$HOME`.
fn cd_target(dir: Option<&str>, home: Option<String>) -> Result<PathBuf> {
    match dir {
        None | Some("~") => home.map(PathBuf::from).ok_or(ShellError::HomeNotSet),
        Some(path) => Ok(PathBuf::from(path)),
    }
}
