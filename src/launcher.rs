use std::ffi::CString;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, setsid, ForkResult, Pid};
use tracing::debug;

use crate::error::{Result, ShellError};
use crate::jobs::JobTable;
use crate::signal_handler::ChildSignalBlock;

/// Exit status of a child whose `execvp` failed.
pub const EXEC_FAILURE: i32 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Foreground,
    /// Detached into its own session with stdin closed. Stdout is closed
    /// too unless it already points at a redirection target.
    Background { keep_stdout: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launched {
    Foreground(WaitStatus),
    Background { number: u32, pid: Pid },
}

fn to_cstrings(argv: &[String]) -> Result<Vec<CString>> {
    argv.iter()
        .map(|arg| CString::new(arg.as_bytes()).map_err(|_| ShellError::BadArgument(arg.clone())))
        .collect()
}

pub fn launch(argv: &[String], mode: Mode, jobs: &Mutex<JobTable>) -> Result<Launched> {
    let args = to_cstrings(argv)?;
    let Some(program) = args.first() else {
        return Err(ShellError::MissingCommand);
    };

    let block = match mode {
        Mode::Background { .. } => Some(ChildSignalBlock::new()?),
        Mode::Foreground => None,
    };

    // SAFETY: the shell is single-threaded; the child only calls
    // async-signal-safe functions before exec or _exit
    match unsafe { fork() }.map_err(ShellError::Fork)? {
        ForkResult::Child => {
            if let Some(block) = &block {
                block.unblock_in_child();
            }
            if let Mode::Background { keep_stdout } = mode {
                // SAFETY: closing our own standard descriptors
                unsafe {
                    libc::close(libc::STDIN_FILENO);
                    if !keep_stdout {
                        libc::close(libc::STDOUT_FILENO);
                    }
                }
                let _ = setsid();
            }
            let Err(e) = execvp(program, &args);
            let _ = writeln!(io::stderr(), "hsh: {}: {}", argv[0], e.desc());
            // SAFETY: skip atexit handlers and buffered state inherited from the shell
            unsafe { libc::_exit(EXEC_FAILURE) }
        }
        ForkResult::Parent { child } => match mode {
            Mode::Foreground => {
                debug!(pid = %child, command = %argv.join(" "), "waiting for foreground child");
                wait_for(child).map(Launched::Foreground)
            }
            Mode::Background { .. } => {
                let number = jobs
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .add_job(child, argv.join(" "));
                drop(block);
                Ok(Launched::Background { number, pid: child })
            }
        },
    }
}

/// Blocks until `pid` exits or is killed.
fn wait_for(pid: Pid) -> Result<WaitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => return Ok(status),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => return Err(ShellError::Wait(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn nul_in_argument_is_rejected_before_forking() {
        let jobs = Mutex::new(JobTable::new());
        let args = vec!["echo".to_string(), "a\0b".to_string()];
        assert!(matches!(
            launch(&args, Mode::Foreground, &jobs),
            Err(ShellError::BadArgument(_))
        ));
    }

    #[test]
    fn foreground_reports_exit_status() {
        let jobs = Mutex::new(JobTable::new());
        let status = launch(&argv("true"), Mode::Foreground, &jobs).unwrap();
        assert!(matches!(status, Launched::Foreground(WaitStatus::Exited(_, 0))));

        let status = launch(&argv("false"), Mode::Foreground, &jobs).unwrap();
        assert!(matches!(status, Launched::Foreground(WaitStatus::Exited(_, 1))));
    }

    #[test]
    fn unknown_program_exits_with_exec_failure() {
        let jobs = Mutex::new(JobTable::new());
        let status = launch(&argv("hsh-no-such-program-xyz"), Mode::Foreground, &jobs).unwrap();
        assert!(matches!(
            status,
            Launched::Foreground(WaitStatus::Exited(_, EXEC_FAILURE))
        ));
    }

    #[test]
    fn background_launch_registers_job() {
        let jobs = Mutex::new(JobTable::new());
        let launched = launch(
            &argv("sleep 0"),
            Mode::Background { keep_stdout: false },
            &jobs,
        )
        .unwrap();
        let Launched::Background { number, pid } = launched else {
            panic!("expected a background launch");
        };
        assert_eq!(number, 1);

        let status = waitpid(pid, None).unwrap();
        let finished = jobs.lock().unwrap().complete(status).unwrap();
        assert_eq!(finished.to_string(), "[1]\tdone\tsleep 0");
    }
}
