use std::io;
use std::os::fd::{AsFd, BorrowedFd};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd;
use tracing::{debug, warn};

use crate::editor::RawModeGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Byte(u8),
    /// The signal wake descriptor became readable, or the wait was interrupted.
    Woken,
    Closed,
}

/// Reads the terminal one byte at a time, with raw mode held only for the
/// duration of each read.
pub struct InputReader {
    raw_mode_failed: bool,
}

impl InputReader {
    pub fn new() -> Self {
        Self {
            raw_mode_failed: false,
        }
    }

    pub fn read(&mut self, wake: BorrowedFd<'_>) -> io::Result<Input> {
        let _guard = match RawModeGuard::enter() {
            Ok(guard) => Some(guard),
            Err(e) => {
                if !self.raw_mode_failed {
                    warn!(error = %e, "continuing without raw terminal mode");
                    self.raw_mode_failed = true;
                }
                None
            }
        };

        let stdin = io::stdin();
        let mut fds = [
            PollFd::new(stdin.as_fd(), PollFlags::POLLIN),
            PollFd::new(wake, PollFlags::POLLIN),
        ];
        match poll(&mut fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok(Input::Woken),
            Err(e) => return Err(e.into()),
        }

        let woken = fds[1]
            .revents()
            .is_some_and(|r| r.intersects(PollFlags::POLLIN));
        if woken {
            return Ok(Input::Woken);
        }

        let mut byte = [0u8; 1];
        match unistd::read(stdin.as_fd(), &mut byte) {
            Ok(0) => {
                debug!("end of input");
                Ok(Input::Closed)
            }
            Ok(_) => Ok(Input::Byte(byte[0])),
            // spurious readiness; go back to waiting
            Err(Errno::EINTR | Errno::EAGAIN) => Ok(Input::Woken),
            Err(e) => Err(e.into()),
        }
    }
}
